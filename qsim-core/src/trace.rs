//! Trace file format, writer and streaming reader.
//!
//! A trace holds one line per event, `<index> <occupancy> <dropped>`,
//! newline-terminated, single-space separated, without a header. Traces
//! are append-only, so any prefix of a trace is itself a valid trace.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

/// Errors raised while writing or reading a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// Output file could not be created
    #[error("Failed to create trace file {path}: {source}")]
    Create {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Record could not be written or flushed
    #[error("Failed to write trace record: {source}")]
    Write {
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Record index did not increase
    #[error("Trace record {index} written after record {previous}")]
    OutOfOrder {
        /// Index of the last record accepted
        previous: u64,
        /// Index of the rejected record
        index: u64,
    },

    /// Input file could not be opened
    #[error("Failed to open trace file {path}: {source}")]
    Open {
        /// Path that could not be opened
        path: PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Input could not be read
    #[error("Failed to read trace line {line}: {source}")]
    Read {
        /// 1-based line number being read
        line: u64,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// Line does not hold three non-negative integers
    #[error("Malformed trace line {line}: {reason}")]
    Malformed {
        /// 1-based line number of the bad line
        line: u64,
        /// What was wrong with it
        reason: String,
    },
}

impl TraceError {
    /// Checks if this error means the output sink failed.
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Write { .. })
    }
}

/// Externally visible state after one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    /// 1-based event index
    pub index: u64,
    /// Packets in queue after the event
    pub occupancy: u64,
    /// Packets dropped up to and including the event
    pub dropped: u64,
}

impl TraceRecord {
    /// Creates a trace record.
    pub fn new(index: u64, occupancy: u64, dropped: u64) -> Self {
        Self {
            index,
            occupancy,
            dropped,
        }
    }
}

impl std::fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.index, self.occupancy, self.dropped)
    }
}

impl FromStr for TraceRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let mut next_field = |name: &str| -> Result<u64, String> {
            let raw = fields
                .next()
                .ok_or_else(|| format!("missing {name} field"))?;
            raw.parse::<u64>()
                .map_err(|e| format!("invalid {name} '{raw}': {e}"))
        };

        let index = next_field("index")?;
        let occupancy = next_field("occupancy")?;
        let dropped = next_field("dropped")?;

        if let Some(extra) = fields.next() {
            return Err(format!("unexpected extra field '{extra}'"));
        }

        Ok(Self::new(index, occupancy, dropped))
    }
}

/// Appends trace records to a sink in strictly increasing index order.
#[derive(Debug)]
pub struct TraceWriter<W: Write> {
    out: BufWriter<W>,
    last_index: u64,
    records_written: u64,
}

impl TraceWriter<File> {
    /// Creates (or truncates) the trace file at `path`.
    ///
    /// # Errors
    ///
    /// - `TraceError::Create` - If the file cannot be created
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TraceError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Trace file created");
        Ok(Self::new(file))
    }
}

impl<W: Write> TraceWriter<W> {
    /// Wraps an arbitrary sink.
    pub fn new(sink: W) -> Self {
        Self {
            out: BufWriter::new(sink),
            last_index: 0,
            records_written: 0,
        }
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// - `TraceError::OutOfOrder` - If the index does not exceed the previous one
    /// - `TraceError::Write` - If the sink rejects the write
    pub fn write_record(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        if record.index <= self.last_index {
            return Err(TraceError::OutOfOrder {
                previous: self.last_index,
                index: record.index,
            });
        }

        writeln!(self.out, "{record}").map_err(|source| TraceError::Write { source })?;
        self.last_index = record.index;
        self.records_written += 1;
        Ok(())
    }

    /// Returns the number of records accepted so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes buffered records and returns the sink.
    ///
    /// # Errors
    ///
    /// - `TraceError::Write` - If the final flush fails
    pub fn finish(self) -> Result<W, TraceError> {
        self.out.into_inner().map_err(|e| TraceError::Write {
            source: e.into_error(),
        })
    }
}

/// Streams trace records from a reader, one line at a time.
///
/// Blank lines are skipped; anything else must parse as a record.
#[derive(Debug)]
pub struct TraceReader<R: BufRead> {
    input: R,
    line: u64,
    buffer: String,
}

impl TraceReader<BufReader<File>> {
    /// Opens the trace file at `path`.
    ///
    /// # Errors
    ///
    /// - `TraceError::Open` - If the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    /// Reads records from any buffered reader.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            self.line += 1;

            match self.input.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(TraceError::Read {
                        line: self.line,
                        source,
                    }));
                }
            }

            if self.buffer.trim().is_empty() {
                continue;
            }

            return Some(self.buffer.parse().map_err(|reason| TraceError::Malformed {
                line: self.line,
                reason,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn written(records: &[TraceRecord]) -> String {
        let mut writer = TraceWriter::new(Vec::new());
        for record in records {
            writer.write_record(record).unwrap();
        }
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_record_line_format() {
        let output = written(&[TraceRecord::new(1, 1, 0), TraceRecord::new(2, 1, 1)]);

        assert_eq!(output, "1 1 0\n2 1 1\n");
    }

    #[test]
    fn test_writer_rejects_out_of_order_records() {
        let mut writer = TraceWriter::new(Vec::new());
        writer.write_record(&TraceRecord::new(2, 0, 0)).unwrap();

        let result = writer.write_record(&TraceRecord::new(2, 0, 0));

        assert!(matches!(
            result,
            Err(TraceError::OutOfOrder {
                previous: 2,
                index: 2
            })
        ));
        assert_eq!(writer.records_written(), 1);
    }

    #[test]
    fn test_writer_create_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.txt");

        let err = TraceWriter::create(&path).unwrap_err();

        assert!(err.is_sink_failure());
        assert!(matches!(err, TraceError::Create { .. }));
    }

    #[test]
    fn test_reader_parses_written_trace() {
        let records = vec![
            TraceRecord::new(1, 1, 0),
            TraceRecord::new(2, 1, 1),
            TraceRecord::new(3, 0, 1),
        ];
        let text = written(&records);

        let parsed: Vec<TraceRecord> = TraceReader::new(Cursor::new(text))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(parsed, records);
    }

    #[test]
    fn test_reader_handles_empty_and_single_record_traces() {
        assert_eq!(TraceReader::new(Cursor::new("")).count(), 0);

        let single: Vec<_> = TraceReader::new(Cursor::new("1 0 0\n")).collect();
        assert_eq!(single.len(), 1);
        assert_eq!(*single[0].as_ref().unwrap(), TraceRecord::new(1, 0, 0));
    }

    #[test]
    fn test_reader_accepts_missing_trailing_newline_and_blank_lines() {
        let parsed: Vec<TraceRecord> = TraceReader::new(Cursor::new("1 1 0\n\n2 0 0"))
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(parsed, vec![TraceRecord::new(1, 1, 0), TraceRecord::new(2, 0, 0)]);
    }

    #[test]
    fn test_reader_reports_malformed_line_number() {
        let mut reader = TraceReader::new(Cursor::new("1 0 0\n2 -1 0\n"));

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(TraceError::Malformed { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("occupancy"));
            }
            other => panic!("expected malformed line, got {other:?}"),
        }
    }

    #[test]
    fn test_record_parsing_errors() {
        assert!("1 2".parse::<TraceRecord>().unwrap_err().contains("dropped"));
        assert!("1 2 3 4".parse::<TraceRecord>().unwrap_err().contains("extra"));
        assert!("a 2 3".parse::<TraceRecord>().unwrap_err().contains("index"));
    }
}
