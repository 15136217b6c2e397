//! Match records and the sinks they are written to

use crate::error::SinkError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One output row: a word and what kind of match produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchRecord {
    pub value: String,
    pub category: String,
}

impl MatchRecord {
    pub fn new(value: &str, category: &str) -> Self {
        Self {
            value: value.to_string(),
            category: category.to_string(),
        }
    }
}

/// Destination for match records, written one at a time
pub trait RecordSink {
    fn write_record(&mut self, record: &MatchRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl RecordSink for Vec<MatchRecord> {
    fn write_record(&mut self, record: &MatchRecord) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }
}

/// CSV output with a `Word,Type` header
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

pub const CSV_HEADER: [&str; 2] = ["Word", "Type"];

impl CsvSink<File> {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer and emit the header row
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &MatchRecord) -> Result<(), SinkError> {
        self.writer
            .write_record([record.value.as_str(), record.category.as_str()])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
