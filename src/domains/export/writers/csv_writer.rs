use super::{cell_text, SpreadsheetSink};
use crate::domains::export::types::{ColumnSpec, FlatRow};
use crate::errors::{ExportError, ExportResult};

/// CSV sink, mainly for tooling that consumes exports programmatically.
/// Prefixed with a UTF-8 BOM so Excel opens it with the right encoding.
#[derive(Debug, Clone)]
pub struct CsvSink {
    delimiter: u8,
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvSink {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl SpreadsheetSink for CsvSink {
    fn write(&self, columns: &[ColumnSpec], rows: &[FlatRow]) -> ExportResult<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"\xEF\xBB\xBF");

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(&mut buffer);

        writer
            .write_record(columns.iter().map(|column| column.label.as_str()))
            .map_err(sink_error)?;
        for row in rows {
            writer
                .write_record(columns.iter().map(|column| cell_text(row, &column.key)))
                .map_err(sink_error)?;
        }
        writer
            .flush()
            .map_err(|e| ExportError::SinkWriteFailure(e.to_string()))?;
        drop(writer);

        Ok(buffer)
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}

fn sink_error(error: csv::Error) -> ExportError {
    ExportError::SinkWriteFailure(error.to_string())
}
