mod csv_writer;
mod xlsx_writer;

pub use csv_writer::CsvSink;
pub use xlsx_writer::XlsxSink;

use crate::domains::export::types::{ColumnSpec, FlatRow};
use crate::errors::ExportResult;

/// Serializes flattened rows into a binary spreadsheet document.
///
/// Implementations write one header row followed by one data row per input
/// row, in order. Any failure maps to
/// [`crate::errors::ExportError::SinkWriteFailure`]; no partial document is
/// ever returned.
pub trait SpreadsheetSink: Send + Sync {
    fn write(&self, columns: &[ColumnSpec], rows: &[FlatRow]) -> ExportResult<Vec<u8>>;

    fn file_extension(&self) -> &'static str;

    fn content_type(&self) -> &'static str;
}

/// Display text of one cell. Flat rows carry display strings already; a
/// missing key (omitted scalar) renders as an empty cell.
pub(crate) fn cell_text(row: &FlatRow, key: &str) -> String {
    row.get(key)
        .map(crate::domains::export::flatten::display_value)
        .unwrap_or_default()
}
