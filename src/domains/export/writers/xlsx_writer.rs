use super::{cell_text, SpreadsheetSink};
use crate::domains::export::types::{ColumnSpec, FlatRow, XLSX_CONTENT_TYPE};
use crate::errors::{ExportError, ExportResult};
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// XLSX sink: one worksheet, frozen header row, word wrap on every column,
/// column widths taken from the column specs.
#[derive(Debug, Clone)]
pub struct XlsxSink {
    sheet_name: String,
}

impl XlsxSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet_name(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }

    fn build(&self, columns: &[ColumnSpec], rows: &[FlatRow]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let wrap = Format::new().set_text_wrap();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, column) in columns.iter().enumerate() {
            let col = col as u16;
            worksheet.set_column_width(col, column.width)?;
            worksheet.write_string_with_format(0, col, &column.label, &wrap)?;
        }

        for (row_index, row) in rows.iter().enumerate() {
            let row_number = row_index as u32 + 1;
            for (col, column) in columns.iter().enumerate() {
                worksheet.write_string_with_format(
                    row_number,
                    col as u16,
                    cell_text(row, &column.key),
                    &wrap,
                )?;
            }
        }

        // Keep the header visible while scrolling.
        worksheet.set_freeze_panes(1, 0)?;

        workbook.save_to_buffer()
    }
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet 1".to_string(),
        }
    }
}

impl SpreadsheetSink for XlsxSink {
    fn write(&self, columns: &[ColumnSpec], rows: &[FlatRow]) -> ExportResult<Vec<u8>> {
        self.build(columns, rows)
            .map_err(|e| ExportError::SinkWriteFailure(e.to_string()))
    }

    fn file_extension(&self) -> &'static str {
        "xlsx"
    }

    fn content_type(&self) -> &'static str {
        XLSX_CONTENT_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::DEFAULT_COLUMN_WIDTH;
    use serde_json::json;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec {
                key: "title".to_string(),
                label: "Title".to_string(),
                width: DEFAULT_COLUMN_WIDTH,
            },
            ColumnSpec {
                key: "author_name".to_string(),
                label: "Author Name".to_string(),
                width: DEFAULT_COLUMN_WIDTH,
            },
        ]
    }

    #[test]
    fn test_writes_zip_container() {
        let mut row = FlatRow::new();
        row.insert("title".to_string(), json!("Hello"));
        row.insert("author_name".to_string(), json!("Ann"));

        let bytes = XlsxSink::new().write(&columns(), &[row]).unwrap();
        // XLSX is a zip archive.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_row_set_still_produces_document() {
        let bytes = XlsxSink::new().write(&columns(), &[]).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_missing_cell_is_tolerated() {
        let mut row = FlatRow::new();
        row.insert("title".to_string(), json!("No author"));

        let result = XlsxSink::new().write(&columns(), &[row]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_content_type_and_extension() {
        let sink = XlsxSink::new();
        assert_eq!(sink.file_extension(), "xlsx");
        assert_eq!(
            sink.content_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}
