//! Transport-facing surface of the export feature.
//!
//! The host web framework owns routing, status codes and header writing; the
//! handler here only decodes the already-parsed query parameters, forwards to
//! the [`ExportService`], and shapes the JSON envelopes the admin UI expects.
//! Three read-only endpoints: collection dropdown, one table page
//! (`uid`/`limit`/`offset`), full spreadsheet download (`uid`).

use crate::domains::export::service::ExportService;
use crate::domains::export::types::{
    ColumnSpec, ExportOption, FlatRow, FlattenDiagnostic, SpreadsheetDocument,
};
use crate::errors::ExportResult;
use crate::types::PageRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Envelope of the dropdown endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DropDownResponse {
    pub data: Vec<ExportOption>,
}

/// Query parameters of the table-page endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TableDataQuery {
    pub uid: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Envelope of the table-page endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TableDataResponse {
    pub data: Vec<FlatRow>,
    pub count: u64,
    pub columns: Vec<ColumnSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<FlattenDiagnostic>,
}

/// Query parameters of the download endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQuery {
    pub uid: String,
}

/// Thin adapter between the host's HTTP layer and the export service.
pub struct ExportHandler {
    service: Arc<dyn ExportService>,
}

impl ExportHandler {
    pub fn new(service: Arc<dyn ExportService>) -> Self {
        Self { service }
    }

    pub async fn get_drop_down_data(&self) -> DropDownResponse {
        DropDownResponse {
            data: self.service.list_exportable_collections().await,
        }
    }

    pub async fn get_table_data(&self, query: TableDataQuery) -> ExportResult<TableDataResponse> {
        let page = self
            .service
            .get_table_page(&query.uid, PageRequest::new(query.limit, query.offset))
            .await?;
        Ok(TableDataResponse {
            data: page.rows,
            count: page.count,
            columns: page.columns,
            diagnostics: page.diagnostics,
        })
    }

    /// The binary download; the caller turns `content_type` and `filename`
    /// into the response headers.
    pub async fn download_excel(&self, query: DownloadQuery) -> ExportResult<SpreadsheetDocument> {
        self.service.export_spreadsheet(&query.uid).await
    }
}
