use crate::domains::export::config::ExportConfigRegistry;
use crate::domains::export::flatten::{derive_columns, flatten_rows};
use crate::domains::export::query::build_query;
use crate::domains::export::repository::{DataStore, SchemaCatalog};
use crate::domains::export::types::{
    ExportOption, SchemaKind, SpreadsheetDocument, TablePage,
};
use crate::domains::export::writers::SpreadsheetSink;
use crate::errors::{ExportError, ExportResult};
use crate::types::PageRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// The export feature's three operations: the collection dropdown, the
/// paginated table view, and the full spreadsheet download.
#[async_trait]
pub trait ExportService: Send + Sync {
    /// Collections the operator may export, sorted ascending by label.
    /// Degrades to an empty list when the schema catalog is unavailable.
    async fn list_exportable_collections(&self) -> Vec<ExportOption>;

    /// One page of flattened table data plus the total row count under the
    /// same filter. Fails with [`ExportError::UnknownCollection`] before any
    /// store call when no config is registered for the id.
    async fn get_table_page(
        &self,
        collection_id: &str,
        page: PageRequest,
    ) -> ExportResult<TablePage>;

    /// The entire collection as a binary spreadsheet. A sink failure surfaces
    /// as [`ExportError::SinkWriteFailure`]; no partial file is returned.
    async fn export_spreadsheet(&self, collection_id: &str) -> ExportResult<SpreadsheetDocument>;
}

/// Stateless orchestrator over the injected collaborators. All dependencies
/// arrive at construction; there is no process-wide lookup.
pub struct ExportServiceImpl {
    registry: Arc<ExportConfigRegistry>,
    store: Arc<dyn DataStore>,
    catalog: Arc<dyn SchemaCatalog>,
    sink: Arc<dyn SpreadsheetSink>,
}

impl ExportServiceImpl {
    pub fn new(
        registry: Arc<ExportConfigRegistry>,
        store: Arc<dyn DataStore>,
        catalog: Arc<dyn SchemaCatalog>,
        sink: Arc<dyn SpreadsheetSink>,
    ) -> Self {
        Self {
            registry,
            store,
            catalog,
            sink,
        }
    }

    async fn fetch_page(&self, collection_id: &str, page: PageRequest) -> ExportResult<TablePage> {
        let config = self
            .registry
            .get(collection_id)
            .ok_or_else(|| ExportError::UnknownCollection(collection_id.to_string()))?;

        let query = build_query(config, page);
        let raw_rows = self.store.find_many(collection_id, &query).await?;
        // Count reuses the exact where clause of the row query, ignoring
        // pagination, so page numbers and totals cannot disagree.
        let count = self.store.count(collection_id, &query.where_clause).await?;

        let (rows, diagnostics) = flatten_rows(&raw_rows, config);
        Ok(TablePage {
            columns: derive_columns(config),
            rows,
            count,
            diagnostics,
        })
    }
}

#[async_trait]
impl ExportService for ExportServiceImpl {
    async fn list_exportable_collections(&self) -> Vec<ExportOption> {
        let entries = match self.catalog.entries().await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("schema catalog unavailable, dropdown degrades to empty: {}", e);
                return Vec::new();
            }
        };

        let mut options: Vec<ExportOption> = entries
            .into_iter()
            .filter(|entry| {
                entry.kind == SchemaKind::Collection
                    && self.registry.matches_registered_prefix(&entry.uid)
            })
            .map(|entry| ExportOption {
                label: entry.display_name,
                value: entry.uid,
            })
            .collect();

        // Case-insensitive ascending, with a bytewise tiebreak so the order
        // is total ("alpha" sorts before "Zeta").
        options.sort_by(|a, b| {
            a.label
                .to_lowercase()
                .cmp(&b.label.to_lowercase())
                .then_with(|| a.label.cmp(&b.label))
        });
        options
    }

    async fn get_table_page(
        &self,
        collection_id: &str,
        page: PageRequest,
    ) -> ExportResult<TablePage> {
        self.fetch_page(collection_id, page).await
    }

    async fn export_spreadsheet(&self, collection_id: &str) -> ExportResult<SpreadsheetDocument> {
        let page = self.fetch_page(collection_id, PageRequest::unbounded()).await?;
        if !page.diagnostics.is_empty() {
            log::warn!(
                "spreadsheet export of '{}' recovered {} malformed relation value(s)",
                collection_id,
                page.diagnostics.len()
            );
        }

        let bytes = self.sink.write(&page.columns, &page.rows)?;
        Ok(SpreadsheetDocument {
            bytes,
            filename: format!(
                "{}.{}",
                collection_slug(collection_id),
                self.sink.file_extension()
            ),
            content_type: self.sink.content_type(),
        })
    }
}

/// Short file-name stem for a collection id:
/// "api::article.article" → "article".
fn collection_slug(collection_id: &str) -> &str {
    collection_id
        .rsplit(['.', ':'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("export")
}
