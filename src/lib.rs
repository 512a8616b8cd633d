//! Schema-driven table and spreadsheet export core for a content-management
//! backend.
//!
//! An operator picks a content collection from a dropdown, views it as a
//! paginated table, and downloads it as a spreadsheet. Per-collection
//! configuration (scalar columns, inlined relation columns, locale filtering)
//! deterministically produces a store query, a flattened row representation
//! and a spreadsheet header/row representation.
//!
//! The data store and the spreadsheet writer sit behind traits
//! ([`domains::export::repository::DataStore`],
//! [`domains::export::writers::SpreadsheetSink`]); a SQLite-backed store and
//! XLSX/CSV writers are provided as reference implementations.

pub mod api;
pub mod domains;
pub mod errors;
pub mod types;

pub use domains::export::config::{CollectionConfig, ExportConfigRegistry, RelationConfig};
pub use domains::export::service::{ExportService, ExportServiceImpl};
pub use errors::{ExportError, ExportResult};
pub use types::PageRequest;
