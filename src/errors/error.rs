use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the export core.
///
/// Every variant is scoped to a single request; nothing here is fatal to the
/// host process. Relation-extraction failures during flattening are *not*
/// errors: they degrade to empty cells and are reported through
/// [`crate::domains::export::types::FlattenDiagnostic`].
#[derive(Debug, Error, Clone, Serialize)]
pub enum ExportError {
    /// No export configuration is registered for the requested collection.
    /// Surfaced to the caller as a client error.
    #[error("no export configuration registered for collection '{0}'")]
    UnknownCollection(String),

    /// The data store call failed. Not retried here; retry policy belongs to
    /// the store collaborator.
    #[error("data store unavailable: {0}")]
    StoreUnavailable(String),

    /// Spreadsheet serialization failed. No partial file is ever returned.
    #[error("spreadsheet serialization failed: {0}")]
    SinkWriteFailure(String),

    /// The export configuration document is malformed (rejected at load).
    #[error("invalid export configuration: {0}")]
    InvalidConfig(String),
}

impl ExportError {
    /// Whether the failure is the caller's fault (bad collection id) rather
    /// than an infrastructure problem. Transport layers map this to a 4xx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExportError::UnknownCollection(_))
    }
}

pub type ExportResult<T> = Result<T, ExportError>;
