mod error;

pub use error::{ExportError, ExportResult};
