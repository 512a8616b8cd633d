pub mod config;
pub mod flatten;
pub mod query;
pub mod repository;
pub mod service;
pub mod types;
pub mod writers;

pub use config::{CollectionConfig, ExportConfigRegistry, RelationConfig};
pub use service::{ExportService, ExportServiceImpl};
