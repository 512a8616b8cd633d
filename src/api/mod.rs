mod export;

pub use export::{
    DownloadQuery, DropDownResponse, ExportHandler, TableDataQuery, TableDataResponse,
};
