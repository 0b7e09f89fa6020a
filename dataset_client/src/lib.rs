use core_types::{FileType, GridResponse, ProcessingStatus};
use thiserror::Error;

pub mod http;
pub mod mock;

pub use http::{DatasetEndpoints, HttpDatasetService};
pub use mock::{MockDatasetService, StatusCall};

#[derive(Error, Debug)]
pub enum DatasetClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Other error: {0}")]
    Other(String),
}

/// Parameters of a grid information query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridQuery {
    pub file_key: String,
    pub sheet_name: String,
    pub delimiter: String,
    pub file_type: FileType,
}

/// Requests against the dataset preparation service.
#[async_trait::async_trait]
pub trait DatasetServiceOps: Send + Sync {
    /// Fetch the processing state of an uploaded file.
    async fn check_upload_status(
        &self,
        file_key: &str,
    ) -> Result<ProcessingStatus, DatasetClientError>;

    /// Fetch the row/column preview of a file, one grid per sheet.
    async fn get_file_grid_info(
        &self,
        query: &GridQuery,
    ) -> Result<GridResponse, DatasetClientError>;
}
