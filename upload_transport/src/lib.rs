// The transport behaves like a browser chunk uploader: files are queued, `start` begins or
// resumes sending chunks, `stop` halts after the chunk in flight, and every callback is
// delivered as a `TransportEvent` over the channel handed to the transport at construction.

use std::path::{Path, PathBuf};

use core_types::{FileSize, TransportErrorCode};

pub mod filters;
pub mod http;
pub mod mock;
pub mod ops;

pub use filters::FileFilters;
pub use http::{HttpChunkedTransport, TransportConfig};
pub use mock::{MockUploadTransport, TransportCall};
pub use ops::UploadTransportOps;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with status {status}")]
    Status { status: u16 },

    #[error("{message}")]
    Rejected {
        code: TransportErrorCode,
        message: String,
    },

    #[error("Other error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn code(&self) -> TransportErrorCode {
        match self {
            TransportError::Io(_) => TransportErrorCode::Io,
            TransportError::Http(_) | TransportError::Status { .. } => TransportErrorCode::Http,
            TransportError::Rejected { code, .. } => *code,
            TransportError::Other(_) => TransportErrorCode::Generic,
        }
    }
}

/// A file picked by the user, not yet necessarily accepted for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub size: FileSize,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, size: FileSize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            path: path.into(),
            size,
        }
    }

    /// Reads name and size from the file system.
    pub async fn from_path(path: &Path) -> Result<Self, TransportError> {
        let metadata = async_std::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| TransportError::Other(format!("No file name in {}", path.display())))?;
        Ok(Self::new(name, path, metadata.len()))
    }
}

/// Form fields sent with every upload request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartParams {
    pub file_key: String,
    pub upload_target: String,
    pub total_size: String,
}

impl MultipartParams {
    pub fn is_cleared(&self) -> bool {
        self.file_key.is_empty() && self.upload_target.is_empty() && self.total_size.is_empty()
    }

    pub fn fields(&self) -> [(&'static str, String); 3] {
        [
            ("file_key", self.file_key.clone()),
            ("upload_target", self.upload_target.clone()),
            ("total_size", self.total_size.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let io = TransportError::Io(std::io::Error::other("disk"));
        assert_eq!(io.code(), TransportErrorCode::Io);
        assert_eq!(
            TransportError::Status { status: 500 }.code(),
            TransportErrorCode::Http
        );
        let rejected = TransportError::Rejected {
            code: TransportErrorCode::FileExtension,
            message: "File extension error.".to_string(),
        };
        assert_eq!(rejected.code(), TransportErrorCode::FileExtension);
        assert_eq!(rejected.to_string(), "File extension error.");
    }

    #[test]
    fn test_params_default_cleared() {
        let mut params = MultipartParams::default();
        assert!(params.is_cleared());
        params.total_size = "42".to_string();
        assert!(!params.is_cleared());
    }

    #[async_std::test]
    async fn test_selected_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "data.csv");
        assert_eq!(file.size, 8);
        assert!(!file.id.is_empty());
    }
}
