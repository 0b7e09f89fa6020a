use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

pub mod dataset_file;
pub mod events;
pub mod grid;
pub mod processing;

pub use dataset_file::{FileDescriptor, SheetSelection, derive_selected_sheets};
pub use grid::{FieldDescriptor, GridInfo, GridResponse, Row, assign_row_ids};
pub use processing::{ProcessingState, ProcessingStatus, StatusOutcome};

pub type FileSize = u64;

/// 10 GB, the largest file the upload endpoint accepts.
pub const MAX_UPLOAD_FILE_SIZE: FileSize = 10 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreTypeError {
    ConversionError(String),
    UnsupportedFileType(String),
}

impl std::fmt::Display for CoreTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreTypeError::ConversionError(msg) => write!(f, "Conversion Error: {}", msg),
            CoreTypeError::UnsupportedFileType(msg) => write!(f, "Unsupported file type: {}", msg),
        }
    }
}

impl std::error::Error for CoreTypeError {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Txt,
    Xls,
    Xlsx,
    Json,
}

impl FileType {
    /// Derives the file type from the extension of `filename`.
    pub fn from_filename(filename: &str) -> Result<Self, CoreTypeError> {
        let (_, extension) = filename
            .rsplit_once('.')
            .ok_or_else(|| CoreTypeError::UnsupportedFileType(filename.to_string()))?;
        extension
            .parse::<FileType>()
            .map_err(|_| CoreTypeError::UnsupportedFileType(filename.to_string()))
    }

    /// Delimited text files are parsed with the column delimiter and have no sheets.
    pub fn is_delimited(&self) -> bool {
        matches!(self, FileType::Csv | FileType::Txt)
    }

    pub fn extension(&self) -> String {
        self.to_string()
    }
}

/// Error codes reported by the upload transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, Serialize, Deserialize)]
pub enum TransportErrorCode {
    Generic = -100,
    Http = -200,
    Io = -300,
    Security = -400,
    Init = -500,
    FileSize = -600,
    FileExtension = -601,
    FileDuplicate = -602,
    Memory = -701,
}

impl TransportErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for TransportErrorCode {
    type Error = CoreTypeError;
    fn try_from(value: i32) -> Result<Self, CoreTypeError> {
        match value {
            -100 => Ok(TransportErrorCode::Generic),
            -200 => Ok(TransportErrorCode::Http),
            -300 => Ok(TransportErrorCode::Io),
            -400 => Ok(TransportErrorCode::Security),
            -500 => Ok(TransportErrorCode::Init),
            -600 => Ok(TransportErrorCode::FileSize),
            -601 => Ok(TransportErrorCode::FileExtension),
            -602 => Ok(TransportErrorCode::FileDuplicate),
            -701 => Ok(TransportErrorCode::Memory),
            _ => Err(CoreTypeError::ConversionError(format!(
                "Unknown transport error code {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Paused,
    Cancelling,
    Completed,
    Failed,
}

impl UploadState {
    /// A transfer is active until it completes, fails or is cancelled back to idle.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            UploadState::Uploading | UploadState::Paused | UploadState::Cancelling
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default)]
pub enum PipelineStage {
    #[default]
    #[strum(serialize = "Selecting file")]
    SelectingFile,
    Uploading,
    Polling,
    #[strum(serialize = "Preview ready")]
    PreviewReady,
    #[strum(serialize = "Advance requested")]
    AdvanceRequested,
    Cancelled,
}
