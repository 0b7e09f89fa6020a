use std::fmt::{Display, Formatter, Result};

use credentials_storage::CredentialsError;
use dataset_client::DatasetClientError;
use upload_transport::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    SettingsError(String),
    CredentialsError(String),
    UploadError(String),
    StatusError(String),
    GridError(String),
    IoError(String),
    InvalidInput(String),
    OperationCancelled,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Error::SettingsError(message) => write!(f, "Settings error: {}", message),
            Error::CredentialsError(message) => write!(f, "Credentials error: {}", message),
            Error::UploadError(message) => write!(f, "Upload error: {}", message),
            Error::StatusError(message) => write!(f, "Status query error: {}", message),
            Error::GridError(message) => write!(f, "Grid information error: {}", message),
            Error::IoError(message) => write!(f, "IO error: {}", message),
            Error::InvalidInput(message) => write!(f, "Invalid input: {}", message),
            Error::OperationCancelled => write!(f, "Operation was cancelled"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::UploadError(err.to_string())
    }
}

impl From<DatasetClientError> for Error {
    fn from(err: DatasetClientError) -> Self {
        Error::GridError(err.to_string())
    }
}

impl From<CredentialsError> for Error {
    fn from(err: CredentialsError) -> Self {
        Error::CredentialsError(err.to_string())
    }
}

impl From<core_types::CoreTypeError> for Error {
    fn from(err: core_types::CoreTypeError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
