use strum_macros::Display;

use crate::{FileDescriptor, PipelineStage, TransportErrorCode};

/// Callbacks raised by an upload transport, delivered in order over a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport is about to send the first bytes of a queued file.
    FileStarting { file_id: String },
    Progress { file_id: String, percent: u8 },
    /// Every chunk was accepted. `response` is the raw body of the last chunk request.
    Uploaded { file_id: String, response: String },
    Failed {
        code: TransportErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageChanged(PipelineStage),
    UploadProgress {
        percent: u8,
    },
    Notice(Notice),
    Loading(bool),
    GridRendered {
        sheet_index: usize,
        rows: usize,
        columns: usize,
    },
    GridCleared,
    AdvanceRequested {
        dataset_kind: String,
        descriptor: FileDescriptor,
    },
}
