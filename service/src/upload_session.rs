use std::sync::Arc;

use core_types::{TransportErrorCode, UploadState, events::Notice};
use upload_transport::{
    FileFilters, MultipartParams, SelectedFile, TransportError, UploadTransportOps,
};

use crate::error::Error;

pub const SINGLE_FILE_ONLY_MESSAGE: &str = "Only one file can be uploaded.";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid file format";
pub const GENERIC_UPLOAD_FAILURE_MESSAGE: &str = "Upload failed";
pub const GENERATING_COMPLETED_MESSAGE: &str = "Generating completed";

/// Why a batch of picked files was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    /// More than one file picked, or a transfer is already active.
    SingleFileOnly,
    /// The file failed a filter before any bytes were sent.
    Filtered {
        code: TransportErrorCode,
        message: String,
    },
}

impl UploadRejection {
    pub fn notice(&self) -> Notice {
        match self {
            UploadRejection::SingleFileOnly => Notice::error(SINGLE_FILE_ONLY_MESSAGE),
            UploadRejection::Filtered { code, message } => {
                Notice::error(transport_error_message(*code, message))
            }
        }
    }
}

/// Only the extension error has its own message; anything else shows the transport's
/// message.
pub fn transport_error_message(code: TransportErrorCode, message: &str) -> String {
    match code {
        TransportErrorCode::FileExtension => INVALID_FORMAT_MESSAGE.to_string(),
        _ if message.is_empty() => GENERIC_UPLOAD_FAILURE_MESSAGE.to_string(),
        _ => message.to_string(),
    }
}

/// Lifecycle of a single file transfer.
///
/// The session drives the transport's control surface and interprets its callbacks.
/// It never parses the completion payload.
pub struct UploadSession {
    transport: Option<Arc<dyn UploadTransportOps>>,
    filters: FileFilters,
    state: UploadState,
    percent: u8,
    total_size: Option<u64>,
    active_file: Option<SelectedFile>,
    uploaded_file: Option<SelectedFile>,
    accepted: Vec<SelectedFile>,
    cancel_requested: bool,
    raw_response: Option<String>,
}

impl UploadSession {
    pub fn new(transport: Arc<dyn UploadTransportOps>, filters: FileFilters) -> Self {
        transport.clear_params();
        Self {
            transport: Some(transport),
            filters,
            state: UploadState::Idle,
            percent: 0,
            total_size: None,
            active_file: None,
            uploaded_file: None,
            accepted: Vec::new(),
            cancel_requested: false,
            raw_response: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    pub fn active_file(&self) -> Option<&SelectedFile> {
        self.active_file.as_ref()
    }

    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }

    /// Accepts a batch of picked files. Exactly one file is taken, and only while no
    /// transfer is active; rejected files are dropped without touching the transport.
    /// An accepted file starts uploading right away.
    pub fn add_files(&mut self, files: Vec<SelectedFile>) -> Result<(), UploadRejection> {
        if files.len() != 1 || self.state.is_active() {
            tracing::warn!(
                count = files.len(),
                state = %self.state,
                "Rejected files, only one file can be uploaded"
            );
            return Err(UploadRejection::SingleFileOnly);
        }
        let Some(file) = files.into_iter().next() else {
            return Err(UploadRejection::SingleFileOnly);
        };
        let Some(transport) = self.transport.clone() else {
            return Err(UploadRejection::Filtered {
                code: TransportErrorCode::Init,
                message: "Upload transport is closed".to_string(),
            });
        };

        if let Err(e) = self.filters.check(&file, &self.accepted) {
            tracing::warn!(file = %file.name, error = %e, "File rejected by filters");
            return Err(UploadRejection::Filtered {
                code: e.code(),
                message: e.to_string(),
            });
        }

        tracing::info!(file = %file.name, size = file.size, "File accepted for upload");
        self.total_size = Some(file.size);
        self.percent = 0;
        self.raw_response = None;
        transport.set_params(MultipartParams {
            total_size: file.size.to_string(),
            ..Default::default()
        });
        if let Err(e) = transport.add_file(file.clone()) {
            return Err(UploadRejection::Filtered {
                code: e.code(),
                message: e.to_string(),
            });
        }
        self.accepted.push(file.clone());
        self.uploaded_file = None;
        self.active_file = Some(file);
        self.state = UploadState::Idle;

        if let Err(e) = self.start() {
            tracing::error!(error = %e, "Failed to start upload");
            self.rearm();
            self.state = UploadState::Failed;
            return Err(UploadRejection::Filtered {
                code: TransportErrorCode::Init,
                message: e.to_string(),
            });
        }
        Ok(())
    }

    /// Idle or paused to uploading.
    pub fn start(&mut self) -> Result<(), Error> {
        if !matches!(self.state, UploadState::Idle | UploadState::Paused) {
            return Ok(());
        }
        let transport = self.transport()?;
        self.cancel_requested = false;
        transport.start()?;
        self.state = UploadState::Uploading;
        Ok(())
    }

    /// `true` pauses, `false` resumes.
    ///
    /// Once every byte is sent the file is being finalized on the server, so a pause
    /// request resumes instead and returns an informational notice.
    pub fn pause(&mut self, paused: bool) -> Result<Option<Notice>, Error> {
        if !paused {
            if self.state == UploadState::Paused {
                self.start()?;
            }
            return Ok(None);
        }

        if self.percent == 100 {
            let transport = self.transport()?;
            self.cancel_requested = false;
            transport.start()?;
            return Ok(Some(Notice::info(GENERATING_COMPLETED_MESSAGE)));
        }

        if self.state == UploadState::Uploading {
            let transport = self.transport()?;
            self.cancel_requested = true;
            transport.stop();
            self.state = UploadState::Paused;
            tracing::info!(percent = self.percent, "Upload paused");
        }
        Ok(None)
    }

    /// Stops the transfer and immediately rearms the transport for the next file.
    pub fn cancel(&mut self) {
        tracing::info!(state = %self.state, "Cancelling upload");
        self.state = UploadState::Cancelling;
        self.rearm();
        self.state = UploadState::Idle;
    }

    fn rearm(&mut self) {
        self.cancel_requested = true;
        if let Some(transport) = self.transport.clone() {
            transport.stop();
            if let Some(file) = self.active_file.take() {
                transport.remove_file(&file.id);
                self.forget(&file.id);
            }
            transport.clear_params();
            if let Err(e) = transport.start() {
                tracing::warn!(error = %e, "Failed to rearm upload transport");
            }
        }
        if let Some(file) = self.active_file.take() {
            self.forget(&file.id);
        }
        self.cancel_requested = false;
        self.percent = 0;
    }

    /// Forgets the last uploaded file so the same file can be picked again.
    pub fn discard_upload(&mut self) {
        if let Some(file) = self.uploaded_file.take() {
            tracing::debug!(file = %file.name, "Discarding uploaded file");
            self.forget(&file.id);
        }
        self.raw_response = None;
    }

    fn forget(&mut self, file_id: &str) {
        self.accepted.retain(|f| f.id != file_id);
    }

    /// The transport is about to send a file. A file flagged as cancelled is dropped
    /// together with the request parameters.
    pub fn on_file_starting(&mut self, file_id: &str) {
        if !self.cancel_requested {
            return;
        }
        if let Some(transport) = &self.transport {
            tracing::debug!(file_id, "Dropping cancelled file");
            transport.remove_file(file_id);
            transport.clear_params();
        }
    }

    /// Returns the new percentage when the event belongs to the active transfer.
    pub fn on_progress(&mut self, file_id: &str, percent: u8) -> Option<u8> {
        if !self.is_active_file(file_id) || !self.state.is_active() {
            return None;
        }
        self.percent = percent.min(100);
        Some(self.percent)
    }

    /// Returns the raw server payload when the event belongs to the active transfer.
    pub fn on_uploaded(&mut self, file_id: &str, response: String) -> Option<String> {
        if !self.is_active_file(file_id) {
            return None;
        }
        tracing::info!(file_id, "Upload completed");
        self.state = UploadState::Completed;
        self.percent = 100;
        self.uploaded_file = self.active_file.take();
        self.raw_response = Some(response.clone());
        Some(response)
    }

    /// Any transport error ends the transfer and rearms the transport, like `cancel`.
    pub fn on_error(&mut self, code: TransportErrorCode, message: &str) -> Notice {
        tracing::error!(code = code.code(), message, "Upload transport error");
        self.cancel();
        self.state = UploadState::Failed;
        Notice::error(transport_error_message(code, message))
    }

    /// Stops the transport and drops the handle. Later callbacks are ignored.
    pub fn shutdown(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.stop();
        }
        self.active_file = None;
        if self.state.is_active() {
            self.state = UploadState::Idle;
        }
    }

    fn is_active_file(&self, file_id: &str) -> bool {
        self.active_file.as_ref().is_some_and(|f| f.id == file_id)
    }

    fn transport(&self) -> Result<Arc<dyn UploadTransportOps>, Error> {
        self.transport
            .clone()
            .ok_or_else(|| Error::from(TransportError::Other("Upload transport is closed".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::events::NoticeLevel;
    use upload_transport::{MockUploadTransport, TransportCall};

    fn session() -> (UploadSession, MockUploadTransport) {
        let mock = MockUploadTransport::new();
        let session = UploadSession::new(Arc::new(mock.clone()), FileFilters::default());
        mock.clear_calls();
        (session, mock)
    }

    fn csv(name: &str) -> SelectedFile {
        SelectedFile::new(name, format!("/tmp/{}", name), 100)
    }

    #[test]
    fn test_accepted_file_auto_starts() {
        let (mut session, mock) = session();
        let file = csv("data.csv");

        session.add_files(vec![file.clone()]).unwrap();

        assert_eq!(session.state(), UploadState::Uploading);
        assert_eq!(session.total_size(), Some(100));
        assert_eq!(mock.params().total_size, "100");
        assert_eq!(mock.params().file_key, "");
        assert_eq!(mock.params().upload_target, "");
        assert_eq!(mock.queued_files(), vec![file.clone()]);
        assert_eq!(mock.calls().last(), Some(&TransportCall::Start));
    }

    #[test]
    fn test_second_file_while_active_is_rejected() {
        let (mut session, mock) = session();
        let first = csv("first.csv");
        session.add_files(vec![first.clone()]).unwrap();
        let calls_before = mock.calls();

        let rejection = session.add_files(vec![csv("second.csv")]).unwrap_err();

        assert_eq!(rejection, UploadRejection::SingleFileOnly);
        assert_eq!(rejection.notice().message, SINGLE_FILE_ONLY_MESSAGE);
        assert_eq!(mock.calls(), calls_before);
        assert_eq!(session.active_file(), Some(&first));
        assert_eq!(session.state(), UploadState::Uploading);
    }

    #[test]
    fn test_multiple_files_in_one_batch_rejected() {
        let (mut session, mock) = session();
        let rejection = session
            .add_files(vec![csv("a.csv"), csv("b.csv")])
            .unwrap_err();
        assert_eq!(rejection, UploadRejection::SingleFileOnly);
        assert!(mock.calls().is_empty());
        assert_eq!(session.state(), UploadState::Idle);
    }

    #[test]
    fn test_wrong_extension_rejected_before_transfer() {
        let (mut session, mock) = session();
        let rejection = session
            .add_files(vec![SelectedFile::new("doc.pdf", "/tmp/doc.pdf", 1)])
            .unwrap_err();
        assert_eq!(rejection.notice().message, INVALID_FORMAT_MESSAGE);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut session, mock) = session();
        session.add_files(vec![csv("data.csv")]).unwrap();
        let id = session.active_file().unwrap().id.clone();
        session.on_progress(&id, 40);

        assert_eq!(session.pause(true).unwrap(), None);
        assert_eq!(session.state(), UploadState::Paused);
        assert_eq!(mock.stop_count(), 1);

        session.pause(false).unwrap();
        assert_eq!(session.state(), UploadState::Uploading);
        assert_eq!(mock.start_count(), 2);
    }

    #[test]
    fn test_pause_at_full_progress_resumes_with_notice() {
        let (mut session, mock) = session();
        session.add_files(vec![csv("data.csv")]).unwrap();
        let id = session.active_file().unwrap().id.clone();
        session.on_progress(&id, 100);

        let notice = session.pause(true).unwrap().unwrap();

        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(notice.message, GENERATING_COMPLETED_MESSAGE);
        assert_eq!(session.state(), UploadState::Uploading);
        assert_eq!(mock.stop_count(), 0);
        assert_eq!(mock.start_count(), 2);
    }

    #[test]
    fn test_cancel_rearms_transport() {
        let (mut session, mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();
        mock.clear_calls();

        session.cancel();

        assert_eq!(session.state(), UploadState::Idle);
        assert!(session.active_file().is_none());
        assert!(mock.params().is_cleared());
        assert!(mock.queued_files().is_empty());
        assert_eq!(
            mock.calls(),
            vec![
                TransportCall::Stop,
                TransportCall::RemoveFile(file.id),
                TransportCall::SetParams(MultipartParams::default()),
                TransportCall::Start,
            ]
        );

        // ready for the next file
        session.add_files(vec![csv("other.csv")]).unwrap();
        assert_eq!(session.state(), UploadState::Uploading);
    }

    #[test]
    fn test_cancelled_file_dropped_when_starting() {
        let (mut session, mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();
        session.on_progress(&file.id, 10);
        session.pause(true).unwrap();
        mock.clear_calls();

        session.on_file_starting(&file.id);

        assert_eq!(
            mock.calls(),
            vec![
                TransportCall::RemoveFile(file.id),
                TransportCall::SetParams(MultipartParams::default()),
            ]
        );
    }

    #[test]
    fn test_progress_and_completion() {
        let (mut session, _mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();

        assert_eq!(session.on_progress(&file.id, 55), Some(55));
        assert_eq!(session.on_progress("someone-else", 70), None);
        assert_eq!(session.percent(), 55);

        let response = session
            .on_uploaded(&file.id, r#"{"filekey":"k1"}"#.to_string())
            .unwrap();
        assert_eq!(response, r#"{"filekey":"k1"}"#);
        assert_eq!(session.state(), UploadState::Completed);
        assert_eq!(session.raw_response(), Some(r#"{"filekey":"k1"}"#));

        // a completed file counts as a duplicate of itself
        let again = session.add_files(vec![SelectedFile::new("data.csv", "/x/data.csv", 100)]);
        assert!(matches!(
            again,
            Err(UploadRejection::Filtered {
                code: TransportErrorCode::FileDuplicate,
                ..
            })
        ));
    }

    #[test]
    fn test_same_file_can_be_picked_again_after_cancel_or_error() {
        let (mut session, mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();
        session.cancel();

        let retry = SelectedFile::new("data.csv", "/tmp/data.csv", 100);
        session.add_files(vec![retry.clone()]).unwrap();
        assert_eq!(session.active_file(), Some(&retry));

        session.on_error(TransportErrorCode::Http, "HTTP Error.");
        let again = SelectedFile::new("data.csv", "/tmp/data.csv", 100);
        session.add_files(vec![again.clone()]).unwrap();
        assert_eq!(session.state(), UploadState::Uploading);
        assert_eq!(mock.queued_files(), vec![again]);
    }

    #[test]
    fn test_discarded_upload_can_be_picked_again() {
        let (mut session, _mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();
        session.on_uploaded(&file.id, "{}".to_string()).unwrap();

        session.discard_upload();
        assert_eq!(session.raw_response(), None);

        let retry = SelectedFile::new("data.csv", "/tmp/data.csv", 100);
        session.add_files(vec![retry.clone()]).unwrap();
        assert_eq!(session.active_file(), Some(&retry));
    }

    #[test]
    fn test_error_maps_messages_and_rearms() {
        let (mut session, mock) = session();
        session.add_files(vec![csv("data.csv")]).unwrap();

        let notice = session.on_error(TransportErrorCode::FileExtension, "File extension error.");
        assert_eq!(notice.message, INVALID_FORMAT_MESSAGE);
        assert_eq!(session.state(), UploadState::Failed);
        assert_eq!(mock.calls().last(), Some(&TransportCall::Start));

        let notice = session.on_error(TransportErrorCode::Http, "HTTP Error.");
        assert_eq!(notice.message, "HTTP Error.");
        let notice = session.on_error(TransportErrorCode::Generic, "");
        assert_eq!(notice.message, GENERIC_UPLOAD_FAILURE_MESSAGE);
    }

    #[test]
    fn test_shutdown_ignores_late_callbacks() {
        let (mut session, mock) = session();
        let file = csv("data.csv");
        session.add_files(vec![file.clone()]).unwrap();

        session.shutdown();
        assert_eq!(mock.stop_count(), 1);
        assert_eq!(session.on_progress(&file.id, 80), None);
        assert_eq!(session.on_uploaded(&file.id, "{}".to_string()), None);
        assert!(session.start().is_err());
        assert_eq!(session.pause(true), Ok(None));
    }
}
