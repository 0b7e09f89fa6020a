use std::sync::{Arc, Mutex};

use crate::{MultipartParams, SelectedFile, TransportError, ops::UploadTransportOps};

/// A recorded call to the transport control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    AddFile(String),
    RemoveFile(String),
    Start,
    Stop,
    SetParams(MultipartParams),
}

#[derive(Default)]
struct MockState {
    calls: Vec<TransportCall>,
    queued: Vec<SelectedFile>,
    params: MultipartParams,
    fail_start: Option<String>,
}

/// Mock implementation of UploadTransportOps for testing
///
/// Records every call and keeps a queue, but never sends anything. Tests feed
/// `TransportEvent`s to the code under test themselves.
#[derive(Clone, Default)]
pub struct MockUploadTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockUploadTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `start` fail with the given message
    pub fn fail_start_with(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_start = Some(message.into());
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &TransportCall) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    pub fn start_count(&self) -> usize {
        self.count(&TransportCall::Start)
    }

    pub fn stop_count(&self) -> usize {
        self.count(&TransportCall::Stop)
    }

    pub fn queued_files(&self) -> Vec<SelectedFile> {
        self.state.lock().unwrap().queued.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

impl UploadTransportOps for MockUploadTransport {
    fn add_file(&self, file: SelectedFile) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(TransportCall::AddFile(file.id.clone()));
        state.queued.push(file);
        Ok(())
    }

    fn remove_file(&self, file_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(TransportCall::RemoveFile(file_id.to_string()));
        state.queued.retain(|f| f.id != file_id);
    }

    fn start(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(TransportCall::Start);
        match &state.fail_start {
            Some(message) => Err(TransportError::Other(message.clone())),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        self.state.lock().unwrap().calls.push(TransportCall::Stop);
    }

    fn params(&self) -> MultipartParams {
        self.state.lock().unwrap().params.clone()
    }

    fn set_params(&self, params: MultipartParams) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(TransportCall::SetParams(params.clone()));
        state.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mock = MockUploadTransport::new();
        let file = SelectedFile::new("a.csv", "/tmp/a.csv", 3);

        mock.add_file(file.clone()).unwrap();
        mock.start().unwrap();
        mock.stop();
        mock.remove_file(&file.id);

        assert_eq!(
            mock.calls(),
            vec![
                TransportCall::AddFile(file.id.clone()),
                TransportCall::Start,
                TransportCall::Stop,
                TransportCall::RemoveFile(file.id),
            ]
        );
        assert!(mock.queued_files().is_empty());
    }

    #[test]
    fn test_mock_start_failure() {
        let mock = MockUploadTransport::new();
        mock.fail_start_with("init failed");
        assert!(mock.start().is_err());
        assert_eq!(mock.start_count(), 1);
    }

    #[test]
    fn test_clear_params_goes_through_set_params() {
        let mock = MockUploadTransport::new();
        mock.set_params(MultipartParams {
            total_size: "10".to_string(),
            ..Default::default()
        });
        mock.clear_params();
        assert!(mock.params().is_cleared());
        assert_eq!(
            mock.count(&TransportCall::SetParams(MultipartParams::default())),
            1
        );
    }
}
