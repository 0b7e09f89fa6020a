use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use core_types::{GridResponse, ProcessingState, ProcessingStatus};

use crate::{DatasetClientError, DatasetServiceOps, GridQuery};

/// A recorded status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCall {
    pub file_key: String,
}

#[derive(Default)]
struct MockState {
    status_script: VecDeque<Result<ProcessingStatus, String>>,
    grid_script: VecDeque<Result<GridResponse, String>>,
    status_calls: Vec<StatusCall>,
    grid_calls: Vec<GridQuery>,
}

/// Mock implementation of DatasetServiceOps for testing
///
/// Responses are scripted in order. Once the status script runs dry every further
/// query answers `queued`; once the grid script runs dry every fetch answers with
/// no grids.
#[derive(Clone, Default)]
pub struct MockDatasetService {
    state: Arc<Mutex<MockState>>,
}

impl MockDatasetService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: ProcessingStatus) {
        self.state
            .lock()
            .unwrap()
            .status_script
            .push_back(Ok(status));
    }

    pub fn push_status_error(&self, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .status_script
            .push_back(Err(message.into()));
    }

    pub fn push_grids(&self, response: GridResponse) {
        self.state
            .lock()
            .unwrap()
            .grid_script
            .push_back(Ok(response));
    }

    pub fn push_grid_error(&self, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .grid_script
            .push_back(Err(message.into()));
    }

    pub fn status_calls(&self) -> Vec<StatusCall> {
        self.state.lock().unwrap().status_calls.clone()
    }

    pub fn grid_calls(&self) -> Vec<GridQuery> {
        self.state.lock().unwrap().grid_calls.clone()
    }

    pub fn status_call_count(&self) -> usize {
        self.state.lock().unwrap().status_calls.len()
    }

    pub fn grid_call_count(&self) -> usize {
        self.state.lock().unwrap().grid_calls.len()
    }
}

#[async_trait::async_trait]
impl DatasetServiceOps for MockDatasetService {
    async fn check_upload_status(
        &self,
        file_key: &str,
    ) -> Result<ProcessingStatus, DatasetClientError> {
        let mut state = self.state.lock().unwrap();
        state.status_calls.push(StatusCall {
            file_key: file_key.to_string(),
        });
        match state.status_script.pop_front() {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(DatasetClientError::Other(message)),
            None => Ok(ProcessingStatus::new(ProcessingState::Queued, None)),
        }
    }

    async fn get_file_grid_info(
        &self,
        query: &GridQuery,
    ) -> Result<GridResponse, DatasetClientError> {
        let mut state = self.state.lock().unwrap();
        state.grid_calls.push(query.clone());
        match state.grid_script.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(DatasetClientError::Other(message)),
            None => Ok(GridResponse::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{FileType, GridInfo};

    #[async_std::test]
    async fn test_status_script_then_queued() {
        let mock = MockDatasetService::new();
        mock.push_status(ProcessingStatus::new(ProcessingState::Done, Some(true)));
        mock.push_status_error("boom");

        let first = mock.check_upload_status("k").await.unwrap();
        assert_eq!(first.state, ProcessingState::Done);
        assert!(mock.check_upload_status("k").await.is_err());
        let later = mock.check_upload_status("k").await.unwrap();
        assert_eq!(later.state, ProcessingState::Queued);
        assert_eq!(mock.status_call_count(), 3);
    }

    #[async_std::test]
    async fn test_grid_calls_are_recorded() {
        let mock = MockDatasetService::new();
        mock.push_grids(GridResponse {
            grids: vec![GridInfo::default()],
        });
        let query = GridQuery {
            file_key: "k".to_string(),
            sheet_name: String::new(),
            delimiter: ",".to_string(),
            file_type: FileType::Csv,
        };

        assert_eq!(mock.get_file_grid_info(&query).await.unwrap().grids.len(), 1);
        assert!(mock.get_file_grid_info(&query).await.unwrap().grids.is_empty());
        assert_eq!(mock.grid_calls(), vec![query.clone(), query]);
    }
}
