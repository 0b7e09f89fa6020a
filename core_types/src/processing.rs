use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProcessingState {
    #[default]
    Queued,
    Processing,
    Done,
    Failed,
    /// A state name this client does not know. Only `success` decides the outcome.
    #[serde(other)]
    Unknown,
}

/// Server side processing state of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    #[serde(default)]
    pub state: ProcessingState,
    /// Absent while the server has not decided yet.
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub sheets: Option<Vec<String>>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(rename = "filekey", default)]
    pub file_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatusOutcome {
    Pending,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn new(state: ProcessingState, success: Option<bool>) -> Self {
        Self {
            state,
            success,
            sheets: None,
            filename: None,
            filepath: None,
            file_key: None,
        }
    }

    /// `done` with `success == true` completes, an explicit `success == false` fails
    /// regardless of state, everything else keeps polling.
    pub fn outcome(&self) -> StatusOutcome {
        match (self.state, self.success) {
            (_, Some(false)) => StatusOutcome::Failed,
            (ProcessingState::Done, Some(true)) => StatusOutcome::Completed,
            _ => StatusOutcome::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome() != StatusOutcome::Pending
    }
}
