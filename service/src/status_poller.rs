use std::{sync::Arc, time::Duration};

use core_types::ProcessingStatus;
use dataset_client::DatasetServiceOps;
use futures::future::{AbortHandle, abortable};

/// A status answer tagged with the poll sequence that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub poll_id: u64,
    pub file_key: String,
    pub status: ProcessingStatus,
}

struct PollHandle {
    poll_id: u64,
    file_key: String,
    abort: AbortHandle,
}

/// Queries the processing state of one file key at a fixed interval.
///
/// At most one poll sequence is live: `start` stops the previous one first. The loop
/// ends by itself after forwarding a terminal status.
pub struct StatusPoller {
    dataset_ops: Arc<dyn DatasetServiceOps>,
    interval: Duration,
    updates: flume::Sender<StatusUpdate>,
    handle: Option<PollHandle>,
    last_poll_id: u64,
}

impl StatusPoller {
    pub fn new(
        dataset_ops: Arc<dyn DatasetServiceOps>,
        interval: Duration,
        updates: flume::Sender<StatusUpdate>,
    ) -> Self {
        Self {
            dataset_ops,
            interval,
            updates,
            handle: None,
            last_poll_id: 0,
        }
    }

    /// Queries right away, then once per interval. Returns the id tagging this sequence.
    pub fn start(&mut self, file_key: &str) -> u64 {
        self.stop();

        self.last_poll_id += 1;
        let poll_id = self.last_poll_id;
        let (task, abort) = abortable(poll_loop(
            self.dataset_ops.clone(),
            self.interval,
            self.updates.clone(),
            poll_id,
            file_key.to_string(),
        ));
        async_std::task::spawn(task);

        tracing::info!(file_key, poll_id, "Status polling started");
        self.handle = Some(PollHandle {
            poll_id,
            file_key: file_key.to_string(),
            abort,
        });
        poll_id
    }

    /// Idempotent. The only place the handle is cleared.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort.abort();
            tracing::debug!(
                file_key = %handle.file_key,
                poll_id = handle.poll_id,
                "Status polling stopped"
            );
        }
    }

    pub fn is_polling(&self) -> bool {
        self.handle.is_some()
    }

    /// Id of the live sequence, if any. Updates carrying another id are stale.
    pub fn current_poll_id(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.poll_id)
    }

    pub fn file_key(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.file_key.as_str())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    dataset_ops: Arc<dyn DatasetServiceOps>,
    interval: Duration,
    updates: flume::Sender<StatusUpdate>,
    poll_id: u64,
    file_key: String,
) {
    loop {
        match dataset_ops.check_upload_status(&file_key).await {
            Ok(status) => {
                let terminal = status.is_terminal();
                tracing::debug!(%file_key, state = %status.state, terminal, "Status received");
                let update = StatusUpdate {
                    poll_id,
                    file_key: file_key.clone(),
                    status,
                };
                if updates.send(update).is_err() || terminal {
                    return;
                }
            }
            Err(e) => {
                // a failed query is retried on the next tick
                tracing::warn!(%file_key, error = %e, "Status query failed");
            }
        }
        async_std::task::sleep(interval).await;
    }
}
