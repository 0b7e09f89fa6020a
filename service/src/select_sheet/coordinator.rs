use std::sync::Arc;

use async_std::channel::Sender;
use core_types::{
    FileDescriptor, PipelineStage, StatusOutcome, UploadState,
    events::{Notice, PipelineEvent, TransportEvent},
};
use dataset_client::DatasetServiceOps;
use futures::{FutureExt, pin_mut, select};
use serde::Deserialize;
use upload_transport::{FileFilters, SelectedFile, UploadTransportOps};

use crate::{
    error::Error,
    grid_cache::GridFetchOutcome,
    pipeline::Pipeline,
    renderer::GridRenderer,
    select_sheet::context::PreviewContext,
    settings::Settings,
    status_poller::{StatusPoller, StatusUpdate},
    upload_session::{GENERIC_UPLOAD_FAILURE_MESSAGE, UploadRejection, UploadSession},
};

pub const PROCESSING_FAILED_MESSAGE: &str = "Failed to upload. Please select another file";
pub const DELIMITER_REQUIRED_MESSAGE: &str = "Column delimiter is required.";
/// Dataset kind announced when advancing past the file step.
pub const FILE_DATASET_KIND: &str = "FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced,
    /// A warning notice was emitted.
    MissingDelimiter,
    /// Nothing to preview. Aborts without any feedback.
    GridEmpty,
}

/// User actions fed to `PipelineCoordinator::run`.
#[derive(Debug, Clone)]
pub enum Command {
    AddFiles(Vec<SelectedFile>),
    /// `true` pauses, `false` resumes.
    PauseUpload(bool),
    CancelUpload,
    SelectSheet(usize),
    ChangeDelimiter(String),
    Advance,
    Close,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filekey: String,
}

/// Sequences upload, status polling and the grid preview for one file step.
///
/// Every transport callback and status answer is routed through `&mut self`, so the
/// descriptor and grid cache are only ever changed by one callback at a time.
pub struct PipelineCoordinator {
    context: PreviewContext,
    session: UploadSession,
    poller: StatusPoller,
    status_rx: flume::Receiver<StatusUpdate>,
    stage: PipelineStage,
    closed: bool,
}

impl PipelineCoordinator {
    pub fn new(
        settings: &Settings,
        transport: Arc<dyn UploadTransportOps>,
        dataset_ops: Arc<dyn DatasetServiceOps>,
        renderer: Arc<dyn GridRenderer>,
        events: Sender<PipelineEvent>,
    ) -> Self {
        let filters = FileFilters::default().with_max_file_size(settings.max_file_size);
        let (status_tx, status_rx) = flume::unbounded();
        let poller = StatusPoller::new(dataset_ops.clone(), settings.poll_interval, status_tx);
        Self {
            context: PreviewContext::new(dataset_ops, renderer, events, &settings.default_delimiter),
            session: UploadSession::new(transport, filters),
            poller,
            status_rx,
            stage: PipelineStage::SelectingFile,
            closed: false,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.context.descriptor
    }

    pub fn context(&self) -> &PreviewContext {
        &self.context
    }

    pub fn upload_state(&self) -> UploadState {
        self.session.state()
    }

    pub fn active_file(&self) -> Option<&SelectedFile> {
        self.session.active_file()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn set_stage(&mut self, stage: PipelineStage) {
        if self.stage != stage {
            tracing::debug!(from = %self.stage, to = %stage, "Pipeline stage changed");
            self.stage = stage;
            self.context.emit(PipelineEvent::StageChanged(stage));
        }
    }

    fn notify(&self, notice: Notice) {
        self.context.emit(PipelineEvent::Notice(notice));
    }

    /// Opens the step for `descriptor`. A descriptor naming a file goes straight to the
    /// preview, since the file is already on the server. An empty one waits for an upload.
    #[tracing::instrument(skip_all, fields(filename = %descriptor.filename))]
    pub async fn initialize(&mut self, descriptor: FileDescriptor) -> Result<(), Error> {
        self.context.descriptor = descriptor;
        self.context.file_type = None;
        Pipeline::<PreviewContext>::new()
            .execute(&mut self.context)
            .await?;
        if self.context.file_type.is_some() {
            self.set_stage(PipelineStage::PreviewReady);
        }
        Ok(())
    }

    /// Hands picked files to the upload session. A rejection emits exactly one notice and
    /// leaves any active transfer alone.
    pub fn add_files(&mut self, files: Vec<SelectedFile>) -> Result<(), UploadRejection> {
        if let Err(rejection) = self.session.add_files(files) {
            self.notify(rejection.notice());
            return Err(rejection);
        }
        self.poller.stop();
        self.set_stage(PipelineStage::Uploading);
        self.context.emit(PipelineEvent::UploadProgress { percent: 0 });
        Ok(())
    }

    pub fn pause_upload(&mut self, paused: bool) {
        match self.session.pause(paused) {
            Ok(Some(notice)) => self.notify(notice),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, paused, "Pause request failed"),
        }
    }

    /// Cancels the transfer and any poll, leaving the transport ready for the next file.
    pub fn cancel_upload(&mut self) {
        self.session.cancel();
        self.session.discard_upload();
        self.poller.stop();
        self.set_stage(PipelineStage::SelectingFile);
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.closed {
            tracing::debug!(?event, "Transport event after close ignored");
            return;
        }
        match event {
            TransportEvent::FileStarting { file_id } => self.session.on_file_starting(&file_id),
            TransportEvent::Progress { file_id, percent } => {
                if let Some(percent) = self.session.on_progress(&file_id, percent) {
                    self.context.emit(PipelineEvent::UploadProgress { percent });
                }
            }
            TransportEvent::Uploaded { file_id, response } => {
                if let Some(response) = self.session.on_uploaded(&file_id, response) {
                    self.on_upload_complete(&response);
                }
            }
            TransportEvent::Failed { code, message } => {
                let notice = self.session.on_error(code, &message);
                self.poller.stop();
                self.notify(notice);
                self.set_stage(PipelineStage::SelectingFile);
            }
        }
    }

    fn on_upload_complete(&mut self, response: &str) {
        let file_key = match serde_json::from_str::<UploadResponse>(response) {
            Ok(parsed) => parsed.filekey,
            Err(e) => {
                tracing::error!(error = %e, response, "Upload response has no file key");
                self.session.discard_upload();
                self.notify(Notice::error(GENERIC_UPLOAD_FAILURE_MESSAGE));
                self.set_stage(PipelineStage::SelectingFile);
                return;
            }
        };
        self.context.emit(PipelineEvent::UploadProgress { percent: 100 });
        self.set_stage(PipelineStage::Polling);
        self.context.emit(PipelineEvent::Loading(true));
        self.poller.start(&file_key);
    }

    /// Waits for the next status answer. `None` once the poller is gone.
    pub async fn next_status_update(&self) -> Option<StatusUpdate> {
        self.status_rx.recv_async().await.ok()
    }

    /// Applies a status answer. Answers from a poll sequence that is no longer live are
    /// dropped and return `None`.
    pub async fn handle_status_update(&mut self, update: StatusUpdate) -> Option<StatusOutcome> {
        if self.closed || self.poller.current_poll_id() != Some(update.poll_id) {
            tracing::debug!(poll_id = update.poll_id, "Stale status update ignored");
            return None;
        }

        let outcome = update.status.outcome();
        match outcome {
            StatusOutcome::Pending => {}
            StatusOutcome::Completed => {
                self.poller.stop();
                self.context.upload_result = Some(update.status);
                if let Err(e) = Pipeline::<PreviewContext>::for_processed_file()
                    .execute(&mut self.context)
                    .await
                {
                    tracing::error!(error = %e, "Processed file could not be previewed");
                    self.session.discard_upload();
                    self.context.emit(PipelineEvent::Loading(false));
                    self.notify(Notice::error(e.to_string()));
                    self.set_stage(PipelineStage::SelectingFile);
                    return Some(outcome);
                }
                self.set_stage(PipelineStage::PreviewReady);
            }
            StatusOutcome::Failed => {
                tracing::warn!(file_key = %update.file_key, "Server failed to process upload");
                self.poller.stop();
                self.session.discard_upload();
                self.context.emit(PipelineEvent::Loading(false));
                self.notify(Notice::error(PROCESSING_FAILED_MESSAGE));
                self.set_stage(PipelineStage::SelectingFile);
            }
        }
        Some(outcome)
    }

    /// Shows sheet `sheet_index` from the cache. Never fetches. Returns whether a grid was
    /// drawn.
    pub fn select_sheet(&mut self, sheet_index: usize) -> Result<bool, Error> {
        self.context.descriptor.set_sheet_index(sheet_index)?;
        self.context.is_changed = false;
        self.context.default_sheet_index = sheet_index;
        Ok(self.context.show_sheet(sheet_index))
    }

    /// Refetches every grid with the new delimiter. An empty delimiter changes nothing.
    pub async fn change_delimiter(&mut self, delimiter: &str) -> Option<GridFetchOutcome> {
        if delimiter.is_empty() {
            return None;
        }
        tracing::info!(delimiter, "Column delimiter changed");
        self.context.column_delimiter = delimiter.to_string();
        self.context.is_changed = true;
        Some(self.context.fetch_grid_information().await)
    }

    /// Moves on to naming the dataset. The working delimiter is written to the
    /// descriptor first.
    pub fn advance(&mut self) -> AdvanceOutcome {
        self.context.descriptor.delimiter = self.context.column_delimiter.clone();

        if !self.context.descriptor.has_delimiter() {
            self.context.column_delimiter.clear();
            self.notify(Notice::warning(DELIMITER_REQUIRED_MESSAGE));
            return AdvanceOutcome::MissingDelimiter;
        }
        if self.context.clear_grid {
            tracing::debug!("Nothing to preview, advance ignored");
            return AdvanceOutcome::GridEmpty;
        }

        self.context.emit(PipelineEvent::AdvanceRequested {
            dataset_kind: FILE_DATASET_KIND.to_string(),
            descriptor: self.context.descriptor.clone(),
        });
        self.set_stage(PipelineStage::AdvanceRequested);
        AdvanceOutcome::Advanced
    }

    /// Tears the step down whatever stage it is in: the poll stops, the transport handle
    /// is dropped and later callbacks are ignored.
    pub fn cancel_step(&mut self) {
        if self.closed {
            return;
        }
        self.poller.stop();
        self.session.shutdown();
        self.context.grid_cache.discard();
        self.closed = true;
        self.set_stage(PipelineStage::Cancelled);
    }

    pub async fn execute_command(&mut self, command: Command) {
        match command {
            Command::AddFiles(files) => {
                let _ = self.add_files(files);
            }
            Command::PauseUpload(paused) => self.pause_upload(paused),
            Command::CancelUpload => self.cancel_upload(),
            Command::SelectSheet(sheet_index) => {
                if let Err(e) = self.select_sheet(sheet_index) {
                    tracing::warn!(sheet_index, error = %e, "Sheet selection rejected");
                }
            }
            Command::ChangeDelimiter(delimiter) => {
                self.change_delimiter(&delimiter).await;
            }
            Command::Advance => {
                self.advance();
            }
            Command::Close => self.cancel_step(),
        }
    }

    /// Drives the step until it is closed, handling transport callbacks, status answers
    /// and commands one at a time. Dropping the command sender closes the step.
    pub async fn run(
        &mut self,
        transport_events: flume::Receiver<TransportEvent>,
        commands: flume::Receiver<Command>,
    ) {
        let status_rx = self.status_rx.clone();
        let mut transport_open = true;

        while !self.closed {
            let transport = &transport_events;
            let open = transport_open;
            let transport_next = async move {
                if open {
                    transport.recv_async().await.ok()
                } else {
                    futures::future::pending::<Option<TransportEvent>>().await
                }
            }
            .fuse();
            let status_next = status_rx.recv_async().fuse();
            let command_next = commands.recv_async().fuse();
            pin_mut!(transport_next, status_next, command_next);

            select! {
                event = transport_next => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => {
                        tracing::warn!("Upload transport channel closed");
                        transport_open = false;
                    }
                },
                update = status_next => {
                    if let Ok(update) = update {
                        self.handle_status_update(update).await;
                    }
                },
                command = command_next => match command {
                    Ok(command) => self.execute_command(command).await,
                    Err(_) => self.cancel_step(),
                },
            }
        }
        tracing::info!("Pipeline closed");
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        self.cancel_step();
    }
}
