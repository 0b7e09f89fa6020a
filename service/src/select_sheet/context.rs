use std::sync::Arc;

use async_std::channel::Sender;
use core_types::{FileDescriptor, FileType, ProcessingStatus, events::PipelineEvent};
use dataset_client::{DatasetServiceOps, GridQuery};

use crate::{
    error::Error,
    grid_cache::{GridCache, GridFetchOutcome},
    renderer::GridRenderer,
};

pub struct PreviewContext {
    pub dataset_ops: Arc<dyn DatasetServiceOps>,
    pub renderer: Arc<dyn GridRenderer>,
    pub events: Sender<PipelineEvent>,

    pub descriptor: FileDescriptor,
    // Resolved by ResolveFileTypeStep
    pub file_type: Option<FileType>,
    /// Working delimiter used for grid queries. Written back to the descriptor on advance.
    pub column_delimiter: String,
    /// Sheet rendered after a fetch.
    pub default_sheet_index: usize,
    /// Set when a processed upload replaced the file, cleared by a sheet selection.
    pub is_changed: bool,
    /// The grid area shows nothing: no fetch yet, an empty result or an unrenderable sheet.
    pub clear_grid: bool,
    pub grid_cache: GridCache,
    /// Terminal status of the last processed upload.
    pub upload_result: Option<ProcessingStatus>,
    pub last_fetch: Option<GridFetchOutcome>,
}

impl PreviewContext {
    pub fn new(
        dataset_ops: Arc<dyn DatasetServiceOps>,
        renderer: Arc<dyn GridRenderer>,
        events: Sender<PipelineEvent>,
        default_delimiter: &str,
    ) -> Self {
        Self {
            dataset_ops,
            renderer,
            events,
            descriptor: FileDescriptor::default(),
            file_type: None,
            column_delimiter: default_delimiter.to_string(),
            default_sheet_index: 0,
            is_changed: false,
            clear_grid: true,
            grid_cache: GridCache::new(),
            upload_result: None,
            last_fetch: None,
        }
    }

    pub fn emit(&self, event: PipelineEvent) {
        // the receiver may be gone during teardown
        if let Err(e) = self.events.try_send(event) {
            tracing::debug!(error = %e, "Pipeline event dropped");
        }
    }

    pub fn grid_query(&self) -> Result<GridQuery, Error> {
        let file_type = match self.file_type {
            Some(file_type) => file_type,
            None => self.descriptor.file_type()?,
        };
        Ok(GridQuery {
            file_key: self.descriptor.file_key.clone(),
            sheet_name: self.descriptor.sheet_name.clone(),
            delimiter: self.column_delimiter.clone(),
            file_type,
        })
    }

    /// Renders sheet `sheet_index` from the cache, or clears the grid area when the cache
    /// has no renderable grid for it. Never fetches.
    pub fn show_sheet(&mut self, sheet_index: usize) -> bool {
        let rendered = match self.grid_cache.get(sheet_index) {
            Some(grid) if grid.is_renderable() => {
                self.renderer.render(sheet_index, grid);
                Some((grid.data.len(), grid.fields.len()))
            }
            _ => None,
        };

        match rendered {
            Some((rows, columns)) => {
                self.clear_grid = false;
                tracing::debug!(sheet_index, rows, columns, "Grid rendered");
                self.emit(PipelineEvent::GridRendered {
                    sheet_index,
                    rows,
                    columns,
                });
                true
            }
            None => {
                self.mark_grid_cleared();
                false
            }
        }
    }

    pub fn mark_grid_cleared(&mut self) {
        self.clear_grid = true;
        self.renderer.clear();
        self.emit(PipelineEvent::GridCleared);
    }

    /// Fetches every grid of the file for the current delimiter and sheet, replacing the
    /// whole cache, then shows `default_sheet_index`.
    ///
    /// A failed request clears the grid and is only logged.
    #[tracing::instrument(skip_all, fields(file_key = %self.descriptor.file_key))]
    pub async fn fetch_grid_information(&mut self) -> GridFetchOutcome {
        self.emit(PipelineEvent::Loading(true));

        let result = match self.grid_query() {
            Ok(query) => self
                .dataset_ops
                .get_file_grid_info(&query)
                .await
                .map_err(Error::from),
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(response) if !response.grids.is_empty() => {
                let grids = response.grids.len();
                self.grid_cache.replace(response.grids);
                self.clear_grid = false;
                self.show_sheet(self.default_sheet_index);
                GridFetchOutcome::Loaded { grids }
            }
            Ok(_) => {
                tracing::info!("No grids returned for file");
                self.grid_cache.clear();
                self.mark_grid_cleared();
                GridFetchOutcome::Empty
            }
            Err(e) => {
                tracing::warn!(error = %e, "Grid information fetch failed");
                self.grid_cache.discard();
                self.mark_grid_cleared();
                GridFetchOutcome::Failed(e.to_string())
            }
        };

        self.emit(PipelineEvent::Loading(false));
        self.last_fetch = Some(outcome.clone());
        outcome
    }
}
