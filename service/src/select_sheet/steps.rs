use crate::{
    error::Error,
    grid_cache::GridFetchOutcome,
    pipeline::pipeline_step::{PipelineStep, StepAction},
    select_sheet::context::PreviewContext,
};

/// Resolves the file type from the descriptor's filename. A descriptor without a
/// filename is still waiting for an upload, so the rest of the pipeline is skipped.
pub struct ResolveFileTypeStep;

#[async_trait::async_trait]
impl PipelineStep<PreviewContext> for ResolveFileTypeStep {
    fn name(&self) -> &'static str {
        "resolve_file_type"
    }

    async fn execute(&self, context: &mut PreviewContext) -> StepAction {
        if context.descriptor.filename.is_empty() {
            tracing::debug!("No file yet, waiting for an upload");
            return StepAction::Skip;
        }
        match context.descriptor.file_type() {
            Ok(file_type) => {
                context.file_type = Some(file_type);
                StepAction::Continue
            }
            Err(e) => {
                tracing::error!(filename = %context.descriptor.filename, error = %e, "Unsupported file");
                StepAction::Abort(Error::from(e))
            }
        }
    }
}

/// A delimiter chosen earlier for this file wins over the default one.
pub struct AdoptDescriptorDelimiterStep;

#[async_trait::async_trait]
impl PipelineStep<PreviewContext> for AdoptDescriptorDelimiterStep {
    fn name(&self) -> &'static str {
        "adopt_descriptor_delimiter"
    }

    fn should_execute(&self, context: &PreviewContext) -> bool {
        context.descriptor.has_delimiter()
    }

    async fn execute(&self, context: &mut PreviewContext) -> StepAction {
        context.column_delimiter = context.descriptor.delimiter.clone();
        StepAction::Continue
    }
}

/// Workbook types start on the first sheet. Selections already made for the file are
/// kept, otherwise they are derived from the sheet names.
pub struct PrepareSheetsStep;

#[async_trait::async_trait]
impl PipelineStep<PreviewContext> for PrepareSheetsStep {
    fn name(&self) -> &'static str {
        "prepare_sheets"
    }

    fn should_execute(&self, context: &PreviewContext) -> bool {
        context.file_type.is_some_and(|t| !t.is_delimited())
    }

    async fn execute(&self, context: &mut PreviewContext) -> StepAction {
        context.descriptor.sheet_index = 0;
        if context.descriptor.selected_sheets().is_empty() {
            context.descriptor.refresh_selected_sheets();
        }
        StepAction::Continue
    }
}

/// Takes over the file the server produced from the upload: name, path, sheets and key.
/// The first sheet becomes current.
pub struct AdoptProcessedFileStep;

#[async_trait::async_trait]
impl PipelineStep<PreviewContext> for AdoptProcessedFileStep {
    fn name(&self) -> &'static str {
        "adopt_processed_file"
    }

    fn should_execute(&self, context: &PreviewContext) -> bool {
        context.upload_result.is_some()
    }

    async fn execute(&self, context: &mut PreviewContext) -> StepAction {
        let Some(result) = context.upload_result.clone() else {
            return StepAction::Skip;
        };

        context.is_changed = true;
        context.default_sheet_index = 0;

        let descriptor = &mut context.descriptor;
        if let Some(filename) = result.filename {
            descriptor.filename = filename;
        }
        if let Some(filepath) = result.filepath {
            descriptor.filepath = filepath;
        }
        if let Some(file_key) = result.file_key {
            descriptor.file_key = file_key;
        }
        descriptor.set_sheets(result.sheets.unwrap_or_default());
        descriptor.sheet_index = 0;
        descriptor.sheet_name = descriptor.sheets.first().cloned().unwrap_or_default();

        tracing::info!(
            file_key = %descriptor.file_key,
            filename = %descriptor.filename,
            sheets = descriptor.sheets.len(),
            "Adopted processed file"
        );
        StepAction::Continue
    }
}

/// Fetch failures and empty results leave the grid cleared but never abort.
pub struct FetchGridInformationStep;

#[async_trait::async_trait]
impl PipelineStep<PreviewContext> for FetchGridInformationStep {
    fn name(&self) -> &'static str {
        "fetch_grid_information"
    }

    async fn execute(&self, context: &mut PreviewContext) -> StepAction {
        match context.fetch_grid_information().await {
            GridFetchOutcome::Loaded { grids } => {
                tracing::debug!(grids, "Grid information loaded");
            }
            GridFetchOutcome::Empty => {}
            GridFetchOutcome::Failed(message) => {
                tracing::debug!(%message, "Continuing without a preview");
            }
        }
        StepAction::Continue
    }
}
