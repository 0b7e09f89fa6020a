use crate::{
    pipeline::generic_pipeline::Pipeline,
    select_sheet::{
        context::PreviewContext,
        steps::{
            AdoptDescriptorDelimiterStep, AdoptProcessedFileStep, FetchGridInformationStep,
            PrepareSheetsStep, ResolveFileTypeStep,
        },
    },
};

impl Default for Pipeline<PreviewContext> {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline<PreviewContext> {
    /// Opens the preview for a descriptor handed over from an earlier step.
    pub fn new() -> Self {
        Self::with_steps(vec![
            Box::new(ResolveFileTypeStep),
            Box::new(AdoptDescriptorDelimiterStep),
            Box::new(PrepareSheetsStep),
            Box::new(FetchGridInformationStep),
        ])
    }

    /// Runs once the server finished processing an upload.
    pub fn for_processed_file() -> Self {
        Self::with_steps(vec![
            Box::new(AdoptProcessedFileStep),
            Box::new(ResolveFileTypeStep),
            Box::new(FetchGridInformationStep),
        ])
    }
}
