pub mod generic_pipeline;
pub mod pipeline_step;

pub use generic_pipeline::Pipeline;
pub use pipeline_step::{PipelineStep, StepAction};
