pub mod context;
pub mod coordinator;
pub mod pipeline;
pub mod steps;

pub use context::PreviewContext;
pub use coordinator::{AdvanceOutcome, Command, PipelineCoordinator};
