use crate::error::Error;

/// The action to take after a step completes.
///
/// Steps return this enum to control pipeline flow:
/// - `Continue`: Proceed to the next step normally
/// - `Skip`: Successfully exit early without running remaining steps
/// - `Abort`: Stop the pipeline with an error
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Continue to the next step
    Continue,
    /// Skip all remaining steps (successful early exit)
    Skip,
    /// Abort the pipeline with an error
    Abort(Error),
}

/// A single step of a pipeline.
///
/// Each step receives a mutable reference to the context, reads the shared state and
/// dependencies from it, stores its results back, and returns a `StepAction`.
///
/// # Example
///
/// ```ignore
/// struct RequireFileKeyStep;
///
/// #[async_trait::async_trait]
/// impl PipelineStep<PreviewContext> for RequireFileKeyStep {
///     fn name(&self) -> &'static str {
///         "require_file_key"
///     }
///
///     async fn execute(&self, context: &mut PreviewContext) -> StepAction {
///         if context.descriptor.file_key.is_empty() {
///             return StepAction::Abort(Error::InvalidInput("File key missing".into()));
///         }
///         StepAction::Continue
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait PipelineStep<T>: Send + Sync {
    /// Returns the name of this step for logging and debugging.
    fn name(&self) -> &'static str;

    /// Determines if this step should execute based on current context.
    ///
    /// Steps that return `false` are skipped without affecting the pipeline flow.
    fn should_execute(&self, _context: &T) -> bool {
        true // By default, always execute
    }

    /// Execute the step, modifying the context and returning the next action.
    async fn execute(&self, context: &mut T) -> StepAction;
}
