use super::pipeline_step::{PipelineStep, StepAction};
use crate::error::Error;

/// A generic pipeline that executes a series of steps in sequence.
///
/// Each step can decide whether to continue, skip remaining steps, or abort the entire
/// pipeline. `T` is the context passed through all steps.
pub struct Pipeline<T> {
    pub steps: Vec<Box<dyn PipelineStep<T>>>,
}

impl<T> Pipeline<T> {
    /// Create a pipeline with the given steps.
    pub fn with_steps(steps: Vec<Box<dyn PipelineStep<T>>>) -> Self {
        Self { steps }
    }

    /// Execute all steps in the pipeline in sequence.
    ///
    /// Returns `Ok(())` if all steps complete or a step returns `Skip`, and the step's
    /// error if it returns `Abort`.
    pub async fn execute(&self, context: &mut T) -> Result<(), Error> {
        for step in &self.steps {
            if !step.should_execute(context) {
                tracing::debug!("Step {} will be skipped based on context", step.name());
                continue;
            }

            tracing::debug!("Executing step: {}", step.name());

            match step.execute(context).await {
                StepAction::Continue => continue,
                StepAction::Skip => {
                    tracing::info!("Step {} requested skip - stopping pipeline", step.name());
                    return Ok(());
                }
                StepAction::Abort(error) => {
                    tracing::error!("Step {} aborted the pipeline: {}", step.name(), error);
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}
