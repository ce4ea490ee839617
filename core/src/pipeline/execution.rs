// bistro-core/src/pipeline/execution.rs

//! `Pipeline::run()`: executes the steps in order against one context.

use super::control::{PipelineControl, PipelineResult};
use super::definition::Pipeline;
use crate::error::PipelineError;
use std::fmt::Display;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<Ctx, Err> Pipeline<Ctx, Err>
where
  Ctx: Send + 'static,
  Err: From<PipelineError> + Display + Send + 'static,
{
  /// Runs every step against `ctx`.
  ///
  /// Skipped steps (their `skip_if` returned `true`) are not required to have handlers.
  /// Any other step without handlers fails the run with `PipelineError::HandlerMissing`.
  /// The first handler error aborts the run and is returned as-is.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = self.name, num_steps = self.steps.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: &mut Ctx) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_index, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(&*ctx) {
          event!(Level::DEBUG, step = step_name, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let handlers = match self.on.get(step_name) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ => {
          event!(Level::ERROR, step = step_name, "Step has no handlers.");
          return Err(Err::from(PipelineError::HandlerMissing {
            pipeline: self.name,
            step_name: step_def.name.clone(),
          }));
        }
      };

      let step_span = info_span!("pipeline_step", step_name, step_index);
      for handler in handlers {
        match handler(&mut *ctx).instrument(step_span.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => {
            event!(Level::INFO, step = step_name, "Pipeline stopped by a handler.");
            return Ok(PipelineResult::Stopped);
          }
          Err(e) => {
            event!(Level::WARN, step = step_name, error = %e, "Step handler failed.");
            return Err(e);
          }
        }
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}
