// bistro-core/src/pipeline/step.rs

//! Step definitions and the handler signature.

use super::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Predicate evaluated against the context before a step runs. `true` skips the step.
pub type SkipCondition<Ctx> = Arc<dyn Fn(&Ctx) -> bool + Send + Sync + 'static>;

/// Future returned by a step handler. It borrows the context mutably for its whole lifetime,
/// which lets a handler keep a database transaction inside the context across `.await` points.
pub type StepFuture<'a, Err> = Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send + 'a>>;

/// A registered step handler.
///
/// Plain `fn` items with the signature `fn(&mut Ctx) -> StepFuture<'_, Err>` coerce into this.
pub type Handler<Ctx, Err> = Box<dyn for<'a> Fn(&'a mut Ctx) -> StepFuture<'a, Err> + Send + Sync + 'static>;

/// Definition of a pipeline step: its name and an optional skip condition.
#[derive(Clone)]
pub struct StepDef<Ctx> {
  pub name: String,
  pub skip_if: Option<SkipCondition<Ctx>>,
}

impl<Ctx> std::fmt::Debug for StepDef<Ctx> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
