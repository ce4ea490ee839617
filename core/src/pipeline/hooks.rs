// bistro-core/src/pipeline/hooks.rs

//! Handler registration.

use super::definition::Pipeline;
use super::step::StepFuture;

impl<Ctx, Err> Pipeline<Ctx, Err>
where
  Ctx: Send + 'static,
  Err: Send + 'static,
{
  /// Registers a handler for `step_name`. Handlers of one step run in registration order.
  ///
  /// Panics if the step was not declared in [`Pipeline::new`].
  pub fn on<F>(&mut self, step_name: &str, handler: F) -> &mut Self
  where
    F: for<'a> Fn(&'a mut Ctx) -> StepFuture<'a, Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    self.on.entry(step_name.to_string()).or_default().push(Box::new(handler));
    self
  }

  pub fn handler_count(&self, step_name: &str) -> usize {
    self.on.get(step_name).map_or(0, Vec::len)
  }
}
