// bistro-core/src/pipeline/definition.rs

//! The `Pipeline<Ctx, Err>` struct and its construction.

use super::step::{Handler, SkipCondition, StepDef};
use std::collections::HashMap;

/// An ordered list of named steps, each backed by one or more async handlers.
///
/// Pipelines are built once (at startup) and shared; every run gets its own `&mut Ctx`.
/// `Err` is the error type handlers return. Framework failures such as a step without
/// handlers are converted into it through `From<PipelineError>`.
pub struct Pipeline<Ctx, Err> {
  pub(crate) name: &'static str,
  pub(crate) steps: Vec<StepDef<Ctx>>,
  pub(crate) on: HashMap<String, Vec<Handler<Ctx, Err>>>,
}

impl<Ctx, Err> Pipeline<Ctx, Err>
where
  Ctx: Send + 'static,
  Err: Send + 'static,
{
  /// Creates a pipeline from `(step_name, skip_if)` definitions, in execution order.
  pub fn new(name: &'static str, step_defs: &[(&str, Option<SkipCondition<Ctx>>)]) -> Self {
    let mut pipeline = Self {
      name,
      steps: Vec::with_capacity(step_defs.len()),
      on: HashMap::new(),
    };
    for (step_name, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(step_name);
      pipeline.steps.push(StepDef {
        name: (*step_name).to_string(),
        skip_if: skip_if.clone(),
      });
    }
    pipeline
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics if the step is not defined. A typo in a step name is a setup bug, not a runtime error.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Pipeline '{}' setup error: step '{}' not found in pipeline definition.",
        self.name, step_name
      );
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "Pipeline '{}' setup error: step '{}' is defined twice.",
        self.name, step_name
      );
    }
  }

  /// Replaces the skip condition of an existing step.
  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<Ctx>>) {
    self.ensure_step_exists(step_name);
    if let Some(step) = self.steps.iter_mut().find(|s| s.name == step_name) {
      step.skip_if = skip_if;
    }
  }
}
