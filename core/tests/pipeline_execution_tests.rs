// tests/pipeline_execution_tests.rs
mod common;

use bistro_core::pipeline::SkipCondition;
use bistro_core::{Pipeline, PipelineResult, StepFuture};
use common::*;
use serial_test::serial;
use std::sync::Arc;

fn step1(ctx: &mut TestContext) -> StepFuture<'_, TestError> {
  Box::pin(async move { Ok(record_step(ctx, "step1", " S1")) })
}

fn step2(ctx: &mut TestContext) -> StepFuture<'_, TestError> {
  Box::pin(async move { Ok(record_step(ctx, "step2", " S2")) })
}

fn step2_extra(ctx: &mut TestContext) -> StepFuture<'_, TestError> {
  Box::pin(async move { Ok(record_step(ctx, "step2_extra", "+")) })
}

fn step3(ctx: &mut TestContext) -> StepFuture<'_, TestError> {
  Box::pin(async move {
    // Suspends so the step genuinely crosses an await point while holding the context.
    tokio::task::yield_now().await;
    Ok(record_step(ctx, "step3", " S3"))
  })
}

fn three_step_pipeline() -> Pipeline<TestContext, TestError> {
  let mut pipeline = Pipeline::<TestContext, TestError>::new("three_steps", &[("step1", None), ("step2", None), ("step3", None)]);
  pipeline.on("step1", step1).on("step2", step2).on("step3", step3);
  pipeline
}

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let pipeline = three_step_pipeline();
  let mut ctx = TestContext::default();

  let result = pipeline.run(&mut ctx).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.counter, 3);
  assert_eq!(ctx.message, " S1 S2 S3");
  assert_eq!(ctx.steps_executed, vec!["step1", "step2", "step3"]);
  assert_eq!(pipeline.step_names(), vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let pipeline = three_step_pipeline();
  let mut ctx = TestContext {
    should_stop_at: Some("step2".to_string()),
    ..Default::default()
  };

  let result = pipeline.run(&mut ctx).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.steps_executed, vec!["step1", "step2"]);
  assert_eq!(ctx.message, " S1 S2");
}

#[tokio::test]
#[serial]
async fn test_handlers_of_one_step_run_in_registration_order() {
  setup_tracing();
  let mut pipeline = three_step_pipeline();
  pipeline.on("step2", step2_extra);
  assert_eq!(pipeline.handler_count("step2"), 2);

  let mut ctx = TestContext::default();
  pipeline.run(&mut ctx).await.unwrap();

  assert_eq!(ctx.steps_executed, vec!["step1", "step2", "step2_extra", "step3"]);
  assert_eq!(ctx.message, " S1 S2+ S3");
}

#[tokio::test]
#[serial]
async fn test_skip_condition_bypasses_step() {
  setup_tracing();
  let skip_middle: SkipCondition<TestContext> = Arc::new(|ctx: &TestContext| ctx.skip_middle);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(
    "skippable",
    &[("step1", None), ("step2", Some(skip_middle)), ("step3", None)],
  );
  pipeline.on("step1", step1).on("step2", step2).on("step3", step3);

  let mut skipped = TestContext {
    skip_middle: true,
    ..Default::default()
  };
  pipeline.run(&mut skipped).await.unwrap();
  assert_eq!(skipped.steps_executed, vec!["step1", "step3"]);

  let mut full = TestContext::default();
  pipeline.run(&mut full).await.unwrap();
  assert_eq!(full.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_skip_condition_can_be_replaced_after_construction() {
  setup_tracing();
  let mut pipeline = three_step_pipeline();
  pipeline.set_skip_condition("step1", Some(Arc::new(|_: &TestContext| true)));

  let mut ctx = TestContext::default();
  pipeline.run(&mut ctx).await.unwrap();

  assert_eq!(ctx.steps_executed, vec!["step2", "step3"]);
}

#[test]
#[should_panic(expected = "step 'nope' not found")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = three_step_pipeline();
  pipeline.on("nope", step1);
}

#[test]
#[should_panic(expected = "defined twice")]
fn test_duplicate_step_names_panic() {
  let _ = Pipeline::<TestContext, TestError>::new("dupes", &[("a", None), ("a", None)]);
}
