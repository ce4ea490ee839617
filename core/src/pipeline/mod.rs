// bistro-core/src/pipeline/mod.rs

//! Named-step async pipelines. Every transactional workflow in this crate is one of these.

pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use control::{PipelineControl, PipelineResult};
pub use definition::Pipeline;
pub use step::{Handler, SkipCondition, StepDef, StepFuture};
