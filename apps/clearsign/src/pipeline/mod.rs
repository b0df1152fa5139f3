//! # Publish Pipeline
//!
//! - `state`: stages, phases and the append-only result record
//! - `attempt`: the single-flight driver that runs one stage at a time

pub mod attempt;
pub mod state;

pub use attempt::{
    AttemptSnapshot, PublishAttempt, PublishServices, StageOutcome, StageRequest, StageResult,
};
pub use state::{GraphWriteProgress, Phase, PublishState, Stage, StageFailure};
