//! # clearsign
//!
//! The publish pipeline and server around `clearsign-core`.
//!
//! A finished clear-signing document is published in three explicit stages,
//! each bound to one external system:
//!
//! ```text
//! SchemaDocument ──► [1] content store ──► [2] chain anchor ──► [3] knowledge graph
//!                        (blob id)            (tx hash)             (entity id, tx hash)
//! ```
//!
//! Stages never chain automatically. Each one is started by the caller
//! through [`pipeline::PublishAttempt::run_stage`] and its outcome lands in
//! an append-only [`pipeline::PublishState`].

pub mod api;
pub mod chain;
pub mod clients;
pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{PipelineConfig, SigningKey};
pub use error::{AppError, NetworkMismatch, PublishError};
pub use pipeline::{
    Phase, PublishAttempt, PublishServices, PublishState, Stage, StageOutcome, StageRequest,
    StageResult,
};
