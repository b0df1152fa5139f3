//! # Publish Attempt
//!
//! Single-flight driver of the three stages for one document.
//!
//! ## Rules
//!
//! - Stages run only when the caller asks; nothing chains automatically.
//! - At most one stage is in flight. A second `run_stage` meanwhile returns
//!   `StageInFlight` and changes nothing.
//! - A completed stage is never run again in the same attempt.
//! - A missing precondition fails before any network call, is recorded in
//!   the stage's error slot, and leaves the phase where it was.
//! - Dropping a running stage future clears the in-flight marker and puts
//!   the phase back. Side effects already accepted remotely stay.
//!
//! The state lock is never held across an `.await`.

use super::state::{GraphWriteProgress, Phase, PublishState, Stage, StageFailure};
use crate::chain::{publish_metadata_calldata, to_quantity};
use crate::clients::knowledge_graph::ContractEntityInput;
use crate::clients::wallet::{UNRECOGNIZED_CHAIN, USER_REJECTED};
use crate::clients::{
    ContentStore, GeoApiClient, JsonRpcWallet, KeyTransactor, KnowledgeGraph, LocalKeyTransactor,
    StoredContent, TransactionRequest, WalrusPublisher, Wallet, build_contract_edit,
};
use crate::config::PipelineConfig;
use crate::error::PublishError;
use clearsign_core::SchemaDocument;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// =============================================================================
// SERVICES
// =============================================================================

/// External systems an attempt talks to.
#[derive(Clone)]
pub struct PublishServices {
    pub content_store: Arc<dyn ContentStore>,
    /// Absent when no wallet is connected; stage 2 then fails with
    /// `WalletUnavailable`.
    pub wallet: Option<Arc<dyn Wallet>>,
    pub knowledge_graph: Arc<dyn KnowledgeGraph>,
    pub transactor: Arc<dyn KeyTransactor>,
}

impl PublishServices {
    /// HTTP clients for every endpoint in `config`.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            content_store: Arc::new(WalrusPublisher::from_config(config)),
            wallet: config
                .wallet_rpc_url
                .as_deref()
                .map(|url| Arc::new(JsonRpcWallet::new(url)) as Arc<dyn Wallet>),
            knowledge_graph: Arc::new(GeoApiClient::from_config(config)),
            transactor: Arc::new(LocalKeyTransactor::from_config(config)),
        }
    }

    /// Replace the wallet.
    #[must_use]
    pub fn with_wallet(mut self, wallet: Option<Arc<dyn Wallet>>) -> Self {
        self.wallet = wallet;
        self
    }
}

// =============================================================================
// REQUEST / OUTCOME
// =============================================================================

/// Which stage to run, plus inputs that may replace results from an
/// earlier session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    Content,
    ChainAnchor {
        /// Used when the attempt has no content ref of its own.
        content_ref: Option<String>,
        /// Defaults to the document's contract identifier.
        contract_id: Option<String>,
    },
    KnowledgeGraph {
        /// Used when the attempt has no anchor transaction of its own.
        chain_tx_hash: Option<String>,
        /// An edit uploaded earlier; must come with `entity_id`.
        edit_cid: Option<String>,
        entity_id: Option<String>,
    },
}

impl StageRequest {
    /// Request for `stage` without extra inputs.
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        match stage {
            Stage::Content => Self::Content,
            Stage::ChainAnchor => Self::ChainAnchor {
                content_ref: None,
                contract_id: None,
            },
            Stage::KnowledgeGraph => Self::KnowledgeGraph {
                chain_tx_hash: None,
                edit_cid: None,
                entity_id: None,
            },
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Content => Stage::Content,
            Self::ChainAnchor { .. } => Stage::ChainAnchor,
            Self::KnowledgeGraph { .. } => Stage::KnowledgeGraph,
        }
    }
}

/// Result of a successful stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageOutcome {
    #[serde(rename_all = "camelCase")]
    Content {
        content_ref: String,
        already_existed: bool,
        receipt: StoredContent,
    },
    #[serde(rename_all = "camelCase")]
    ChainAnchor { tx_hash: String, content_ref: String },
    #[serde(rename_all = "camelCase")]
    KnowledgeGraph {
        entity_id: String,
        edit_cid: String,
        tx_hash: String,
    },
}

pub type StageResult = Result<StageOutcome, PublishError>;

/// Point-in-time view of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    pub id: String,
    #[serde(flatten)]
    pub phase: Phase,
    pub in_flight: Option<Stage>,
    pub state: PublishState,
    /// Exact text the content stage uploads.
    pub payload: String,
}

// =============================================================================
// ATTEMPT
// =============================================================================

struct Inner {
    phase: Phase,
    in_flight: Option<Stage>,
    state: PublishState,
    /// Last time a stage started or settled.
    touched: Instant,
}

impl Inner {
    fn new() -> Self {
        Self {
            phase: Phase::default(),
            in_flight: None,
            state: PublishState::default(),
            touched: Instant::now(),
        }
    }
}

/// Validated inputs of a stage that is allowed to start.
enum Prepared {
    Content,
    ChainAnchor {
        content_ref: String,
        contract_id: String,
    },
    KnowledgeGraph {
        progress: GraphWriteProgress,
    },
}

/// One publish attempt of one document.
pub struct PublishAttempt {
    id: String,
    config: Arc<PipelineConfig>,
    services: PublishServices,
    document: SchemaDocument,
    payload: String,
    inner: Mutex<Inner>,
}

impl PublishAttempt {
    /// Fresh attempt in `Idle` with an empty state.
    #[must_use]
    pub fn new(
        document: SchemaDocument,
        config: Arc<PipelineConfig>,
        services: PublishServices,
    ) -> Self {
        let payload = document.to_payload();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            services,
            document,
            payload,
            inner: Mutex::new(Inner::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exact bytes uploaded by the content stage.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn state(&self) -> PublishState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<Stage> {
        self.lock().in_flight
    }

    #[must_use]
    pub fn snapshot(&self) -> AttemptSnapshot {
        let inner = self.lock();
        AttemptSnapshot {
            id: self.id.clone(),
            phase: inner.phase,
            in_flight: inner.in_flight,
            state: inner.state.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Idle for at least `ttl` with nothing in flight.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let inner = self.lock();
        inner.in_flight.is_none() && inner.touched.elapsed() >= ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one stage to completion.
    pub async fn run_stage(&self, request: StageRequest) -> StageResult {
        let stage = request.stage();
        let (prepared, prior) = self.begin(request)?;
        let guard = FlightGuard {
            attempt: self,
            stage,
            prior,
            armed: true,
        };

        tracing::info!(attempt_id = %self.id, stage = %stage, "Stage started");

        let result = match prepared {
            Prepared::Content => self.publish_content().await,
            Prepared::ChainAnchor {
                content_ref,
                contract_id,
            } => self.anchor(content_ref, &contract_id).await,
            Prepared::KnowledgeGraph { progress } => self.write_graph(progress).await,
        };

        guard.settle(&result);
        result
    }

    /// Check guards and preconditions, then mark `stage` in flight.
    fn begin(&self, request: StageRequest) -> Result<(Prepared, Phase), PublishError> {
        let stage = request.stage();
        let mut inner = self.lock();

        let checked = match (inner.in_flight, inner.state.is_completed(stage)) {
            (Some(running), _) => Err(PublishError::StageInFlight(running.to_string())),
            (None, true) => Err(PublishError::StageAlreadyCompleted(stage.to_string())),
            (None, false) => self.prepare(&inner.state, request),
        };

        let prepared = match checked {
            Ok(p) => p,
            Err(err) if err.is_guard() => return Err(err),
            Err(err) => {
                tracing::error!(
                    attempt_id = %self.id,
                    stage = %stage,
                    error = %err,
                    "Stage invoked without its precondition"
                );
                inner.state.stage_errors.insert(stage, StageFailure::from(&err));
                return Err(err);
            }
        };

        let prior = inner.phase;
        inner.in_flight = Some(stage);
        inner.phase = stage.running_phase();
        inner.touched = Instant::now();
        Ok((prepared, prior))
    }

    fn prepare(&self, state: &PublishState, request: StageRequest) -> Result<Prepared, PublishError> {
        match request {
            StageRequest::Content => Ok(Prepared::Content),
            StageRequest::ChainAnchor {
                content_ref,
                contract_id,
            } => {
                let content_ref = state
                    .content_ref
                    .clone()
                    .or(content_ref.filter(|r| !r.trim().is_empty()))
                    .ok_or_else(|| {
                        PublishError::PreconditionFailed(
                            "chain anchor requires a content reference".to_string(),
                        )
                    })?;
                let contract_id = contract_id
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| self.document.contract_identifier());
                Ok(Prepared::ChainAnchor {
                    content_ref,
                    contract_id,
                })
            }
            StageRequest::KnowledgeGraph {
                chain_tx_hash,
                edit_cid,
                entity_id,
            } => {
                if state.chain_tx_hash.is_none()
                    && chain_tx_hash.filter(|h| !h.trim().is_empty()).is_none()
                {
                    return Err(PublishError::PreconditionFailed(
                        "knowledge-graph write requires a chain transaction".to_string(),
                    ));
                }
                let progress = match (edit_cid, entity_id) {
                    (None, None) => state.graph_progress.clone(),
                    (Some(cid), Some(entity)) if state.graph_progress.edit_cid.is_none() => {
                        GraphWriteProgress::resumed(entity, cid)
                    }
                    (Some(_), Some(_)) => state.graph_progress.clone(),
                    _ => {
                        return Err(PublishError::PreconditionFailed(
                            "edit CID and entity id must be supplied together".to_string(),
                        ));
                    }
                };
                Ok(Prepared::KnowledgeGraph { progress })
            }
        }
    }

    /// Record the outcome of a finished stage.
    fn finish(&self, stage: Stage, result: &StageResult) {
        let mut inner = self.lock();
        inner.in_flight = None;
        inner.touched = Instant::now();
        match result {
            Ok(outcome) => {
                apply_outcome(&mut inner.state, outcome);
                inner.state.stage_errors.remove(&stage);
                inner.phase = stage.completed_phase();
                tracing::info!(attempt_id = %self.id, stage = %stage, "Stage succeeded");
            }
            Err(err) => {
                inner.state.stage_errors.insert(stage, StageFailure::from(err));
                inner.phase = Phase::Failed(stage);
                tracing::warn!(
                    attempt_id = %self.id,
                    stage = %stage,
                    kind = err.kind(),
                    error = %err,
                    "Stage failed"
                );
            }
        }
    }

    fn cancel(&self, stage: Stage, prior: Phase) {
        let mut inner = self.lock();
        inner.in_flight = None;
        inner.phase = prior;
        inner.touched = Instant::now();
        tracing::warn!(attempt_id = %self.id, stage = %stage, "Stage cancelled");
    }

    fn save_progress(&self, progress: &GraphWriteProgress) {
        self.lock().state.graph_progress = progress.clone();
    }

    // =========================================================================
    // STAGES
    // =========================================================================

    async fn publish_content(&self) -> StageResult {
        let receipt = self.services.content_store.put(&self.payload).await?;
        tracing::info!(
            attempt_id = %self.id,
            blob_id = receipt.blob_id(),
            already_existed = receipt.already_existed(),
            "Content stored"
        );
        Ok(StageOutcome::Content {
            content_ref: receipt.blob_id().to_string(),
            already_existed: receipt.already_existed(),
            receipt,
        })
    }

    async fn anchor(&self, content_ref: String, contract_id: &str) -> StageResult {
        let (chain_id, contract) = self.config.anchor_target()?;
        let wallet = self.services.wallet.as_ref().ok_or_else(|| {
            PublishError::WalletUnavailable("no wallet connected".to_string())
        })?;

        let accounts = wallet.request_accounts().await.map_err(|e| {
            if e.code == Some(USER_REJECTED) {
                PublishError::WalletRejected(e.message)
            } else {
                PublishError::WalletUnavailable(e.message)
            }
        })?;
        let from = accounts.into_iter().next().ok_or_else(|| {
            PublishError::WalletUnavailable("wallet returned no accounts".to_string())
        })?;

        let current = wallet
            .chain_id()
            .await
            .map_err(|e| PublishError::WalletUnavailable(e.message))?;
        if current != chain_id {
            tracing::info!(attempt_id = %self.id, from = current, to = chain_id, "Switching wallet network");
            wallet.switch_chain(chain_id).await.map_err(|e| {
                if e.code == Some(UNRECOGNIZED_CHAIN) {
                    PublishError::unknown_network(format!("chain {chain_id}: {}", e.message))
                } else {
                    PublishError::switch_failed(e.message)
                }
            })?;
            let after = wallet
                .chain_id()
                .await
                .map_err(|e| PublishError::switch_failed(e.message))?;
            if after != chain_id {
                return Err(PublishError::switch_failed(format!(
                    "wallet is on chain {after}, expected {chain_id}"
                )));
            }
        }

        let tx = TransactionRequest {
            from,
            to: contract.to_string(),
            data: publish_metadata_calldata(&content_ref, contract_id),
            gas: to_quantity(u128::from(self.config.gas_limit)),
        };
        let tx_hash = wallet
            .send_transaction(&tx)
            .await
            .map_err(|e| PublishError::WalletRejected(e.message))?;

        tracing::info!(attempt_id = %self.id, tx_hash = %tx_hash, "Content reference anchored");
        Ok(StageOutcome::ChainAnchor {
            tx_hash,
            content_ref,
        })
    }

    async fn write_graph(&self, mut progress: GraphWriteProgress) -> StageResult {
        let key = self.config.signing_key()?;
        let kg = &self.services.knowledge_graph;
        let transactor = &self.services.transactor;

        let edit_cid = match progress.edit_cid.clone() {
            Some(cid) => cid,
            None => {
                let edit = match progress.edit.clone() {
                    Some(edit) => edit,
                    None => {
                        let author = transactor.address(&key)?;
                        let input = ContractEntityInput::from_document(&self.document, &self.config);
                        let built = build_contract_edit(&input, &author);
                        progress.entity_id = Some(built.entity_id);
                        progress.edit = Some(built.edit.clone());
                        self.save_progress(&progress);
                        built.edit
                    }
                };
                let cid = kg.publish_edit(&edit).await?;
                tracing::info!(
                    attempt_id = %self.id,
                    cid = %cid,
                    entity_id = progress.entity_id.as_deref().unwrap_or_default(),
                    "Edit published"
                );
                progress.edit_cid = Some(cid.clone());
                self.save_progress(&progress);
                cid
            }
        };

        let entity_id = progress.entity_id.clone().ok_or_else(|| {
            PublishError::PreconditionFailed("edit CID recorded without an entity id".to_string())
        })?;

        let call = match progress.calldata.clone() {
            Some(call) => call,
            None => {
                let call = kg.edit_calldata(&edit_cid).await?;
                progress.calldata = Some(call.clone());
                self.save_progress(&progress);
                call
            }
        };

        let tx_hash = transactor.send_transaction(&key, &call).await?;
        tracing::info!(attempt_id = %self.id, tx_hash = %tx_hash, entity_id = %entity_id, "Knowledge-graph entity written");
        Ok(StageOutcome::KnowledgeGraph {
            entity_id,
            edit_cid,
            tx_hash,
        })
    }
}

fn apply_outcome(state: &mut PublishState, outcome: &StageOutcome) {
    match outcome {
        StageOutcome::Content {
            content_ref,
            already_existed,
            receipt,
        } => {
            state.content_ref = Some(content_ref.clone());
            state.content_already_existed = Some(*already_existed);
            state.content = Some(receipt.clone());
        }
        StageOutcome::ChainAnchor { tx_hash, .. } => {
            state.chain_tx_hash = Some(tx_hash.clone());
        }
        StageOutcome::KnowledgeGraph {
            entity_id, tx_hash, ..
        } => {
            state.kg_entity_id = Some(entity_id.clone());
            state.kg_tx_hash = Some(tx_hash.clone());
        }
    }
}

/// Clears the in-flight marker when a stage future is dropped before it
/// settles.
struct FlightGuard<'a> {
    attempt: &'a PublishAttempt,
    stage: Stage,
    prior: Phase,
    armed: bool,
}

impl FlightGuard<'_> {
    fn settle(mut self, result: &StageResult) {
        self.armed = false;
        self.attempt.finish(self.stage, result);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.attempt.cancel(self.stage, self.prior);
        }
    }
}
