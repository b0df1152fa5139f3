//! Test doubles for the external systems of the publish pipeline.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use clearsign::clients::{
    ContentStore, ContractCall, Edit, KeyTransactor, KnowledgeGraph, StoredContent,
    TransactionRequest, Wallet, WalletError, address_of,
};
use clearsign::pipeline::{PublishAttempt, PublishServices};
use clearsign::{PipelineConfig, PublishError, SigningKey};
use clearsign_core::SchemaDocument;
use serde_json::json;
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

pub const KG_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
pub const ANCHOR_CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const ACCOUNT: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";
pub const ANCHOR_TX: &str = "0x7a3c0f0e5b0d6a1b0c8f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566";
pub const KG_TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";
pub const SPACE_CONTRACT: &str = "0x2222222222222222222222222222222222222222";

// =============================================================================
// DOCUMENTS & CONFIG
// =============================================================================

/// A small token document: two ABI functions, one display format and a
/// deployment on mainnet.
pub fn token_document() -> SchemaDocument {
    SchemaDocument::from_value(json!({
        "context": {
            "$id": "acme-token",
            "contract": {
                "abi": [
                    {
                        "type": "function",
                        "name": "transfer",
                        "stateMutability": "nonpayable",
                        "inputs": [
                            {"name": "to", "type": "address"},
                            {"name": "amount", "type": "uint256"}
                        ],
                        "outputs": [{"name": "", "type": "bool"}]
                    },
                    {
                        "type": "function",
                        "name": "balanceOf",
                        "stateMutability": "view",
                        "inputs": [{"name": "owner", "type": "address"}],
                        "outputs": [{"name": "", "type": "uint256"}]
                    }
                ],
                "deployments": [
                    {"chainId": 1, "address": "0xdAC17F958D2ee523a2206206994597C13D831ec7"}
                ]
            }
        },
        "metadata": {"owner": "Acme", "info": {"legalName": "Acme Corp"}},
        "display": {
            "formats": {
                "transfer(address,uint256)": {
                    "intent": "Send",
                    "fields": [
                        {"path": "to", "label": "To", "format": "addressName"},
                        {"path": "amount", "label": "Amount", "format": "tokenAmount"}
                    ]
                }
            }
        }
    }))
}

/// Every stage requirement present; anchor on chain 1.
pub fn full_config() -> PipelineConfig {
    PipelineConfig {
        chain_id: Some(1),
        contract_address: Some(ANCHOR_CONTRACT.to_string()),
        kg_private_key: Some(KG_KEY.to_string()),
        ..PipelineConfig::default()
    }
}

// =============================================================================
// CONTENT STORE
// =============================================================================

/// In-memory content-addressed store. The second put of the same bytes
/// answers `AlreadyCertified` with the same id.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: Mutex<BTreeMap<String, String>>,
    calls: AtomicUsize,
}

impl MemoryContentStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn blob_id_of(payload: &str) -> String {
        hex::encode(&Keccak256::digest(payload.as_bytes())[..16])
    }

    pub fn stored(&self, blob_id: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(blob_id).cloned()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, payload: &str) -> Result<StoredContent, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let blob_id = Self::blob_id_of(payload);
        let mut blobs = self.blobs.lock().unwrap();
        if blobs.contains_key(&blob_id) {
            return Ok(StoredContent::AlreadyCertified {
                blob_id,
                end_epoch: Some(53),
                tx_digest: Some("Cert1".to_string()),
            });
        }
        blobs.insert(blob_id.clone(), payload.to_string());
        Ok(StoredContent::NewlyCreated {
            blob_id,
            size: Some(payload.len() as u64),
            registered_epoch: Some(12),
            cost: Some(3_000),
        })
    }
}

/// Always fails with the given error.
pub struct FailingContentStore {
    pub error: PublishError,
    pub calls: AtomicUsize,
}

impl FailingContentStore {
    pub fn new(error: PublishError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentStore for FailingContentStore {
    async fn put(&self, _payload: &str) -> Result<StoredContent, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Blocks every put until the gate is opened.
pub struct GatedContentStore {
    pub gate: Semaphore,
    pub entered: Notify,
    pub inner: MemoryContentStore,
}

impl GatedContentStore {
    pub fn closed() -> Self {
        Self {
            gate: Semaphore::new(0),
            entered: Notify::new(),
            inner: MemoryContentStore::default(),
        }
    }

    /// Let every current and future put through.
    pub fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl ContentStore for GatedContentStore {
    async fn put(&self, payload: &str) -> Result<StoredContent, PublishError> {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.put(payload).await
    }
}

// =============================================================================
// WALLET
// =============================================================================

/// Scripted wallet.
pub struct MockWallet {
    pub accounts: Mutex<Result<Vec<String>, WalletError>>,
    pub chain: Mutex<u64>,
    /// `None` switches successfully.
    pub switch_error: Mutex<Option<WalletError>>,
    /// A successful switch leaves the wallet where it was.
    pub switch_is_noop: bool,
    pub send_result: Mutex<Result<String, WalletError>>,
    pub calls: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<TransactionRequest>>,
}

impl MockWallet {
    pub fn on_chain(chain: u64) -> Self {
        Self {
            accounts: Mutex::new(Ok(vec![ACCOUNT.to_string()])),
            chain: Mutex::new(chain),
            switch_error: Mutex::new(None),
            switch_is_noop: false,
            send_result: Mutex::new(Ok(ANCHOR_TX.to_string())),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.record("request_accounts");
        self.accounts.lock().unwrap().clone()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.record("chain_id");
        Ok(*self.chain.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.record("switch_chain");
        if let Some(err) = self.switch_error.lock().unwrap().clone() {
            return Err(err);
        }
        if !self.switch_is_noop {
            *self.chain.lock().unwrap() = chain_id;
        }
        Ok(())
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, WalletError> {
        self.record("send_transaction");
        self.sent.lock().unwrap().push(tx.clone());
        self.send_result.lock().unwrap().clone()
    }
}

// =============================================================================
// KNOWLEDGE GRAPH
// =============================================================================

/// Records uploads and calldata exchanges; failures can be injected.
#[derive(Default)]
pub struct RecordingKnowledgeGraph {
    pub published: Mutex<Vec<Edit>>,
    pub calldata_requests: Mutex<Vec<String>>,
    pub publish_error: Mutex<Option<PublishError>>,
    pub calldata_error: Mutex<Option<PublishError>>,
}

impl RecordingKnowledgeGraph {
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn calldata_count(&self) -> usize {
        self.calldata_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl KnowledgeGraph for RecordingKnowledgeGraph {
    async fn publish_edit(&self, edit: &Edit) -> Result<String, PublishError> {
        if let Some(err) = self.publish_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut published = self.published.lock().unwrap();
        published.push(edit.clone());
        Ok(format!("ipfs://bafyedit{}", published.len()))
    }

    async fn edit_calldata(&self, cid: &str) -> Result<ContractCall, PublishError> {
        self.calldata_requests.lock().unwrap().push(cid.to_string());
        if let Some(err) = self.calldata_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ContractCall {
            to: SPACE_CONTRACT.to_string(),
            data: "0x4554480001".to_string(),
        })
    }
}

/// Records submitted calls instead of signing them.
#[derive(Default)]
pub struct RecordingTransactor {
    pub sent: Mutex<Vec<ContractCall>>,
    pub error: Mutex<Option<PublishError>>,
}

impl RecordingTransactor {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl KeyTransactor for RecordingTransactor {
    fn address(&self, key: &SigningKey) -> Result<String, PublishError> {
        address_of(key)
    }

    async fn send_transaction(
        &self,
        _key: &SigningKey,
        call: &ContractCall,
    ) -> Result<String, PublishError> {
        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(call.clone());
        Ok(KG_TX.to_string())
    }
}

// =============================================================================
// WIRING
// =============================================================================

/// Doubles behind one attempt, kept for assertions.
pub struct Harness {
    pub store: Arc<MemoryContentStore>,
    pub wallet: Arc<MockWallet>,
    pub kg: Arc<RecordingKnowledgeGraph>,
    pub transactor: Arc<RecordingTransactor>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryContentStore::default()),
            wallet: Arc::new(MockWallet::on_chain(1)),
            kg: Arc::new(RecordingKnowledgeGraph::default()),
            transactor: Arc::new(RecordingTransactor::default()),
        }
    }

    pub fn with_wallet(mut self, wallet: MockWallet) -> Self {
        self.wallet = Arc::new(wallet);
        self
    }

    pub fn services(&self) -> PublishServices {
        PublishServices {
            content_store: self.store.clone(),
            wallet: Some(self.wallet.clone()),
            knowledge_graph: self.kg.clone(),
            transactor: self.transactor.clone(),
        }
    }

    pub fn attempt(&self, config: PipelineConfig) -> Arc<PublishAttempt> {
        Arc::new(PublishAttempt::new(
            token_document(),
            Arc::new(config),
            self.services(),
        ))
    }
}
