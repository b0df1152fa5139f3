//! # External System Clients
//!
//! One trait per external system, each with a `reqwest` implementation:
//!
//! | trait | system | implementation |
//! | --- | --- | --- |
//! | [`ContentStore`] | content-addressed blob store | [`WalrusPublisher`] |
//! | [`Wallet`] | interactive signing wallet | [`JsonRpcWallet`] |
//! | [`KnowledgeGraph`] | edit publishing + calldata exchange | [`GeoApiClient`] |
//! | [`KeyTransactor`] | server-held key submission | [`LocalKeyTransactor`] |

mod http;

pub mod content_store;
pub mod knowledge_graph;
pub mod rpc;
pub mod signer;
pub mod wallet;

pub use content_store::{ContentStore, StoredContent, WalrusPublisher, parse_store_response};
pub use knowledge_graph::{
    ContractEdit, ContractEntityInput, Edit, GeoApiClient, KgOp, KnowledgeGraph,
    build_contract_edit,
};
pub use rpc::{JsonRpcClient, RpcError};
pub use signer::{ContractCall, KeyTransactor, LocalKeyTransactor, address_of};
pub use wallet::{JsonRpcWallet, TransactionRequest, Wallet, WalletError};
