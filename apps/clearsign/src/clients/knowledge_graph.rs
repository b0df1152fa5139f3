//! # Knowledge Graph
//!
//! Describes a published contract as a typed entity in a GRC-20 style
//! knowledge graph.
//!
//! An edit is a batch of operations:
//!
//! ```text
//! 4 × CREATE_PROPERTY   contract address, chain id, contract name, document (all TEXT)
//! 1 × type              UPDATE_ENTITY (name) + CREATE_RELATION (types → schema type)
//!                       + CREATE_RELATION (properties → each property)
//! 1 × entity            UPDATE_ENTITY (name + 4 values) + CREATE_RELATION (types → type)
//! ```
//!
//! The edit is uploaded to obtain a CID, the CID is exchanged for calldata
//! scoped to the configured space, and the calldata is submitted with the
//! signing key (see [`super::signer`]).

use super::http::{read_json, send};
use super::signer::ContractCall;
use crate::config::PipelineConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use clearsign_core::{SchemaDocument, collect_deployments};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// =============================================================================
// SYSTEM IDS
// =============================================================================

/// Property holding an entity's name.
pub const NAME_PROPERTY: &str = "LuBWqZAu6pz54eiJS5mLv8";

/// Relation type linking an entity to its types.
pub const TYPES_PROPERTY: &str = "Jfmby78N4BCseZinBmdVov";

/// Relation type linking a type to its properties.
pub const PROPERTIES_PROPERTY: &str = "9zBADaYzyfzyFJn4GU1cC";

/// The type of types.
pub const SCHEMA_TYPE: &str = "VdTsW1mGiy1XSooJaBBLc4";

/// Name given to the contract type.
pub const CONTRACT_TYPE_NAME: &str = "Smart Contract";

/// Names of the four text properties, in emission order.
pub const PROPERTY_NAMES: [&str; 4] = [
    "Contract Address",
    "Chain ID",
    "Contract Name",
    "ERC-7730 Document",
];

/// Value types of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Text,
}

/// One `(property, value)` pair of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub property: String,
    pub value: String,
}

/// A single knowledge-graph operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KgOp {
    #[serde(rename_all = "camelCase")]
    CreateProperty { id: String, data_type: DataType },
    #[serde(rename_all = "camelCase")]
    UpdateEntity {
        id: String,
        values: Vec<PropertyValue>,
    },
    #[serde(rename_all = "camelCase")]
    CreateRelation {
        id: String,
        from_entity: String,
        to_entity: String,
        relation_type: String,
    },
}

/// A batch of operations published together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub id: String,
    pub name: String,
    /// Address of the signing account.
    pub author: String,
    pub ops: Vec<KgOp>,
}

/// The four values describing a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntityInput {
    pub contract_address: String,
    pub chain_id: u64,
    pub contract_name: String,
    pub document_json: String,
}

impl ContractEntityInput {
    /// Values read from `doc`.
    ///
    /// Address: first deployment, else the contract identifier. Chain: first
    /// deployment with a known chain, else the configured anchor chain,
    /// else mainnet (1).
    #[must_use]
    pub fn from_document(doc: &SchemaDocument, config: &PipelineConfig) -> Self {
        let deployments = collect_deployments(doc);
        let contract_address = deployments
            .first()
            .map(|d| d.address.clone())
            .unwrap_or_else(|| doc.contract_identifier());
        let chain_id = deployments
            .iter()
            .find_map(|d| d.chain_id)
            .or(config.chain_id)
            .unwrap_or(1);
        Self {
            contract_address,
            chain_id,
            contract_name: doc.contract_label(),
            document_json: doc.to_payload(),
        }
    }

    fn values(&self) -> [String; 4] {
        [
            self.contract_address.clone(),
            self.chain_id.to_string(),
            self.contract_name.clone(),
            self.document_json.clone(),
        ]
    }
}

/// A built edit and the id of the contract entity inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEdit {
    pub edit: Edit,
    pub entity_id: String,
}

/// Fresh entity id: base58 of a random UUID.
#[must_use]
pub fn generate_id() -> String {
    bs58::encode(uuid::Uuid::new_v4().as_bytes()).into_string()
}

/// Build the edit describing `input` with random ids.
#[must_use]
pub fn build_contract_edit(input: &ContractEntityInput, author: &str) -> ContractEdit {
    build_contract_edit_with(input, author, generate_id)
}

/// Build the edit drawing every id from `next_id`.
pub fn build_contract_edit_with<F>(
    input: &ContractEntityInput,
    author: &str,
    mut next_id: F,
) -> ContractEdit
where
    F: FnMut() -> String,
{
    let mut ops = Vec::new();

    let property_ids: Vec<String> = PROPERTY_NAMES.iter().map(|_| next_id()).collect();
    for (id, name) in property_ids.iter().zip(PROPERTY_NAMES) {
        ops.push(KgOp::CreateProperty {
            id: id.clone(),
            data_type: DataType::Text,
        });
        ops.push(KgOp::UpdateEntity {
            id: id.clone(),
            values: vec![named(name)],
        });
    }

    let type_id = next_id();
    ops.push(KgOp::UpdateEntity {
        id: type_id.clone(),
        values: vec![named(CONTRACT_TYPE_NAME)],
    });
    ops.push(KgOp::CreateRelation {
        id: next_id(),
        from_entity: type_id.clone(),
        to_entity: SCHEMA_TYPE.to_string(),
        relation_type: TYPES_PROPERTY.to_string(),
    });
    for property in &property_ids {
        ops.push(KgOp::CreateRelation {
            id: next_id(),
            from_entity: type_id.clone(),
            to_entity: property.clone(),
            relation_type: PROPERTIES_PROPERTY.to_string(),
        });
    }

    let entity_id = next_id();
    let mut values = vec![named(&input.contract_name)];
    values.extend(
        property_ids
            .iter()
            .zip(input.values())
            .map(|(property, value)| PropertyValue {
                property: property.clone(),
                value,
            }),
    );
    ops.push(KgOp::UpdateEntity {
        id: entity_id.clone(),
        values,
    });
    ops.push(KgOp::CreateRelation {
        id: next_id(),
        from_entity: entity_id.clone(),
        to_entity: type_id,
        relation_type: TYPES_PROPERTY.to_string(),
    });

    ContractEdit {
        edit: Edit {
            id: next_id(),
            name: format!("Publish {}", input.contract_name),
            author: author.to_string(),
            ops,
        },
        entity_id,
    }
}

fn named(name: &str) -> PropertyValue {
    PropertyValue {
        property: NAME_PROPERTY.to_string(),
        value: name.to_string(),
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Upload `edit`; returns its CID.
    async fn publish_edit(&self, edit: &Edit) -> Result<String, PublishError>;

    /// Exchange a CID for the call that records it in the space.
    async fn edit_calldata(&self, cid: &str) -> Result<ContractCall, PublishError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// Knowledge-graph API client bound to one space.
#[derive(Debug, Clone)]
pub struct GeoApiClient {
    http: reqwest::Client,
    api_base: String,
    space_id: String,
}

impl GeoApiClient {
    #[must_use]
    pub fn new(api_base: &str, space_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            space_id: space_id.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.kg_api_base, &config.kg_space_id)
    }
}

fn required_text(body: &Value, key: &str) -> Result<String, PublishError> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PublishError::MalformedResponse(format!("response has no '{key}'")))
}

#[async_trait]
impl KnowledgeGraph for GeoApiClient {
    async fn publish_edit(&self, edit: &Edit) -> Result<String, PublishError> {
        let url = format!("{}/ipfs/upload-edit", self.api_base);
        let resp = send(self.http.post(&url).json(edit), &url).await?;
        let body = read_json(resp).await?;
        required_text(&body, "cid")
    }

    async fn edit_calldata(&self, cid: &str) -> Result<ContractCall, PublishError> {
        let url = format!("{}/space/{}/edit/calldata", self.api_base, self.space_id);
        let resp = send(self.http.post(&url).json(&json!({ "cid": cid })), &url).await?;
        let body = read_json(resp).await?;
        Ok(ContractCall {
            to: required_text(&body, "to")?,
            data: required_text(&body, "data")?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
