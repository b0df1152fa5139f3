//! # CLI Command Implementations

use clearsign::api;
use clearsign::pipeline::{
    GraphWriteProgress, PublishAttempt, PublishServices, StageFailure, StageOutcome, StageRequest,
    StageResult,
};
use clearsign::{AppError, PipelineConfig, PublishError};
use clearsign_core::{GraphInspector, SchemaDocument, build_graph};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest schema document accepted (10 MB).
const MAX_DOCUMENT_FILE_SIZE: u64 = 10 * 1024 * 1024;

// =============================================================================
// INPUT
// =============================================================================

/// Canonical path of an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path.canonicalize().map_err(|e| {
        AppError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(AppError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

fn read_document(path: &Path) -> Result<SchemaDocument, AppError> {
    let path = validate_file_path(path)?;
    let metadata = std::fs::metadata(&path)
        .map_err(|e| AppError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_DOCUMENT_FILE_SIZE {
        return Err(AppError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_DOCUMENT_FILE_SIZE
        )));
    }
    let bytes = std::fs::read(&path)
        .map_err(|e| AppError::Io(format!("Cannot read '{}': {}", path.display(), e)))?;
    Ok(SchemaDocument::from_json_slice(&bytes)?)
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_serve(config: PipelineConfig, host: &str, port: u16) -> Result<(), AppError> {
    let services = PublishServices::from_config(&config);

    println!("clearsign Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Publisher: {}", config.publisher_url);
    println!(
        "  Wallet:    {}",
        config.wallet_rpc_url.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Endpoints:");
    println!("  POST   /graph                         - Build a document graph");
    println!("  POST   /attempts                      - Start a publish attempt");
    println!("  GET    /attempts/{{id}}                 - Attempt state");
    println!("  POST   /attempts/{{id}}/stages/{{stage}}  - Run one stage");
    println!("  DELETE /attempts/{{id}}                 - Discard an attempt");
    println!("  GET    /health                        - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, config, services).await
}

// =============================================================================
// GRAPH COMMAND
// =============================================================================

pub fn cmd_graph(file: &Path, summary_only: bool, json_mode: bool) -> Result<(), AppError> {
    let doc = read_document(file)?;
    let graph = build_graph(&doc);
    let inspector = GraphInspector::new(&graph);
    let summary = inspector.summary();

    if json_mode {
        if summary_only {
            print_json(&summary);
        } else {
            print_json(&serde_json::json!({ "graph": graph, "summary": summary }));
        }
        return Ok(());
    }

    println!("Schema Graph");
    println!("============");
    println!("Nodes:       {}", summary.node_count);
    println!("Links:       {}", summary.link_count);
    println!(
        "Operations:  {} ({} read-only)",
        summary.operation_count, summary.read_only_operation_count
    );
    println!("Fields:      {}", summary.field_count);
    println!("Deployments: {}", summary.deployment_count);

    if !summary_only {
        println!();
        for node in &graph.nodes {
            println!(
                "  {:>5}  {:<10} {}",
                node.id.to_string(),
                node.kind.as_str(),
                node.label
            );
        }
    }
    Ok(())
}

// =============================================================================
// STAGE COMMANDS
// =============================================================================

/// Run `request` in a fresh attempt over the document in `file`.
async fn run_single_stage(
    config: PipelineConfig,
    file: &Path,
    request: StageRequest,
    json_mode: bool,
) -> Result<(), AppError> {
    let doc = read_document(file)?;
    let services = PublishServices::from_config(&config);
    let attempt = PublishAttempt::new(doc, Arc::new(config), services);
    let result = attempt.run_stage(request).await;
    report(&attempt, result, json_mode)
}

/// Flags that let `write-graph` pick up an edit uploaded by a failed run.
fn resume_hint(progress: &GraphWriteProgress) -> Option<String> {
    progress
        .uploaded_edit()
        .map(|(cid, entity)| format!("--edit-cid {cid} --entity-id {entity}"))
}

fn report(attempt: &PublishAttempt, result: StageResult, json_mode: bool) -> Result<(), AppError> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            report_failure(attempt, &err, json_mode);
            return Err(err.into());
        }
    };

    if json_mode {
        print_json(&serde_json::json!({
            "attemptId": attempt.id(),
            "outcome": outcome,
            "state": attempt.state(),
        }));
        return Ok(());
    }

    match outcome {
        StageOutcome::Content {
            content_ref,
            already_existed,
            ..
        } => {
            println!("Content stored");
            println!("  Blob id:        {}", content_ref);
            println!("  Already stored: {}", already_existed);
        }
        StageOutcome::ChainAnchor {
            tx_hash,
            content_ref,
        } => {
            println!("Content reference anchored");
            println!("  Blob id:     {}", content_ref);
            println!("  Transaction: {}", tx_hash);
        }
        StageOutcome::KnowledgeGraph {
            entity_id,
            edit_cid,
            tx_hash,
        } => {
            println!("Knowledge-graph entity written");
            println!("  Entity id:   {}", entity_id);
            println!("  Edit CID:    {}", edit_cid);
            println!("  Transaction: {}", tx_hash);
        }
    }
    Ok(())
}

/// Print what the failed run left behind. Stage 3 progress survives only
/// here, since every CLI invocation starts a fresh attempt.
fn report_failure(attempt: &PublishAttempt, err: &PublishError, json_mode: bool) {
    let state = attempt.state();

    if json_mode {
        print_json(&serde_json::json!({
            "attemptId": attempt.id(),
            "error": StageFailure::from(err),
            "state": state,
        }));
        return;
    }

    if state.kg_tx_hash.is_none()
        && let Some(hint) = resume_hint(&state.graph_progress)
    {
        eprintln!("Edit already uploaded; retry the remaining steps with:");
        eprintln!("  clearsign write-graph --chain-tx <hash> {hint}");
    }
}

pub async fn cmd_publish_content(
    config: PipelineConfig,
    file: &Path,
    json_mode: bool,
) -> Result<(), AppError> {
    run_single_stage(config, file, StageRequest::Content, json_mode).await
}

pub async fn cmd_anchor(
    config: PipelineConfig,
    file: &Path,
    content_ref: String,
    contract_id: Option<String>,
    json_mode: bool,
) -> Result<(), AppError> {
    let request = StageRequest::ChainAnchor {
        content_ref: Some(content_ref),
        contract_id,
    };
    run_single_stage(config, file, request, json_mode).await
}

pub async fn cmd_write_graph(
    config: PipelineConfig,
    file: &Path,
    chain_tx: String,
    edit_cid: Option<String>,
    entity_id: Option<String>,
    json_mode: bool,
) -> Result<(), AppError> {
    let request = StageRequest::KnowledgeGraph {
        chain_tx_hash: Some(chain_tx),
        edit_cid,
        entity_id,
    };
    run_single_stage(config, file, request, json_mode).await
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

pub fn cmd_config(config: &PipelineConfig, json_mode: bool) -> Result<(), AppError> {
    let anchor = config.anchor_target().ok();
    let key_status = match config.signing_key() {
        Ok(_) => "valid",
        Err(PublishError::ConfigurationMissing(_)) => "missing",
        Err(_) => "invalid",
    };

    if json_mode {
        print_json(&serde_json::json!({
            "publisherUrl": config.publisher_url,
            "chainId": config.chain_id,
            "contractAddress": config.contract_address,
            "walletRpcUrl": config.wallet_rpc_url,
            "kgSigningKey": key_status,
            "kgSpaceId": config.kg_space_id,
            "kgApiBase": config.kg_api_base,
            "kgRpcUrl": config.kg_rpc_url,
            "kgChainId": config.kg_chain_id,
            "gasLimit": config.gas_limit,
        }));
        return Ok(());
    }

    println!("clearsign Configuration");
    println!("=======================");
    println!("Content store:  {}", config.publisher_url);
    match anchor {
        Some((chain, contract)) => println!("Anchor target:  {} on chain {}", contract, chain),
        None => println!("Anchor target:  (not configured)"),
    }
    println!(
        "Wallet RPC:     {}",
        config.wallet_rpc_url.as_deref().unwrap_or("(none)")
    );
    println!("Signing key:    {}", key_status);
    println!("KG space:       {}", config.kg_space_id);
    println!("KG API:         {}", config.kg_api_base);
    println!("KG chain:       {} ({})", config.kg_chain_id, config.kg_rpc_url);
    println!("Gas limit:      {}", config.gas_limit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_hint_after_edit_upload() {
        let progress = GraphWriteProgress::resumed(
            "HTYoyc5zzJfkQea6EtSs6j".to_string(),
            "ipfs://bafyedit1".to_string(),
        );
        assert_eq!(
            resume_hint(&progress).as_deref(),
            Some("--edit-cid ipfs://bafyedit1 --entity-id HTYoyc5zzJfkQea6EtSs6j")
        );
    }

    #[test]
    fn no_resume_hint_before_upload() {
        let progress = GraphWriteProgress {
            entity_id: Some("HTYoyc5zzJfkQea6EtSs6j".to_string()),
            ..GraphWriteProgress::default()
        };
        assert_eq!(resume_hint(&progress), None);
    }
}
