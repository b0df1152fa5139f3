//! # clearsign CLI
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `graph` - Build and print the graph of a document
//! - `publish-content` - Stage 1: upload the document to the content store
//! - `anchor` - Stage 2: anchor a content reference on-chain
//! - `write-graph` - Stage 3: write the contract entity to the knowledge graph
//! - `config` - Show the effective configuration
//!
//! Each stage command runs exactly one stage in a fresh attempt; results of
//! earlier stages are passed in as arguments.

mod commands;

use clap::{Parser, Subcommand};
use clearsign::AppError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// clearsign - clear-signing schema graphs and publishing
#[derive(Parser, Debug)]
#[command(name = "clearsign")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Build the graph of a schema document
    Graph {
        /// Schema document (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Print only the per-kind counts
        #[arg(short, long)]
        summary: bool,
    },

    /// Upload a document to the content store
    PublishContent {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Anchor a content reference on-chain through the wallet
    Anchor {
        #[arg(short, long)]
        file: PathBuf,

        /// Blob id returned by `publish-content`
        #[arg(long)]
        content_ref: String,

        /// Contract identifier (defaults to the document's)
        #[arg(long)]
        contract_id: Option<String>,
    },

    /// Write the contract entity to the knowledge graph
    WriteGraph {
        #[arg(short, long)]
        file: PathBuf,

        /// Anchor transaction hash returned by `anchor`
        #[arg(long)]
        chain_tx: String,

        /// CID of an edit uploaded by an earlier, interrupted run
        #[arg(long, requires = "entity_id")]
        edit_cid: Option<String>,

        /// Entity id belonging to `--edit-cid`
        #[arg(long, requires = "edit_cid")]
        entity_id: Option<String>,
    },

    /// Show the effective configuration (secrets redacted)
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = clearsign::PipelineConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(config, &host, port).await,
        Some(Commands::Graph { file, summary }) => cmd_graph(&file, summary, json_mode),
        Some(Commands::PublishContent { file }) => {
            cmd_publish_content(config, &file, json_mode).await
        }
        Some(Commands::Anchor {
            file,
            content_ref,
            contract_id,
        }) => cmd_anchor(config, &file, content_ref, contract_id, json_mode).await,
        Some(Commands::WriteGraph {
            file,
            chain_tx,
            edit_cid,
            entity_id,
        }) => cmd_write_graph(config, &file, chain_tx, edit_cid, entity_id, json_mode).await,
        Some(Commands::Config) | None => cmd_config(&config, json_mode),
    }
}
