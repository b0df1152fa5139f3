//! # clearsign
//!
//! Binary for clear-signing schema graphs and the three-stage publish
//! pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/clearsign (THE BINARY)                │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │    CLI      │    │  HTTP API   │    │ Publish        │   │
//! │   │   (clap)    │    │   (axum)    │    │ pipeline       │   │
//! │   └──────┬──────┘    └──────┬──────┘    └───────┬────────┘   │
//! │          └──────────────────┼───────────────────┘            │
//! │                             ▼                                │
//! │                    ┌─────────────────┐                       │
//! │                    │ clearsign-core  │                       │
//! │                    │  (THE LOGIC)    │                       │
//! │                    └─────────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! clearsign graph -f erc7730-token.json --summary
//! clearsign publish-content -f erc7730-token.json
//! clearsign anchor -f erc7730-token.json --content-ref <blob-id>
//! clearsign write-graph -f erc7730-token.json --chain-tx <tx-hash>
//! clearsign serve --port 8080
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

/// Install the global subscriber. `CLEARSIGN_LOG_FORMAT=json` switches to
/// machine-parseable output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clearsign=info,tower_http=debug".into());
    let json = std::env::var("CLEARSIGN_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
   ┌─┐┬  ┌─┐┌─┐┬─┐┌─┐┬┌─┐┌┐┌
   │  │  ├┤ ├─┤├┬┘└─┐││ ┬│││
   └─┘┴─┘└─┘┴ ┴┴└─└─┘┴└─┘┘└┘

  clear-signing graphs & publishing v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
