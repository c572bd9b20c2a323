//! # rehydra - environment rehydration
//!
//! The main binary for the rehydra engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          apps/rehydra (THE BINARY)          │
//! │                                             │
//! │  ┌─────────────┐        ┌───────────────┐   │
//! │  │   CLI       │        │ HeaderFlatten │   │
//! │  │  (clap)     │        │   (std::fs)   │   │
//! │  └──────┬──────┘        └───────────────┘   │
//! │         ▼                                   │
//! │  ┌───────────────┐                          │
//! │  │ rehydra-core  │                          │
//! │  │ (THE ENGINE)  │                          │
//! │  └───────────────┘                          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! rehydra rehydrate -f env.json -r blur
//! rehydra --json-mode definitions -f env.json
//! rehydra flatten Func.h Image.h --base src -o merged.h
//! ```

use clap::Parser;
use rehydra::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // REHYDRA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("REHYDRA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "rehydra=debug,rehydra_core=debug"
    } else {
        "rehydra=info,rehydra_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries command output.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
