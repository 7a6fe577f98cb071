//! # Fusion - Skill Tree Planner
//!
//! The main binary for the fusion tree planner.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) for external renderers
//! - CLI interface for tree, soul, preset and backup operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             apps/fusion (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌─────────────┐      │
//! │   │    CLI      │        │  HTTP API   │      │
//! │   │   (clap)    │        │   (axum)    │      │
//! │   └──────┬──────┘        └──────┬──────┘      │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  fusion-core  │                │
//! │              │  (THE LOGIC)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! fusion server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! fusion status
//! fusion level 1 3
//! fusion equip 1 s1
//! fusion export -o backup.json
//! ```

use clap::Parser;
use fusion::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // FUSION_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("FUSION_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    // RUST_LOG wins over --verbose.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_filter().into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗██╗   ██╗███████╗██╗ ██████╗ ███╗   ██╗
  ██╔════╝██║   ██║██╔════╝██║██╔═══██╗████╗  ██║
  █████╗  ██║   ██║███████╗██║██║   ██║██╔██╗ ██║
  ██╔══╝  ██║   ██║╚════██║██║██║   ██║██║╚██╗██║
  ██║     ╚██████╔╝███████║██║╚██████╔╝██║ ╚████║
  ╚═╝      ╚═════╝ ╚══════╝╚═╝ ╚═════╝ ╚═╝  ╚═══╝

  Fusion Tree Planner v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
