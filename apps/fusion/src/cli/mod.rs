//! # Fusion CLI Module
//!
//! This module implements the CLI interface for the fusion planner.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show budget usage and store info
//! - `tree` - Show allocated nodes and equipped souls
//! - `stats` - Show aggregated stat totals
//! - `level`, `equip`, `unequip`, `soul-level`, `budget`, `reset` - Edit the tree
//! - `preset` - Save, load, or list presets
//! - `soul` - List, add, or remove souls
//! - `export` / `import` - Backup documents
//! - `init` - Initialize a new store
//! - `hash` - Checksums of the current backup

mod commands;

use clap::{Parser, Subcommand};
use fusion_core::FusionError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "fusion=info,fusion_core=info,tower_http=debug";

/// Log filter used with `--verbose` when `RUST_LOG` is unset.
pub const VERBOSE_LOG_FILTER: &str = "fusion=debug,fusion_core=debug,tower_http=debug";

/// Fusion - skill tree planner
///
/// Allocates points across the fusion tree, equips souls, and totals the
/// resulting stats.
#[derive(Parser, Debug)]
#[command(name = "fusion")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the planner store
    #[arg(short = 'D', long, global = true, default_value = "fusion.db")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database), "file" (single blob file) or "memory"
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Optional TOML config file (preset_slots, default_budget)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default tracing filter for this invocation.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show budget usage and store info
    Status,

    /// Show allocated nodes and equipped souls
    Tree,

    /// Show aggregated stat totals
    Stats {
        /// Only show the contribution of this node
        #[arg(short, long)]
        node: Option<u32>,
    },

    /// Set a node's level (0 removes it)
    Level {
        /// Node ID
        node: u32,

        /// Target level
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Equip a soul on a node
    Equip {
        /// Node ID
        node: u32,

        /// Soul ID
        soul: String,
    },

    /// Remove the soul from a node
    Unequip {
        /// Node ID
        node: u32,
    },

    /// Set the level (1-3) of the soul on a node
    SoulLevel {
        /// Node ID
        node: u32,

        /// Soul level
        level: u8,
    },

    /// Set the point budget (fusion level)
    Budget {
        /// New budget; negative values clamp to 0
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Clear every allocation and equipped soul
    Reset,

    /// Manage preset slots
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Manage the soul roster
    Soul {
        #[command(subcommand)]
        action: SoulAction,
    },

    /// Export a backup document (JSON)
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a backup document (JSON)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty store
    Init {
        /// Force initialization even if the store exists
        #[arg(short, long)]
        force: bool,
    },

    /// Compute checksum and BLAKE3 hash of the current backup
    Hash,
}

/// Preset subcommands.
#[derive(Subcommand, Debug)]
pub enum PresetAction {
    /// Save the current tree into a slot
    Save {
        /// Slot index (0-based)
        slot: usize,

        /// Slot label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Replace the current tree with a slot's snapshot
    Load {
        /// Slot index (0-based)
        slot: usize,
    },

    /// List all slots
    List,
}

/// Soul subcommands.
#[derive(Subcommand, Debug)]
pub enum SoulAction {
    /// List all souls
    List {
        /// Only souls that can be equipped on this node
        #[arg(short, long)]
        node: Option<u32>,
    },

    /// Add or replace a soul from a JSON file
    Add {
        /// Path to the soul JSON
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove a soul and unequip it everywhere
    Remove {
        /// Soul ID
        id: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), FusionError> {
    let config = load_config(cli.config.as_deref())?;
    let ctx = CommandContext {
        db_path: cli.database,
        backend: cli.backend,
        config,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, &host, port).await,
        Some(Commands::Status) => cmd_status(&ctx),
        Some(Commands::Tree) => cmd_tree(&ctx),
        Some(Commands::Stats { node }) => cmd_stats(&ctx, node),
        Some(Commands::Level { node, level }) => cmd_level(&ctx, node, level),
        Some(Commands::Equip { node, soul }) => cmd_equip(&ctx, node, &soul),
        Some(Commands::Unequip { node }) => cmd_unequip(&ctx, node),
        Some(Commands::SoulLevel { node, level }) => cmd_soul_level(&ctx, node, level),
        Some(Commands::Budget { value }) => cmd_budget(&ctx, value),
        Some(Commands::Reset) => cmd_reset(&ctx),
        Some(Commands::Preset { action }) => match action {
            PresetAction::Save { slot, label } => cmd_preset_save(&ctx, slot, label),
            PresetAction::Load { slot } => cmd_preset_load(&ctx, slot),
            PresetAction::List => cmd_preset_list(&ctx),
        },
        Some(Commands::Soul { action }) => match action {
            SoulAction::List { node } => cmd_soul_list(&ctx, node),
            SoulAction::Add { file } => cmd_soul_add(&ctx, &file),
            SoulAction::Remove { id } => cmd_soul_remove(&ctx, &id),
        },
        Some(Commands::Export { output }) => cmd_export(&ctx, &output),
        Some(Commands::Import { input }) => cmd_import(&ctx, &input),
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Hash) => cmd_hash(&ctx),
        None => {
            // No subcommand - show status by default
            cmd_status(&ctx)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
