//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Every command opens the planner from the configured store, applies one
//! operation, and lets the planner write the change back.

use crate::api;
use fusion_core::{
    Catalog, FusionError, NodeId, Planner, PlannerConfig, Soul, SoulId, SoulLevel, StatTotal,
    StorageBackend, backup_checksum, compute_blake3_hash, export_document,
    primitives::MAX_IMPORT_DOCUMENT_SIZE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a soul definition file (1 MB).
const MAX_SOUL_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of a config file (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FusionError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FusionError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FusionError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path (resolving symlinks and "..") and requires a
/// regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, FusionError> {
    let canonical = path.canonicalize().map_err(|e| {
        FusionError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FusionError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, FusionError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        FusionError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(FusionError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| FusionError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a validated input file with a size cap.
fn read_input(path: &Path, max_size: u64) -> Result<Vec<u8>, FusionError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read(&validated).map_err(|e| FusionError::IoError(format!("Read file: {}", e)))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// CONTEXT & CONFIG
// =============================================================================

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub db_path: PathBuf,
    pub backend: String,
    pub config: PlannerConfig,
    pub json_mode: bool,
}

/// Load planner tunables from a TOML file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig, FusionError> {
    let Some(path) = path else {
        return Ok(PlannerConfig::default());
    };

    let data = read_input(path, MAX_CONFIG_FILE_SIZE)?;
    let text = String::from_utf8(data)
        .map_err(|e| FusionError::SerializationError(format!("Config is not UTF-8: {}", e)))?;
    let config: PlannerConfig = toml::from_str(&text)
        .map_err(|e| FusionError::SerializationError(format!("Invalid config: {}", e)))?;

    tracing::debug!(?config, "loaded config from {}", path.display());
    Ok(config)
}

/// Open the planner for the selected backend.
///
/// - `redb`: ACID database at `db_path`
/// - `file`: single blob file at `db_path`
/// - `memory`: nothing is written
pub fn load_or_create_planner(
    db_path: &Path,
    backend: &str,
    config: PlannerConfig,
) -> Result<Planner, FusionError> {
    match backend {
        "redb" => Planner::with_redb(db_path, config),
        "file" => Planner::with_file(db_path, config),
        "memory" => Ok(Planner::open(
            Arc::new(Catalog::fusion_tree()),
            StorageBackend::default(),
            config,
        )),
        other => Err(FusionError::IoError(format!(
            "Unknown backend: {}. Use: redb, file, memory",
            other
        ))),
    }
}

fn open_planner(ctx: &CommandContext) -> Result<Planner, FusionError> {
    load_or_create_planner(&ctx.db_path, &ctx.backend, ctx.config.clone())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(ctx: &CommandContext, host: &str, port: u16) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;

    println!("Fusion Planner Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", ctx.backend);
    println!("  Database: {:?}", ctx.db_path);
    println!("  Presets:  {}", planner.presets().slot_count());
    println!();
    println!("Endpoints:");
    println!("  GET  /state    - Tree state and budget");
    println!("  GET  /stats    - Aggregated stat totals");
    println!("  GET  /catalog  - Node catalog");
    println!("  POST /level    - Set a node level");
    println!("  POST /equip    - Equip a soul");
    println!("  GET  /export   - Backup document");
    println!("  POST /import   - Restore a backup");
    println!("  GET  /health   - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, planner).await
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Show budget usage and store info.
pub fn cmd_status(ctx: &CommandContext) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let summary = planner.summary();
    let state = planner.state();

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "database": ctx.db_path.to_string_lossy(),
            "backend": planner.backend().name(),
            "budget": summary.budget,
            "used": summary.used,
            "remaining": summary.remaining,
            "active_nodes": state.node_levels.len(),
            "equipped_souls": state.equipped_soul_of.len(),
            "souls": planner.souls().len(),
            "preset_slots": planner.presets().slot_count()
        }));
        return Ok(());
    }

    println!("Fusion Planner Status");
    println!("=====================");
    println!("Database: {:?}", ctx.db_path);
    println!("Backend:  {}", planner.backend().name());
    println!();
    println!("Budget:         {}", summary.budget);
    println!("Used:           {}", summary.used);
    println!("Remaining:      {}", summary.remaining);
    println!("Active Nodes:   {}", state.node_levels.len());
    println!("Equipped Souls: {}", state.equipped_soul_of.len());
    println!("Souls:          {}", planner.souls().len());
    println!("Preset Slots:   {}", planner.presets().slot_count());

    Ok(())
}

/// Show allocated nodes and equipped souls.
pub fn cmd_tree(ctx: &CommandContext) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let state = planner.state();

    if ctx.json_mode {
        print_json(&serde_json::to_value(state).unwrap_or_default());
        return Ok(());
    }

    if state.node_levels.is_empty() {
        println!("No points allocated");
        return Ok(());
    }

    println!("{:>4}  {:<10} {:<8} {:>5}  Soul", "Node", "Rarity", "Tag", "Level");
    for (node, level) in &state.node_levels {
        let Some(def) = planner.catalog().get(*node) else {
            continue;
        };
        let soul = match (state.soul_on(*node), state.soul_level(*node)) {
            (Some(id), Some(soul_level)) => {
                let name = planner.souls().get(id).map_or(id.as_str(), |s| s.name.as_str());
                format!("{} (lvl {})", name, soul_level.value())
            }
            _ => "-".to_string(),
        };
        println!(
            "{:>4}  {:<10} {:<8} {:>5}  {}",
            node,
            def.rarity.name(),
            def.tag.name(),
            level,
            soul
        );
    }

    Ok(())
}

fn print_totals(totals: &[StatTotal]) {
    if totals.is_empty() {
        println!("No stats");
        return;
    }
    for total in totals {
        let suffix = if total.is_percent { "%" } else { "" };
        println!("  {:<24} {}{}", total.name, total.value, suffix);
    }
}

/// Show aggregated stat totals, or one node's contribution.
pub fn cmd_stats(ctx: &CommandContext, node: Option<u32>) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let totals = match node {
        Some(id) => planner.node_stats(NodeId(id))?,
        None => planner.totals(),
    };

    if ctx.json_mode {
        print_json(&serde_json::to_value(&totals).unwrap_or_default());
        return Ok(());
    }

    match node {
        Some(id) => println!("Node {} contribution:", id),
        None => println!("Stat totals:"),
    }
    print_totals(&totals);

    Ok(())
}

// =============================================================================
// TREE MUTATION COMMANDS
// =============================================================================

/// Print the budget line after a mutation.
fn report_change(planner: &Planner, json_mode: bool, message: &str) {
    let summary = planner.summary();
    if json_mode {
        print_json(&serde_json::json!({
            "success": true,
            "message": message,
            "budget": summary.budget,
            "used": summary.used,
            "remaining": summary.remaining
        }));
    } else {
        println!("{}", message);
        println!(
            "Points: {} used / {} budget ({} remaining)",
            summary.used, summary.budget, summary.remaining
        );
    }
}

/// Set a node's level.
pub fn cmd_level(ctx: &CommandContext, node: u32, level: i64) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    planner.set_level(NodeId(node), level)?;
    report_change(
        &planner,
        ctx.json_mode,
        &format!("Node {} set to level {}", node, level),
    );
    Ok(())
}

/// Equip a soul on a node.
pub fn cmd_equip(ctx: &CommandContext, node: u32, soul: &str) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    planner.equip(NodeId(node), SoulId::from(soul))?;
    report_change(
        &planner,
        ctx.json_mode,
        &format!("Soul {} equipped on node {}", soul, node),
    );
    Ok(())
}

/// Remove the soul from a node.
pub fn cmd_unequip(ctx: &CommandContext, node: u32) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    planner.unequip(NodeId(node));
    report_change(&planner, ctx.json_mode, &format!("Node {} unequipped", node));
    Ok(())
}

/// Set the level of the soul on a node.
pub fn cmd_soul_level(ctx: &CommandContext, node: u32, level: u8) -> Result<(), FusionError> {
    let soul_level = SoulLevel::try_from(level).map_err(|_| FusionError::InvalidLevel {
        node: Some(NodeId(node)),
        level: i64::from(level),
    })?;

    let mut planner = open_planner(ctx)?;
    if planner.state().soul_on(NodeId(node)).is_none() {
        tracing::warn!(node, "no soul equipped; soul level unchanged");
    }
    planner.set_soul_level(NodeId(node), soul_level);
    report_change(
        &planner,
        ctx.json_mode,
        &format!("Soul on node {} set to level {}", node, level),
    );
    Ok(())
}

/// Replace the point budget.
pub fn cmd_budget(ctx: &CommandContext, value: i64) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    let budget = planner.set_budget(value);
    report_change(
        &planner,
        ctx.json_mode,
        &format!("Budget set to {}", budget.value()),
    );
    Ok(())
}

/// Clear the tree.
pub fn cmd_reset(ctx: &CommandContext) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    planner.reset();
    report_change(&planner, ctx.json_mode, "Tree reset");
    Ok(())
}

// =============================================================================
// PRESET COMMANDS
// =============================================================================

/// Save the current tree into a slot.
pub fn cmd_preset_save(
    ctx: &CommandContext,
    slot: usize,
    label: Option<String>,
) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    let preset = planner.save_preset(slot, label)?;

    if ctx.json_mode {
        print_json(&serde_json::to_value(preset).unwrap_or_default());
    } else {
        println!("Saved '{}' to slot {}", preset.label, preset.slot);
    }
    Ok(())
}

/// Replace the tree with a slot's snapshot.
pub fn cmd_preset_load(ctx: &CommandContext, slot: usize) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    planner.load_preset(slot)?;
    report_change(
        &planner,
        ctx.json_mode,
        &format!("Loaded preset slot {}", slot),
    );
    Ok(())
}

/// List all preset slots.
pub fn cmd_preset_list(ctx: &CommandContext) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let slots = planner.presets().slots();

    if ctx.json_mode {
        print_json(&serde_json::to_value(slots).unwrap_or_default());
        return Ok(());
    }

    for (index, slot) in slots.iter().enumerate() {
        match slot {
            Some(preset) => println!(
                "  [{}] {} ({} nodes)",
                index,
                preset.label,
                preset.state.node_levels.len()
            ),
            None => println!("  [{}] <empty>", index),
        }
    }
    Ok(())
}

// =============================================================================
// SOUL COMMANDS
// =============================================================================

/// List souls, optionally only those equippable on a node.
pub fn cmd_soul_list(ctx: &CommandContext, node: Option<u32>) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let souls: Vec<&Soul> = match node {
        Some(id) => planner.candidates_for(NodeId(id))?,
        None => planner.souls().iter().collect(),
    };

    if ctx.json_mode {
        print_json(&serde_json::to_value(&souls).unwrap_or_default());
        return Ok(());
    }

    if souls.is_empty() {
        println!("No souls");
        return Ok(());
    }

    for soul in souls {
        let tags: Vec<&str> = soul.tags.iter().map(|t| t.name()).collect();
        println!(
            "  {:<38} {:<24} {:<10} [{}]",
            soul.id,
            soul.name,
            soul.rarity.name(),
            tags.join(", ")
        );
    }
    Ok(())
}

/// Add or replace a soul from a JSON file.
pub fn cmd_soul_add(ctx: &CommandContext, file: &Path) -> Result<(), FusionError> {
    let data = read_input(file, MAX_SOUL_FILE_SIZE)?;
    let soul: Soul = serde_json::from_slice(&data)
        .map_err(|e| FusionError::InvalidSoul(format!("Parse soul: {}", e)))?;

    let mut planner = open_planner(ctx)?;
    let id = planner.save_soul(soul)?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "success": true, "id": id.as_str() }));
    } else {
        println!("Saved soul {}", id);
    }
    Ok(())
}

/// Remove a soul and unequip it everywhere.
pub fn cmd_soul_remove(ctx: &CommandContext, id: &str) -> Result<(), FusionError> {
    let mut planner = open_planner(ctx)?;
    let removed = planner.delete_soul(&SoulId::from(id))?;

    if ctx.json_mode {
        print_json(&serde_json::json!({ "success": true, "id": removed.id.as_str() }));
    } else {
        println!("Removed soul {} ({})", removed.id, removed.name);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

/// Write the backup document to a file.
pub fn cmd_export(ctx: &CommandContext, output: &Path) -> Result<(), FusionError> {
    let validated_output = validate_output_path(output)?;

    let planner = open_planner(ctx)?;
    let document = planner.export_document();
    let data = export_document(&document)?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| FusionError::IoError(format!("Write file: {}", e)))?;

    println!("Checksum: {}", backup_checksum(&document));
    println!("Exported {} bytes to {:?}", data.len(), validated_output);

    Ok(())
}

/// Restore the planner from a backup document.
pub fn cmd_import(ctx: &CommandContext, input: &Path) -> Result<(), FusionError> {
    let data = read_input(input, MAX_IMPORT_DOCUMENT_SIZE as u64)?;

    let mut planner = open_planner(ctx)?;
    planner.import_bytes(&data)?;

    let summary = planner.summary();
    println!(
        "Imported backup: {} nodes, {} souls, budget {} ({} used)",
        planner.state().node_levels.len(),
        planner.souls().len(),
        summary.budget,
        summary.used
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new store with defaults.
pub fn cmd_init(ctx: &CommandContext, force: bool) -> Result<(), FusionError> {
    if ctx.db_path.exists() {
        if !force {
            return Err(FusionError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(&ctx.db_path)
            .map_err(|e| FusionError::IoError(format!("Remove existing database: {}", e)))?;
    }

    let mut planner = open_planner(ctx)?;
    planner.persist_all();

    println!(
        "Initialized new {} store at {:?}",
        planner.backend().name(),
        ctx.db_path
    );

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Checksum and BLAKE3 hash of the current backup document.
pub fn cmd_hash(ctx: &CommandContext) -> Result<(), FusionError> {
    let planner = open_planner(ctx)?;
    let document = planner.export_document();
    let bytes = export_document(&document)?;
    let checksum = backup_checksum(&document);
    let blake3 = compute_blake3_hash(&bytes);

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "checksum": checksum,
            "blake3": blake3
        }));
    } else {
        println!("Checksum: {}", checksum);
        println!("BLAKE3:   {}", blake3);
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
