//! # Fusion Planner Application
//!
//! CLI and HTTP API on top of `fusion-core`. The binary in `main.rs` only
//! sets up logging and dispatches to [`cli::execute`].

pub mod api;
pub mod cli;
