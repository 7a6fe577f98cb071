//! # Formats Module
//!
//! Byte-level encodings used by the storage backends.

pub mod persistence;

pub use persistence::{PersistenceHeader, store_from_bytes, store_to_bytes};
