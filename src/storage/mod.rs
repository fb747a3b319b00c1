//! Persistent signature storage.
//!
//! This module provides:
//! - Directory signatures for pruning unchanged subtrees
//! - File signatures for change detection
//! - The JSON store that carries both between runs

mod models;
mod store;

pub use models::{
    to_timestamp, DirectoryMap, DirectorySignature, FileMap, FileRecord, FileSignature,
    SharedSignatures, SignatureMaps, Timestamp,
};
pub use store::SignatureStore;
