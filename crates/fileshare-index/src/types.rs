//! Core types for the storage index

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A row in the record store: one uploaded file's identity and lifetime.
///
/// Records are immutable once written. They are removed only by the
/// expired-record sweep, never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub expires_at: i64,
    pub name: String,
}

/// The assembled view of a file returned by lookups: record metadata plus
/// the blob location. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,
    pub path: PathBuf,
    pub expires_at: i64,
    pub name: String,
}
