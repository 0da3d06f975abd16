//! Storage index for the file share service
//!
//! Records uploaded files in a SQLite table, places their bytes in a
//! directory-backed blob store keyed by the same identifier, and reconciles
//! the two with a periodic two-phase garbage collection (expired records
//! first, then orphaned blobs).
//!
//! The two stores are deliberately not updated atomically with each other:
//! uploads write the record before the blob, and a blob-write failure leaves
//! a record behind until it expires and is swept. Reconciliation is eventual
//! and idempotent rather than transactional across the store boundary.

mod blobs;
mod clock;
mod error;
mod index;
mod records;
mod types;

pub use blobs::BlobStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{IndexError, Result};
pub use index::StorageIndex;
pub use records::RecordStore;
pub use types::{FileDescriptor, FileRecord};
