//! Core functionality module
//!
//! Contains change collection, batching, the content store and the flusher

pub mod batch;
pub mod engine;
pub mod error;
pub mod events;
pub mod flusher;
pub mod store;

// Re-export main types
pub use batch::Batch;
pub use engine::{BatchEngine, FlushOutcome};
pub use error::ReadError;
pub use events::{ChangeKind, DedupKey, PendingChange};
pub use flusher::Flusher;
pub use store::ContentStore;
