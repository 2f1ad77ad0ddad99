//! Medium access layer for byte-addressable storage.
//!
//! Provides bounded region caching, deferred insert/remove/replace edits,
//! and flush planning that materializes edits with bounded block I/O.

pub mod accessor;
pub mod cache;
pub mod change;
pub mod chunk;
pub mod config;
pub mod error;
pub mod offset;
pub mod region;
pub mod store;

pub use accessor::{Accessor, FileAccessor, MemoryAccessor};
pub use cache::MediumCache;
pub use change::{Action, ActionKind, ChangeManager, FlushPlan};
pub use config::MediumConfig;
pub use error::MediumError;
pub use offset::{MediumId, Offset};
pub use region::{Overlap, Region};
pub use store::MediumStore;
