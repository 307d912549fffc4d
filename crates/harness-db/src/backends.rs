//! Datastore backends
//!
//! - [`MemoryBackend`]: in-process document store, always available
//! - `MongoBackend`: official MongoDB driver (feature `mongodb`)

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use memory::MemoryBackend;
#[cfg(feature = "mongodb")]
pub use self::mongodb::MongoBackend;
