//! LMDB storage backend for mintgate.
//!
//! Implements [`mintgate_store::OwnershipStore`] using the `heed` LMDB
//! bindings. One environment holds the `ownership` database (token id ->
//! JSON record) and a small `meta` database for the schema version.

pub mod environment;
pub mod error;
pub mod ownership;

pub use environment::{LmdbEnvironment, CURRENT_SCHEMA_VERSION};
pub use error::LmdbError;
pub use ownership::LmdbOwnershipStore;
