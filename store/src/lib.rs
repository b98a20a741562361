//! Abstract storage traits for the ownership registry.
//!
//! Every backend (LMDB for production, in-memory for tests) implements
//! [`OwnershipStore`]. The rest of the codebase depends only on the trait.

pub mod error;
pub mod ownership;

pub use error::StoreError;
pub use ownership::{OwnershipRecord, OwnershipStore, RegistrySnapshot};
