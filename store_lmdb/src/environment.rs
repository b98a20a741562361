//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, LmdbOwnershipStore};

/// The schema version this code writes.
///
/// Version 1: `ownership` values are JSON `{ownerAddress, requestingUserId,
/// verifiedAt?}`. Readers tolerate missing optional fields, so additive
/// changes do not need a bump.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const MAX_DBS: u32 = 4;
const OWNERSHIP_DB: &str = "ownership";
const META_DB: &str = "meta";
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Wraps the LMDB environment and its database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    ownership_db: Database<Str, Bytes>,
    meta_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an environment in `path`.
    ///
    /// Fails with [`LmdbError::SchemaTooNew`] if the directory was written by
    /// a newer release.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment directory is owned by this process; no
        // other handle to the same path is opened concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let ownership_db: Database<Str, Bytes> =
            env.create_database(&mut wtxn, Some(OWNERSHIP_DB))?;
        let meta_db: Database<Str, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            ownership_db,
            meta_db,
        };
        environment.stamp_schema_version()?;
        tracing::info!(path = %path.display(), map_size, "opened registry database");
        Ok(environment)
    }

    /// Registry handle sharing this environment.
    pub fn ownership_store(&self) -> LmdbOwnershipStore {
        LmdbOwnershipStore {
            env: Arc::clone(&self.env),
            ownership_db: self.ownership_db,
        }
    }

    /// Stored schema version (0 for a fresh database).
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.meta_db.get(&rtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Corruption("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn stamp_schema_version(&self) -> Result<(), LmdbError> {
        let found = self.schema_version()?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found < CURRENT_SCHEMA_VERSION {
            let mut wtxn = self.env.write_txn()?;
            self.meta_db.put(
                &mut wtxn,
                SCHEMA_VERSION_KEY,
                CURRENT_SCHEMA_VERSION.to_le_bytes().as_slice(),
            )?;
            wtxn.commit()?;
            tracing::info!(from = found, to = CURRENT_SCHEMA_VERSION, "stamped schema version");
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn force_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, version.to_le_bytes().as_slice())?;
        wtxn.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, value: &[u8]) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.ownership_db.put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_SIZE: usize = 16 * 1024 * 1024;

    #[test]
    fn fresh_database_is_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        assert_eq!(env.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
            env.force_schema_version(CURRENT_SCHEMA_VERSION + 1).unwrap();
        }
        let result = LmdbEnvironment::open(dir.path(), MAP_SIZE);
        assert!(matches!(result, Err(LmdbError::SchemaTooNew { .. })));
    }
}
