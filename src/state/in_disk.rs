//! Durable state store backed by sled. Enabled with the `in-disk` feature.

use std::path::Path;

use crate::error::{Error, Result};
use crate::state::StateStore;

const STATE_KEY: &[u8] = b"signing_state";

/// Persists the snapshot in a sled database, flushed on every update so
/// that a crash after `persist` returns cannot resurrect an older index.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path).map_err(|e| Error::StoreInternalError(e.to_string()))?;
        Ok(Self { db })
    }
}

impl StateStore for SledStateStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        let value = self
            .db
            .get(STATE_KEY)
            .map_err(|e| Error::StoreInternalError(e.to_string()))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn persist(&self, state: &[u8]) -> Result<()> {
        self.db
            .insert(STATE_KEY, state)
            .map_err(|e| Error::StatePersistenceFailure(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| Error::StatePersistenceFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HashFunction, ParameterSet};
    use crate::scheme::Xmss;
    use crate::state::SigningKey;

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.persist(&[1, 2, 3]).unwrap();
        store.persist(&[4, 5]).unwrap();
        drop(store);

        let store = SledStateStore::open(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), Some(vec![4, 5]));
    }

    #[test]
    fn test_signing_state_survives_reopen() {
        let params = ParameterSet::custom(HashFunction::Sha256, 16, 16, 2, 1, 0).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let store = SledStateStore::open(dir.path()).unwrap();
        let (sk, pk) = Xmss::new(params)
            .keygen_from_seed(&[9u8; 48], Box::new(store))
            .unwrap();
        sk.sign(b"one").unwrap();
        sk.sign(b"two").unwrap();
        drop(sk);

        let store = SledStateStore::open(dir.path()).unwrap();
        let sk = SigningKey::restore_with(params, Box::new(store)).unwrap();
        assert_eq!(sk.next_idx(), 2);
        let sig = sk.sign(b"three").unwrap();
        assert!(Xmss::new(params).verify(b"three", &sig, &pk));
    }
}
