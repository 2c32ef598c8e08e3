//! Secret-key state management.
//!
//! An XMSS key pair is stateful: every one-time signature index must be
//! used at most once, across process restarts and crashes. [`SigningKey`]
//! owns the secret seeds and the signing-side caches behind a mutex, and
//! pairs them with a [`StateStore`] that durably records the next unused
//! index. The updated state is persisted before a signature is released;
//! if persisting fails, the signature is withheld and the key refuses all
//! further signing, since reuse of the index can no longer be ruled out.
//!
//! The persisted snapshot is the byte layout
//! `OID(4) || index || sk_seed(n) || sk_prf(n) || pub_seed(n) || root(n)`
//! with all integers big-endian and the index `ceil(h*d / 8)` bytes wide.

use std::sync::Mutex;

use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::hypertree::HypertreeCache;
use crate::params::{ParameterSet, Variant};
use crate::scheme::{PublicKey, Signature};
use crate::utils::{bytes_to_index, to_byte, u32_to_bytes};

#[cfg(feature = "in-disk")]
pub mod in_disk;
pub mod in_memory;

/// Durable storage for the signing state snapshot.
///
/// `persist` must not return `Ok` before the bytes are durable; a store
/// that buffers writes must flush. The store holds at most one snapshot
/// and `persist` replaces it.
pub trait StateStore: Send + Sync {
    /// Returns the last persisted snapshot, if any.
    fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Durably replaces the snapshot.
    fn persist(&self, state: &[u8]) -> Result<()>;
}

struct KeyInner {
    sk_seed: Zeroizing<Vec<u8>>,
    sk_prf: Zeroizing<Vec<u8>>,
    pub_seed: Vec<u8>,
    root: Vec<u8>,
    cache: HypertreeCache,
    /// Set when a state persist has failed; the key then refuses to sign.
    unusable: bool,
}

/// A stateful XMSS / XMSS^MT signing key bound to its state store.
///
/// Signing is serialized internally; the key can be shared across threads
/// and each successful signature consumes a distinct index.
pub struct SigningKey {
    params: ParameterSet,
    inner: Mutex<KeyInner>,
    store: Box<dyn StateStore>,
}

pub(crate) fn encode_state(
    params: &ParameterSet,
    idx: u64,
    sk_seed: &[u8],
    sk_prf: &[u8],
    pub_seed: &[u8],
    root: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(params.sk_bytes());
    out.extend_from_slice(&u32_to_bytes(params.oid));
    out.extend_from_slice(&to_byte(idx, params.index_bytes()));
    out.extend_from_slice(sk_seed);
    out.extend_from_slice(sk_prf);
    out.extend_from_slice(pub_seed);
    out.extend_from_slice(root);
    out
}

#[derive(Debug, PartialEq, Eq)]
struct DecodedState {
    idx: u64,
    sk_seed: Zeroizing<Vec<u8>>,
    sk_prf: Zeroizing<Vec<u8>>,
    pub_seed: Vec<u8>,
    root: Vec<u8>,
}

fn decode_state(params: &ParameterSet, bytes: &[u8]) -> Result<DecodedState> {
    if bytes.len() != params.sk_bytes() {
        return Err(Error::MalformedKey(params.sk_bytes(), bytes.len()));
    }
    let oid = bytes_to_index(&bytes[..4]) as u32;
    if oid != params.oid {
        return Err(Error::InvalidParameterSet(format!(
            "key OID 0x{:08x} does not match parameter set OID 0x{:08x}",
            oid, params.oid
        )));
    }
    let n = params.n;
    let mut offset = 4;
    let idx = bytes_to_index(&bytes[offset..offset + params.index_bytes()]);
    offset += params.index_bytes();
    let mut take = |len: usize| {
        let part = bytes[offset..offset + len].to_vec();
        offset += len;
        part
    };
    Ok(DecodedState {
        idx,
        sk_seed: Zeroizing::new(take(n)),
        sk_prf: Zeroizing::new(take(n)),
        pub_seed: take(n),
        root: take(n),
    })
}

impl SigningKey {
    /// Assembles a freshly generated key and persists its initial state.
    /// The key is only returned once the index-0 snapshot is durable.
    pub(crate) fn new_generated(
        params: ParameterSet,
        sk_seed: Zeroizing<Vec<u8>>,
        sk_prf: Zeroizing<Vec<u8>>,
        pub_seed: Vec<u8>,
        root: Vec<u8>,
        cache: HypertreeCache,
        store: Box<dyn StateStore>,
    ) -> Result<Self> {
        let state = encode_state(&params, 0, &sk_seed, &sk_prf, &pub_seed, &root);
        store.persist(&state)?;
        Ok(Self {
            params,
            inner: Mutex::new(KeyInner {
                sk_seed,
                sk_prf,
                pub_seed,
                root,
                cache,
                unusable: false,
            }),
            store,
        })
    }

    /// Restores a key from the snapshot held by `store`, resolving the
    /// parameter set through the OID registry of `variant`.
    pub fn restore(variant: Variant, store: Box<dyn StateStore>) -> Result<Self> {
        let bytes = Self::load_snapshot(&*store)?;
        if bytes.len() < 4 {
            return Err(Error::MalformedKey(4, bytes.len()));
        }
        let oid = bytes_to_index(&bytes[..4]) as u32;
        let params = ParameterSet::from_oid(variant, oid)?;
        Self::from_state_bytes(params, &bytes, store)
    }

    /// Restores a key under an explicitly supplied parameter set; required
    /// for custom (OID 0) sets.
    pub fn restore_with(params: ParameterSet, store: Box<dyn StateStore>) -> Result<Self> {
        let bytes = Self::load_snapshot(&*store)?;
        Self::from_state_bytes(params, &bytes, store)
    }

    fn load_snapshot(store: &dyn StateStore) -> Result<Vec<u8>> {
        store.load()?.ok_or_else(|| {
            Error::StoreInternalError("state store holds no signing state".into())
        })
    }

    fn from_state_bytes(
        params: ParameterSet,
        bytes: &[u8],
        store: Box<dyn StateStore>,
    ) -> Result<Self> {
        let state = decode_state(&params, bytes)?;

        // Rebuild the caches at the persisted index. An index at or past
        // capacity restores as an exhausted but otherwise valid key.
        let start = state.idx.min(params.capacity() - 1);
        let (mut cache, root) =
            HypertreeCache::init(&params, &state.sk_seed, &state.pub_seed, start, None)?;
        if state.idx >= params.capacity() {
            cache.advance(&params, &state.sk_seed, &state.pub_seed)?;
        }
        debug_assert_eq!(root, state.root);

        Ok(Self {
            params,
            inner: Mutex::new(KeyInner {
                sk_seed: state.sk_seed,
                sk_prf: state.sk_prf,
                pub_seed: state.pub_seed,
                root,
                cache,
                unusable: false,
            }),
            store,
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// The next unused one-time signature index.
    pub fn next_idx(&self) -> u64 {
        self.inner.lock().unwrap().cache.next_idx()
    }

    /// Number of signatures the key can still issue.
    pub fn remaining(&self) -> u64 {
        self.params.capacity() - self.next_idx().min(self.params.capacity())
    }

    /// Number of layer-0 tree rollovers performed since the key was
    /// generated or restored.
    pub fn rollovers(&self) -> u64 {
        self.inner.lock().unwrap().cache.rollovers()
    }

    pub fn public_key(&self) -> PublicKey {
        let inner = self.inner.lock().unwrap();
        PublicKey::new(self.params, inner.root.clone(), inner.pub_seed.clone())
    }

    /// Exports the current state snapshot, including secret seeds. Importing
    /// the snapshot into two live keys breaks the one-time property; the
    /// caller is responsible for retiring the exporting key.
    pub fn to_bytes(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        encode_state(
            &self.params,
            inner.cache.next_idx(),
            &inner.sk_seed,
            &inner.sk_prf,
            &inner.pub_seed,
            &inner.root,
        )
    }

    /// Signs `message`, consuming one signature index.
    ///
    /// The post-increment state is persisted before the signature is
    /// returned. A persist failure withholds the signature and permanently
    /// disables the key; an exhausted key fails without mutating anything.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if inner.unusable {
            return Err(Error::StatePersistenceFailure(
                "signing key disabled after a failed state update".into(),
            ));
        }
        let idx = inner.cache.next_idx();
        if idx >= self.params.capacity() {
            return Err(Error::KeyExhausted);
        }

        let hasher = Hasher::new(&self.params);
        let r = hasher.prf(&inner.sk_prf, &to_byte(idx, 32));
        let digest = hasher.h_msg(&r, &inner.root, idx, message);
        let layers = inner.cache.layer_sigs(
            &self.params,
            inner.sk_seed.as_slice(),
            &inner.pub_seed,
            &digest,
        );

        let state = encode_state(
            &self.params,
            idx + 1,
            &inner.sk_seed,
            &inner.sk_prf,
            &inner.pub_seed,
            &inner.root,
        );
        if let Err(e) = self.store.persist(&state) {
            inner.unusable = true;
            return Err(e);
        }

        let KeyInner {
            cache,
            sk_seed,
            pub_seed,
            ..
        } = inner;
        cache.advance(&self.params, sk_seed.as_slice(), pub_seed)?;

        Ok(Signature::new(self.params, idx, r, layers))
    }
}
