//! # XMSS / XMSS^MT signature scheme
//!
//! Key generation, verification, and the public byte encodings. Signing
//! lives on [`SigningKey`], which enforces the one-time index discipline.
//!
//! Encodings follow RFC 8391, big-endian throughout:
//! * public key: `OID(4) || root(n) || pub_seed(n)`
//! * signature: `index || r(n) || d * (WOTS+ sig || auth path)`, layers
//!   innermost first, with the index `ceil(h*d / 8)` bytes wide.
//!
//! Verification is stateless and total: any byte string of the right shape
//! either verifies or does not, and all layers are recomputed before the
//! final root comparison.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::hypertree::{HypertreeCache, LayerSig};
use crate::ltree::ltree;
use crate::merkle::{root_from_leaf, CancelToken};
use crate::params::{ParameterSet, Variant};
use crate::state::{SigningKey, StateStore};
use crate::utils::{bytes_to_index, to_byte, u32_to_bytes};
use crate::wots_plus::adrs::{Adrs, AdrsType};
use crate::wots_plus::WotsPlus;

/// An XMSS / XMSS^MT public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    params: ParameterSet,
    root: Vec<u8>,
    pub_seed: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn new(params: ParameterSet, root: Vec<u8>, pub_seed: Vec<u8>) -> Self {
        Self {
            params,
            root,
            pub_seed,
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.params.pk_bytes());
        out.extend_from_slice(&u32_to_bytes(self.params.oid));
        out.extend_from_slice(&self.root);
        out.extend_from_slice(&self.pub_seed);
        out
    }

    /// Decodes a public key, resolving the parameter set through the OID
    /// registry of `variant`.
    pub fn from_bytes(variant: Variant, bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::MalformedKey(4, bytes.len()));
        }
        let oid = bytes_to_index(&bytes[..4]) as u32;
        let params = ParameterSet::from_oid(variant, oid)?;
        Self::from_bytes_with(params, bytes)
    }

    /// Decodes a public key under an explicitly supplied parameter set;
    /// required for custom (OID 0) sets.
    pub fn from_bytes_with(params: ParameterSet, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != params.pk_bytes() {
            return Err(Error::MalformedKey(params.pk_bytes(), bytes.len()));
        }
        let oid = bytes_to_index(&bytes[..4]) as u32;
        if oid != params.oid {
            return Err(Error::InvalidParameterSet(format!(
                "key OID 0x{:08x} does not match parameter set OID 0x{:08x}",
                oid, params.oid
            )));
        }
        let n = params.n;
        Ok(Self {
            params,
            root: bytes[4..4 + n].to_vec(),
            pub_seed: bytes[4 + n..4 + 2 * n].to_vec(),
        })
    }
}

/// A detached signature over one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    params: ParameterSet,
    idx: u64,
    r: Vec<u8>,
    /// Per-layer WOTS+ signature and auth path, layer 0 first.
    layers: Vec<LayerSig>,
}

impl Signature {
    pub(crate) fn new(params: ParameterSet, idx: u64, r: Vec<u8>, layers: Vec<LayerSig>) -> Self {
        Self {
            params,
            idx,
            r,
            layers,
        }
    }

    /// The one-time signature index this signature consumed.
    pub fn idx(&self) -> u64 {
        self.idx
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.params.sig_bytes());
        out.extend_from_slice(&to_byte(self.idx, self.params.index_bytes()));
        out.extend_from_slice(&self.r);
        for layer in &self.layers {
            for block in &layer.wots_sig {
                out.extend_from_slice(block);
            }
            for node in &layer.auth {
                out.extend_from_slice(node);
            }
        }
        out
    }

    /// Decodes a signature. The parameter set is not carried in the
    /// encoding and must match the verifying public key's.
    pub fn from_bytes(params: ParameterSet, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != params.sig_bytes() {
            return Err(Error::MalformedSignature(params.sig_bytes(), bytes.len()));
        }
        let n = params.n;
        let mut offset = 0;
        let idx = bytes_to_index(&bytes[..params.index_bytes()]);
        offset += params.index_bytes();
        let r = bytes[offset..offset + n].to_vec();
        offset += n;

        let mut layers = Vec::with_capacity(params.d as usize);
        for _ in 0..params.d {
            let wots_sig = (0..params.wots_len())
                .map(|i| bytes[offset + i * n..offset + (i + 1) * n].to_vec())
                .collect();
            offset += params.wots_sig_bytes();
            let auth = (0..params.h as usize)
                .map(|i| bytes[offset + i * n..offset + (i + 1) * n].to_vec())
                .collect();
            offset += params.h as usize * n;
            layers.push(LayerSig { wots_sig, auth });
        }

        Ok(Self {
            params,
            idx,
            r,
            layers,
        })
    }
}

/// Entry point binding one parameter set.
#[derive(Clone, Copy, Debug)]
pub struct Xmss {
    params: ParameterSet,
}

impl Xmss {
    pub fn new(params: ParameterSet) -> Self {
        Self { params }
    }

    /// Generates a key pair from system randomness. The signing key's
    /// initial state is persisted to `store` before the pair is returned.
    pub fn keygen(&self, store: Box<dyn StateStore>) -> Result<(SigningKey, PublicKey)> {
        self.keygen_with_cancel(store, None)
    }

    /// Like [`Xmss::keygen`], but checks `cancel` between leaf computations.
    /// A cancelled run returns [`Error::Cancelled`] and persists nothing.
    pub fn keygen_with_cancel(
        &self,
        store: Box<dyn StateStore>,
        cancel: Option<&CancelToken>,
    ) -> Result<(SigningKey, PublicKey)> {
        let mut seed = Zeroizing::new(vec![0u8; 3 * self.params.n]);
        OsRng.try_fill_bytes(&mut seed)?;
        self.keygen_inner(&seed, store, cancel)
    }

    /// Deterministic key generation from a `3n`-byte master seed, split
    /// into `sk_seed || sk_prf || pub_seed`.
    pub fn keygen_from_seed(
        &self,
        seed: &[u8],
        store: Box<dyn StateStore>,
    ) -> Result<(SigningKey, PublicKey)> {
        if seed.len() != 3 * self.params.n {
            return Err(Error::MalformedKey(3 * self.params.n, seed.len()));
        }
        self.keygen_inner(seed, store, None)
    }

    fn keygen_inner(
        &self,
        seed: &[u8],
        store: Box<dyn StateStore>,
        cancel: Option<&CancelToken>,
    ) -> Result<(SigningKey, PublicKey)> {
        let n = self.params.n;
        let sk_seed = Zeroizing::new(seed[..n].to_vec());
        let sk_prf = Zeroizing::new(seed[n..2 * n].to_vec());
        let pub_seed = seed[2 * n..3 * n].to_vec();

        let (cache, root) = HypertreeCache::init(&self.params, &sk_seed, &pub_seed, 0, cancel)?;
        let pk = PublicKey::new(self.params, root.clone(), pub_seed.clone());
        let sk =
            SigningKey::new_generated(self.params, sk_seed, sk_prf, pub_seed, root, cache, store)?;
        Ok((sk, pk))
    }

    /// Verifies `sig` over `message` against `pk`. Never errors: malformed
    /// contents, an out-of-range index, or any mismatch yield `false`.
    pub fn verify(&self, message: &[u8], sig: &Signature, pk: &PublicKey) -> bool {
        let params = &self.params;
        if sig.idx >= params.capacity()
            || sig.layers.len() != params.d as usize
            || sig.r.len() != params.n
            || pk.root.len() != params.n
            || pk.pub_seed.len() != params.n
        {
            return false;
        }

        let hasher = Hasher::new(params);
        let wp = WotsPlus::new(params, &pk.pub_seed);
        let mask = params.leaves_per_tree() - 1;

        let mut digest = hasher.h_msg(&sig.r, &pk.root, sig.idx, message);
        for (layer, part) in sig.layers.iter().enumerate() {
            let layer = layer as u32;
            let tree = sig.idx >> ((layer + 1) * params.h);
            let leaf = (sig.idx >> (layer * params.h)) & mask;

            let mut ots_adrs = Adrs::from(AdrsType::Ots);
            ots_adrs.set_layer_addr(layer);
            ots_adrs.set_tree_addr(tree);
            ots_adrs.set_ots_addr(leaf as u32);
            let wots_pk = wp.pk_from_sig(&part.wots_sig, &digest, &ots_adrs);

            let mut ltree_adrs = Adrs::from(AdrsType::LTree);
            ltree_adrs.set_layer_addr(layer);
            ltree_adrs.set_tree_addr(tree);
            ltree_adrs.set_ltree_addr(leaf as u32);
            let leaf_value = ltree(&hasher, &pk.pub_seed, &mut ltree_adrs, wots_pk);

            digest = root_from_leaf(params, &pk.pub_seed, layer, tree, leaf, leaf_value, &part.auth);
        }
        digest == pk.root
    }
}
