//! Multi-tree (XMSS^MT) layer controller.
//!
//! The hypertree stacks `d` layers of height-`h` trees. Layer 0 trees sign
//! message digests; each tree at layer `j > 0` signs the roots of the
//! `2^h` trees below it. For signing index `idx`, layer `j` uses leaf
//! `(idx >> (j*h)) & (2^h - 1)` of tree `idx >> ((j+1)*h)`.
//!
//! Upper-layer signatures only change every `2^(j*h)` signing indices, so
//! they are computed once and cached until their slot moves. The bottom
//! layer advances through [`AuthCache`] one leaf per signature and is
//! rebuilt on each rollover into the next layer-0 tree.

use crate::error::Result;
use crate::merkle::cache::AuthCache;
use crate::merkle::{CancelToken, TreeContext};
use crate::params::ParameterSet;
use crate::wots_plus::WotsPlus;

/// One layer's contribution to a signature: the WOTS+ signature and the
/// authentication path within that layer's tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LayerSig {
    pub wots_sig: Vec<Vec<u8>>,
    pub auth: Vec<Vec<u8>>,
}

/// Cached state of one layer above the bottom: the WOTS+ signature over the
/// child tree's root, the auth path of the signing leaf, and this tree's
/// own root (the digest the layer above signs).
#[derive(Clone, Debug)]
struct UpperLayer {
    sig: Vec<Vec<u8>>,
    auth: Vec<Vec<u8>>,
    root: Vec<u8>,
}

fn build_upper(
    params: &ParameterSet,
    sk_seed: &[u8],
    pub_seed: &[u8],
    layer: u32,
    tree: u64,
    leaf: u64,
    child_root: &[u8],
    cancel: Option<&CancelToken>,
) -> Result<UpperLayer> {
    let ctx = TreeContext::new(params, sk_seed, pub_seed, layer, tree);
    let (root, auth) = ctx.root_and_auth(leaf, cancel)?;
    let wp = WotsPlus::new(params, pub_seed);
    let sig = wp.sign(child_root, sk_seed, &ctx.ots_adrs(leaf));
    Ok(UpperLayer { sig, auth, root })
}

/// Signing-side cache across all layers, positioned at the next unused
/// signing index.
#[derive(Clone, Debug)]
pub(crate) struct HypertreeCache {
    next_idx: u64,
    bottom: AuthCache,
    /// Layers 1..d, bottom-up.
    uppers: Vec<UpperLayer>,
    rollovers: u64,
}

impl HypertreeCache {
    /// Builds the cache positioned at `start_idx` and returns it together
    /// with the root of the top-layer tree (the public-key root).
    pub fn init(
        params: &ParameterSet,
        sk_seed: &[u8],
        pub_seed: &[u8],
        start_idx: u64,
        cancel: Option<&CancelToken>,
    ) -> Result<(Self, Vec<u8>)> {
        let h = params.h;
        let mask = params.leaves_per_tree() - 1;

        let ctx0 = TreeContext::new(params, sk_seed, pub_seed, 0, start_idx >> h);
        let (bottom, mut child_root) = AuthCache::init(&ctx0, start_idx & mask, cancel)?;

        let mut uppers = Vec::with_capacity(params.d as usize - 1);
        for layer in 1..params.d {
            let tree = start_idx >> ((layer + 1) * h);
            let leaf = (start_idx >> (layer * h)) & mask;
            let upper = build_upper(
                params, sk_seed, pub_seed, layer, tree, leaf, &child_root, cancel,
            )?;
            child_root = upper.root.clone();
            uppers.push(upper);
        }

        Ok((
            Self {
                next_idx: start_idx,
                bottom,
                uppers,
                rollovers: 0,
            },
            child_root,
        ))
    }

    pub fn next_idx(&self) -> u64 {
        self.next_idx
    }

    /// Number of layer-0 tree rollovers since this cache was built.
    pub fn rollovers(&self) -> u64 {
        self.rollovers
    }

    /// Assembles all layers' signature parts for the current index, layer 0
    /// first. Only the bottom layer signs `msg_digest`; upper layers carry
    /// their cached root signatures.
    pub fn layer_sigs(
        &self,
        params: &ParameterSet,
        sk_seed: &[u8],
        pub_seed: &[u8],
        msg_digest: &[u8],
    ) -> Vec<LayerSig> {
        let idx = self.next_idx;
        let ctx0 = TreeContext::new(params, sk_seed, pub_seed, 0, idx >> params.h);
        let leaf0 = idx & (params.leaves_per_tree() - 1);
        let wp = WotsPlus::new(params, pub_seed);

        let mut out = Vec::with_capacity(params.d as usize);
        out.push(LayerSig {
            wots_sig: wp.sign(msg_digest, sk_seed, &ctx0.ots_adrs(leaf0)),
            auth: self.bottom.auth_path(),
        });
        for upper in &self.uppers {
            out.push(LayerSig {
                wots_sig: upper.sig.clone(),
                auth: upper.auth.clone(),
            });
        }
        out
    }

    /// Moves the cache to the next signing index. Within a layer-0 tree
    /// this is one incremental cache step; on a tree boundary the bottom
    /// cache is rebuilt and the upper layers whose slot moved are
    /// recomputed, from the bottom up.
    pub fn advance(&mut self, params: &ParameterSet, sk_seed: &[u8], pub_seed: &[u8]) -> Result<()> {
        let cur = self.next_idx;
        let next = cur + 1;
        self.next_idx = next;
        if next >= params.capacity() {
            return Ok(());
        }

        let h = params.h;
        let mask = params.leaves_per_tree() - 1;

        if next >> h == cur >> h {
            let ctx = TreeContext::new(params, sk_seed, pub_seed, 0, cur >> h);
            self.bottom.advance(&ctx);
            return Ok(());
        }

        self.rollovers += 1;
        let ctx = TreeContext::new(params, sk_seed, pub_seed, 0, next >> h);
        let (bottom, mut child_root) = AuthCache::init(&ctx, next & mask, None)?;
        self.bottom = bottom;

        for layer in 1..params.d {
            let shift = layer * h;
            if next >> shift == cur >> shift {
                break;
            }
            let tree = next >> (shift + h);
            let leaf = (next >> shift) & mask;
            let upper = build_upper(
                params, sk_seed, pub_seed, layer, tree, leaf, &child_root, None,
            )?;
            child_root = upper.root.clone();
            self.uppers[(layer - 1) as usize] = upper;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HashFunction;

    fn toy_mt_params() -> ParameterSet {
        ParameterSet::custom(HashFunction::Sha256, 16, 16, 2, 3, 1).unwrap()
    }

    /// Stateless recomputation of what layer_sigs must produce at `idx`.
    fn expected_sigs(
        params: &ParameterSet,
        sk_seed: &[u8],
        pub_seed: &[u8],
        idx: u64,
        msg_digest: &[u8],
    ) -> Vec<LayerSig> {
        let mask = params.leaves_per_tree() - 1;
        let wp = WotsPlus::new(params, pub_seed);
        let mut out = Vec::new();
        let mut digest = msg_digest.to_vec();
        for layer in 0..params.d {
            let tree = idx >> ((layer + 1) * params.h);
            let leaf = (idx >> (layer * params.h)) & mask;
            let ctx = TreeContext::new(params, sk_seed, pub_seed, layer, tree);
            out.push(LayerSig {
                wots_sig: wp.sign(&digest, sk_seed, &ctx.ots_adrs(leaf)),
                auth: ctx.auth_path(leaf),
            });
            digest = ctx.node(params.h, 0);
        }
        out
    }

    #[test]
    fn test_matches_stateless_recomputation_over_full_capacity() {
        let params = toy_mt_params();
        let sk_seed = [1u8; 16];
        let pub_seed = [2u8; 16];
        let digest = [9u8; 16];

        let (mut cache, _) = HypertreeCache::init(&params, &sk_seed, &pub_seed, 0, None).unwrap();
        for idx in 0..params.capacity() {
            assert_eq!(cache.next_idx(), idx);
            let got = cache.layer_sigs(&params, &sk_seed, &pub_seed, &digest);
            let want = expected_sigs(&params, &sk_seed, &pub_seed, idx, &digest);
            assert_eq!(got, want, "idx {}", idx);
            cache.advance(&params, &sk_seed, &pub_seed).unwrap();
        }
    }

    #[test]
    fn test_init_mid_capacity_matches_advancing() {
        let params = toy_mt_params();
        let sk_seed = [3u8; 16];
        let pub_seed = [4u8; 16];
        let digest = [8u8; 16];

        let start = 23;
        let (fresh, _) = HypertreeCache::init(&params, &sk_seed, &pub_seed, start, None).unwrap();
        let (mut walked, _) = HypertreeCache::init(&params, &sk_seed, &pub_seed, 0, None).unwrap();
        for _ in 0..start {
            walked.advance(&params, &sk_seed, &pub_seed).unwrap();
        }
        assert_eq!(
            fresh.layer_sigs(&params, &sk_seed, &pub_seed, &digest),
            walked.layer_sigs(&params, &sk_seed, &pub_seed, &digest)
        );
    }

    #[test]
    fn test_rollover_counter() {
        let params = ParameterSet::custom(HashFunction::Sha256, 16, 16, 2, 2, 0).unwrap();
        let sk_seed = [5u8; 16];
        let pub_seed = [6u8; 16];

        let (mut cache, _) = HypertreeCache::init(&params, &sk_seed, &pub_seed, 0, None).unwrap();
        // Advancing past index 3 crosses into the second layer-0 tree.
        for _ in 0..5 {
            cache.advance(&params, &sk_seed, &pub_seed).unwrap();
        }
        assert_eq!(cache.rollovers(), 1);
    }

    #[test]
    fn test_top_root_is_index_independent() {
        let params = toy_mt_params();
        let sk_seed = [7u8; 16];
        let pub_seed = [8u8; 16];
        let (_, root_a) = HypertreeCache::init(&params, &sk_seed, &pub_seed, 0, None).unwrap();
        let (_, root_b) = HypertreeCache::init(&params, &sk_seed, &pub_seed, 41, None).unwrap();
        assert_eq!(root_a, root_b);
    }

    #[test]
    fn test_cancelled_init_aborts() {
        let params = toy_mt_params();
        let sk_seed = [1u8; 16];
        let pub_seed = [2u8; 16];
        let token = CancelToken::new();
        token.cancel();
        assert!(HypertreeCache::init(&params, &sk_seed, &pub_seed, 0, Some(&token)).is_err());
    }
}
