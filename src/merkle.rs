//! Stateless Merkle tree-hash and authentication-path engine.
//!
//! A [`TreeContext`] binds one layer tree (layer index, tree instance, seed
//! material) and can compute any leaf, any internal node, a full subtree
//! root via an explicit-stack scan, and authentication paths. The recursive
//! [`TreeContext::node`] is the correctness oracle the incremental cache in
//! [`cache`] is tested against.
//!
//! Addressing convention (RFC 8391): the parent at height `z` and index `i`
//! is keyed with tree height `z - 1` and tree index `i`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::ltree::ltree;
use crate::params::ParameterSet;
use crate::wots_plus::adrs::{Adrs, AdrsType};
use crate::wots_plus::WotsPlus;

pub(crate) mod cache;

/// Cooperative cancellation handle for long-running tree construction.
/// Checked between leaf computations; cancellation never leaves partial
/// key-pair state behind.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One layer tree of the (hyper)tree, bound to its seed material.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeContext<'a> {
    pub params: &'a ParameterSet,
    pub hasher: Hasher,
    pub sk_seed: &'a [u8],
    pub pub_seed: &'a [u8],
    pub layer: u32,
    pub tree: u64,
}

impl<'a> TreeContext<'a> {
    pub fn new(
        params: &'a ParameterSet,
        sk_seed: &'a [u8],
        pub_seed: &'a [u8],
        layer: u32,
        tree: u64,
    ) -> Self {
        Self {
            params,
            hasher: Hasher::new(params),
            sk_seed,
            pub_seed,
            layer,
            tree,
        }
    }

    fn base_adrs(&self, adrs_type: AdrsType) -> Adrs {
        let mut adrs = Adrs::from(adrs_type);
        adrs.set_layer_addr(self.layer);
        adrs.set_tree_addr(self.tree);
        adrs
    }

    pub fn ots_adrs(&self, leaf: u64) -> Adrs {
        let mut adrs = self.base_adrs(AdrsType::Ots);
        adrs.set_ots_addr(leaf as u32);
        adrs
    }

    /// Leaf `i`: the L-tree compression of the WOTS+ public key at OTS
    /// index `i`, under paired OTS and L-tree addresses.
    pub fn leaf(&self, index: u64) -> Vec<u8> {
        let wp = WotsPlus::new(self.params, self.pub_seed);
        let wots_pk = wp.pk_gen(self.sk_seed, &self.ots_adrs(index));

        let mut ltree_adrs = self.base_adrs(AdrsType::LTree);
        ltree_adrs.set_ltree_addr(index as u32);
        ltree(&self.hasher, self.pub_seed, &mut ltree_adrs, wots_pk)
    }

    fn merge(&self, height: u32, index: u64, left: &[u8], right: &[u8]) -> Vec<u8> {
        debug_assert!(height >= 1);
        let mut adrs = self.base_adrs(AdrsType::HashTree);
        adrs.set_tree_height(height - 1);
        adrs.set_tree_index(index as u32);
        self.hasher.rand_hash(self.pub_seed, &mut adrs, left, right)
    }

    /// Value of the node at `height` and `index` (absolute within the
    /// level). Recursive over immutable data; used as the correctness
    /// oracle and for on-demand sibling computation.
    pub fn node(&self, height: u32, index: u64) -> Vec<u8> {
        if height == 0 {
            return self.leaf(index);
        }
        let left = self.node(height - 1, 2 * index);
        let right = self.node(height - 1, 2 * index + 1);
        self.merge(height, index, &left, &right)
    }

    /// Authentication path for `leaf`: sibling node per level, leaf-to-root.
    pub fn auth_path(&self, leaf: u64) -> Vec<Vec<u8>> {
        (0..self.params.h)
            .map(|j| self.node(j, (leaf >> j) ^ 1))
            .collect()
    }

    /// Root of the subtree of `2^height` leaves starting at `start` (a
    /// multiple of `2^height`), via an explicit stack of (node, height)
    /// pairs. The observer is invoked once for every node produced, leaves
    /// included, with (height, absolute index, value); cancellation is
    /// checked between leaf computations.
    pub fn scan_root<F>(
        &self,
        height: u32,
        start: u64,
        cancel: Option<&CancelToken>,
        observer: &mut F,
    ) -> Result<Vec<u8>>
    where
        F: FnMut(u32, u64, &[u8]),
    {
        debug_assert_eq!(start % (1u64 << height), 0);

        let mut stack: Vec<(Vec<u8>, u32)> = Vec::with_capacity(height as usize + 1);
        for i in start..start + (1u64 << height) {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            }

            let mut node = self.leaf(i);
            let mut node_height = 0u32;
            let mut index = i;
            observer(0, i, &node);

            while let Some(&(_, top_height)) = stack.last() {
                if top_height != node_height {
                    break;
                }
                let (left, _) = stack.pop().unwrap();
                index >>= 1;
                node_height += 1;
                node = self.merge(node_height, index, &left, &node);
                observer(node_height, index, &node);
            }
            stack.push((node, node_height));
        }

        debug_assert_eq!(stack.len(), 1);
        Ok(stack.pop().unwrap().0)
    }

    /// Root of the full layer tree plus the authentication path for `leaf`,
    /// produced in a single scan.
    pub fn root_and_auth(
        &self,
        leaf: u64,
        cancel: Option<&CancelToken>,
    ) -> Result<(Vec<u8>, Vec<Vec<u8>>)> {
        let h = self.params.h;
        let mut auth: Vec<Vec<u8>> = vec![Vec::new(); h as usize];
        let root = self.scan_root(h, 0, cancel, &mut |height, index, node| {
            if height < h && index == ((leaf >> height) ^ 1) {
                auth[height as usize] = node.to_vec();
            }
        })?;
        Ok((root, auth))
    }
}

/// Recombines a leaf with its authentication path, using the leaf index's
/// bits to decide left/right order at each level. Verification-side; needs
/// no secret material.
pub(crate) fn root_from_leaf(
    params: &ParameterSet,
    pub_seed: &[u8],
    layer: u32,
    tree: u64,
    leaf_index: u64,
    leaf: Vec<u8>,
    auth: &[Vec<u8>],
) -> Vec<u8> {
    let hasher = Hasher::new(params);
    let mut adrs = Adrs::from(AdrsType::HashTree);
    adrs.set_layer_addr(layer);
    adrs.set_tree_addr(tree);

    let mut node = leaf;
    for (level, sibling) in auth.iter().enumerate() {
        adrs.set_tree_height(level as u32);
        adrs.set_tree_index((leaf_index >> (level + 1)) as u32);
        node = if (leaf_index >> level) & 1 == 0 {
            hasher.rand_hash(pub_seed, &mut adrs, &node, sibling)
        } else {
            hasher.rand_hash(pub_seed, &mut adrs, sibling, &node)
        };
    }
    node
}
