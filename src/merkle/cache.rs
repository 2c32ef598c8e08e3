//! Incremental authentication-path cache, layered over the stateless
//! engine in [`super`].
//!
//! For the tree currently being signed from, the cache holds:
//! * the authentication path of the next leaf to sign,
//! * for every level below `h - k`, a treehash builder computing the next
//!   sibling needed at that level, advanced by one leaf per signature,
//! * for the top `k` levels, all node values, retained from the
//!   initialization scan.
//!
//! A builder for level `j` is (re)scheduled whenever the auth node at level
//! `j` changes, which happens every `2^j` signatures, and a builder of
//! height `j` needs exactly `2^j` single-leaf updates. Running one update
//! per active builder per signature therefore completes every builder
//! exactly when its node is due, at a cost of at most `h - k` leaf
//! computations per signature.
//!
//! The cache must agree with the stateless engine on every output; the
//! tests below drive both side by side.

use super::{CancelToken, TreeContext};
use crate::error::Result;

/// One in-progress subtree-root computation: standard treehash over the
/// builder's leaf range, consuming one leaf per `update`.
#[derive(Clone, Debug)]
struct TreehashBuilder {
    height: u32,
    start_leaf: u64,
    next_offset: u64,
    stack: Vec<(Vec<u8>, u32)>,
    done: Option<Vec<u8>>,
}

impl TreehashBuilder {
    fn new(height: u32, start_leaf: u64) -> Self {
        Self {
            height,
            start_leaf,
            next_offset: 0,
            stack: Vec::with_capacity(height as usize + 1),
            done: None,
        }
    }

    /// Consumes one leaf and folds the stack. No-op once complete.
    fn update(&mut self, ctx: &TreeContext<'_>) {
        if self.done.is_some() {
            return;
        }

        let leaf_index = self.start_leaf + self.next_offset;
        self.next_offset += 1;

        let mut node = ctx.leaf(leaf_index);
        let mut node_height = 0u32;
        let mut index = leaf_index;
        loop {
            match self.stack.last() {
                Some(&(_, top_height)) if top_height == node_height => {
                    let (left, _) = self.stack.pop().unwrap();
                    index >>= 1;
                    node_height += 1;
                    node = ctx.merge(node_height, index, &left, &node);
                }
                _ => break,
            }
        }

        if node_height == self.height {
            self.done = Some(node);
        } else {
            self.stack.push((node, node_height));
        }
    }
}

/// Authentication-path cache for one layer tree.
#[derive(Clone, Debug)]
pub(crate) struct AuthCache {
    height: u32,
    retain_from: u32,
    /// Leaf index the cached path currently serves.
    next_leaf: u64,
    auth: Vec<Vec<u8>>,
    /// retain[j - retain_from][t] = node(j, t), for the top k levels.
    retain: Vec<Vec<Vec<u8>>>,
    builders: Vec<Option<TreehashBuilder>>,
}

impl AuthCache {
    /// Builds the cache for `ctx`'s tree, positioned at `start_leaf`, in a
    /// single scan over the tree. Also returns the tree root. Builders are
    /// fast-forwarded to the progress they would have if the cache had been
    /// advanced from leaf 0.
    pub fn init(
        ctx: &TreeContext<'_>,
        start_leaf: u64,
        cancel: Option<&CancelToken>,
    ) -> Result<(Self, Vec<u8>)> {
        let h = ctx.params.h;
        let k = ctx.params.k.min(h);
        let retain_from = h - k;

        let mut auth: Vec<Vec<u8>> = vec![Vec::new(); h as usize];
        let mut retain: Vec<Vec<Vec<u8>>> = (retain_from..h)
            .map(|j| vec![Vec::new(); 1usize << (h - j)])
            .collect();

        let root = ctx.scan_root(h, 0, cancel, &mut |height, index, node| {
            if height < h {
                if height >= retain_from {
                    retain[(height - retain_from) as usize][index as usize] = node.to_vec();
                }
                if index == ((start_leaf >> height) ^ 1) {
                    auth[height as usize] = node.to_vec();
                }
            }
        })?;

        let mut cache = Self {
            height: h,
            retain_from,
            next_leaf: start_leaf,
            auth,
            retain,
            builders: (0..retain_from as usize).map(|_| None).collect(),
        };

        for level in 0..retain_from {
            let due = (((start_leaf >> level) + 1) << level).min(1u64 << h);
            if due == 1u64 << h {
                continue;
            }
            let mut builder = TreehashBuilder::new(level, ((due >> level) ^ 1) << level);
            // Updates this builder would have received since its scheduling
            // at the previous level boundary.
            for _ in 0..start_leaf % (1u64 << level) {
                builder.update(ctx);
            }
            cache.builders[level as usize] = Some(builder);
        }

        Ok((cache, root))
    }

    /// The authentication path for the leaf the cache is positioned at.
    pub fn auth_path(&self) -> Vec<Vec<u8>> {
        self.auth.clone()
    }

    pub fn next_leaf(&self) -> u64 {
        self.next_leaf
    }

    /// Moves the cache from the just-signed leaf to the next one: one
    /// update on every active builder, then the auth-path levels whose
    /// sibling changed are replaced and their builders rescheduled.
    pub fn advance(&mut self, ctx: &TreeContext<'_>) {
        let next = self.next_leaf + 1;
        self.next_leaf = next;
        if next >= 1u64 << self.height {
            // Tree exhausted; a rollover replaces this cache entirely.
            return;
        }

        for builder in self.builders.iter_mut().flatten() {
            builder.update(ctx);
        }

        for level in 0..self.height {
            if next % (1u64 << level) != 0 {
                break;
            }
            let sibling = (next >> level) ^ 1;
            if level >= self.retain_from {
                self.auth[level as usize] =
                    self.retain[(level - self.retain_from) as usize][sibling as usize].clone();
            } else {
                let builder = self.builders[level as usize]
                    .take()
                    .expect("treehash builder missing at level boundary");
                self.auth[level as usize] = builder
                    .done
                    .expect("treehash builder incomplete at level boundary");

                let due = ((next >> level) + 1) << level;
                if due < 1u64 << self.height {
                    self.builders[level as usize] =
                        Some(TreehashBuilder::new(level, ((due >> level) ^ 1) << level));
                }
            }
        }
    }
}
