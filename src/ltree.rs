//! L-tree compression of a WOTS+ public key into a single n-byte leaf.

use crate::hash::Hasher;
use crate::wots_plus::adrs::Adrs;

/// Reduces the `len` blocks of a WOTS+ public key to one block by repeated
/// pairwise hashing. An odd block left unpaired in a round carries forward
/// unchanged. `adrs` must be an L-tree address with layer, tree and L-tree
/// leaf fields already set.
pub(crate) fn ltree(
    hasher: &Hasher,
    pub_seed: &[u8],
    adrs: &mut Adrs,
    mut blocks: Vec<Vec<u8>>,
) -> Vec<u8> {
    debug_assert!(!blocks.is_empty());

    let mut len = blocks.len();
    let mut height = 0u32;
    adrs.set_tree_height(height);

    while len > 1 {
        for i in 0..len / 2 {
            adrs.set_tree_index(i as u32);
            blocks[i] = hasher.rand_hash(pub_seed, adrs, &blocks[2 * i], &blocks[2 * i + 1]);
        }
        if len % 2 == 1 {
            blocks[len / 2] = std::mem::take(&mut blocks[len - 1]);
        }
        len = (len + 1) / 2;
        height += 1;
        adrs.set_tree_height(height);
    }

    blocks.truncate(1);
    blocks.pop().unwrap()
}
