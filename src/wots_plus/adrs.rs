use crate::utils::u32_to_bytes;

/// The three hash-address types of RFC 8391. The 1-word value is set as the
/// `type` word of an [`Adrs`] and domain-separates the purposes a keyed hash
/// can be invoked for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum AdrsType {
    /// Type 0, used for WOTS+ chain steps and secret-value derivation.
    Ots,
    /// Type 1, used for compressing a WOTS+ public key into a leaf.
    LTree,
    /// Type 2, used for Merkle tree-hash nodes.
    HashTree,
}

/// Hash address: 8 big-endian 32-bit words parameterizing every keyed-hash
/// invocation, per RFC 8391 section 2.5.
///
/// Fixed word layout:
/// * word 0: layer address (tree layer, 0 is the lowest),
/// * words 1-2: tree address (64-bit tree instance within the layer),
/// * word 3: type ([`AdrsType`]),
/// * words 4-6: type-specific, see below,
/// * word 7: key-and-mask selector, distinguishing the key and bitmask
///   sub-calls of a single masked hash invocation.
///
/// Type-specific words:
/// * OTS: word 4 OTS keypair index, word 5 chain index, word 6 chain step;
/// * L-tree: word 4 L-tree leaf index, word 5 round height, word 6 node
///   index within the round;
/// * hash tree: word 4 zero padding, word 5 node height - 1, word 6 node
///   index within the level.
///
/// Switching the type zeroes words 4-7, so state from a previous purpose can
/// never leak into a different hash purpose.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Adrs([u32; 8]);

impl From<AdrsType> for Adrs {
    fn from(adrs_type: AdrsType) -> Self {
        let mut adrs = Self([0; 8]);
        adrs.set_type(adrs_type);
        adrs
    }
}

impl Adrs {
    /// Specify which layer of the hypertree we're working on.
    pub fn set_layer_addr(&mut self, layer: u32) {
        self.0[0] = layer;
    }

    /// Specify which tree instance within the layer we're working on.
    pub fn set_tree_addr(&mut self, tree: u64) {
        self.0[1] = (tree >> 32) as u32;
        self.0[2] = tree as u32;
    }

    /// Specify what hash purpose this address will key. Clears all
    /// type-specific words, including the key-and-mask selector.
    pub fn set_type(&mut self, adrs_type: AdrsType) {
        self.0[3] = adrs_type as u32;
        self.0[4..].fill(0);
    }

    /// Specify which OTS keypair (Merkle leaf) we're talking about.
    pub fn set_ots_addr(&mut self, ots: u32) {
        self.0[4] = ots;
    }

    /// Specify which WOTS+ chain we're working on.
    pub fn set_chain_addr(&mut self, chain: u32) {
        self.0[5] = chain;
    }

    /// Specify the step within a WOTS+ chain.
    pub fn set_hash_addr(&mut self, hash: u32) {
        self.0[6] = hash;
    }

    /// Specify which WOTS+ public key an L-tree compresses.
    pub fn set_ltree_addr(&mut self, ltree: u32) {
        self.0[4] = ltree;
    }

    /// Specify the height of the node being computed (L-tree round, or
    /// hash-tree child level).
    pub fn set_tree_height(&mut self, tree_height: u32) {
        self.0[5] = tree_height;
    }

    /// Specify the distance of the node from the left edge of its level.
    pub fn set_tree_index(&mut self, tree_index: u32) {
        self.0[6] = tree_index;
    }

    /// Select the key (0) or one of the bitmasks (1, 2) of a masked hash
    /// call. Always set explicitly before each PRF sub-call.
    pub fn set_key_and_mask(&mut self, key_and_mask: u32) {
        self.0[7] = key_and_mask;
    }

    /// Serializes the address as 32 bytes, each word big-endian.
    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, word) in self.0.iter().enumerate() {
            out[i * 4..(i + 1) * 4].copy_from_slice(&u32_to_bytes(*word));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_layout() {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_layer_addr(3);
        adrs.set_tree_addr(0x0102030405060708);
        adrs.set_ots_addr(9);
        adrs.set_chain_addr(10);
        adrs.set_hash_addr(11);
        adrs.set_key_and_mask(1);

        let bytes = adrs.to_bytes();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 3]);
        assert_eq!(&bytes[4..12], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]); // type Ots
        assert_eq!(&bytes[16..20], &[0, 0, 0, 9]);
        assert_eq!(&bytes[20..24], &[0, 0, 0, 10]);
        assert_eq!(&bytes[24..28], &[0, 0, 0, 11]);
        assert_eq!(&bytes[28..32], &[0, 0, 0, 1]);
    }

    #[test]
    fn test_set_type_clears_low_words() {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_layer_addr(1);
        adrs.set_tree_addr(7);
        adrs.set_chain_addr(4);
        adrs.set_hash_addr(5);
        adrs.set_key_and_mask(2);

        adrs.set_type(AdrsType::LTree);
        let bytes = adrs.to_bytes();
        // layer and tree survive, everything below the type word is cleared
        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..12], &[0, 0, 0, 0, 0, 0, 0, 7]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]);
        assert_eq!(&bytes[16..32], &[0u8; 16]);
    }

    #[test]
    fn test_distinct_purposes_never_collide() {
        let mut a = Adrs::from(AdrsType::HashTree);
        a.set_tree_height(1);
        a.set_tree_index(2);
        let mut b = Adrs::from(AdrsType::LTree);
        b.set_tree_height(1);
        b.set_tree_index(2);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }
}
