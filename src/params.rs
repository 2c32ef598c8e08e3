//! Parameter sets for XMSS and XMSS^MT and the OID registries that name them.
//!
//! A [`ParameterSet`] fixes the hash function, the security parameter `n`
//! (hash output length in bytes), the Winternitz base `w`, the per-layer tree
//! height `h`, the number of layers `d` (1 for single-tree XMSS), and the
//! auth-path cache parameter `k`. Everything else (`len1`, `len2`, `len`,
//! signature and key sizes, signing capacity) is derived.
//!
//! XMSS and XMSS^MT use disjoint OID registries, so an OID is only meaningful
//! together with a [`Variant`].

use crate::error::{Error, Result};

/// Distinguishes the two OID registries of RFC 8391.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Single-tree XMSS (d = 1).
    Xmss,
    /// Multi-tree XMSS^MT (d > 1).
    XmssMt,
}

/// The hash primitive backing F, H, H_msg and PRF for a parameter set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HashFunction {
    Sha256,
    Shake128,
    Shake256,
}

/// One algorithm variant of XMSS / XMSS^MT.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParameterSet {
    /// Registry identifier; 0 for custom (unregistered) sets.
    pub oid: u32,
    pub variant: Variant,
    pub hash: HashFunction,
    /// Hash output length in bytes.
    pub n: usize,
    /// Winternitz base, 4 or 16.
    pub w: usize,
    /// Height of each layer tree.
    pub h: u32,
    /// Number of layers.
    pub d: u32,
    /// Number of top tree levels retained verbatim by the incremental
    /// auth-path cache.
    pub k: u32,
}

const fn registered(
    oid: u32,
    variant: Variant,
    hash: HashFunction,
    h: u32,
    d: u32,
) -> ParameterSet {
    ParameterSet {
        oid,
        variant,
        hash,
        n: 32,
        w: 16,
        h,
        d,
        k: 2,
    }
}

pub const XMSS_SHA2_10_256: ParameterSet =
    registered(0x01, Variant::Xmss, HashFunction::Sha256, 10, 1);
pub const XMSS_SHA2_16_256: ParameterSet =
    registered(0x02, Variant::Xmss, HashFunction::Sha256, 16, 1);
pub const XMSS_SHA2_20_256: ParameterSet =
    registered(0x03, Variant::Xmss, HashFunction::Sha256, 20, 1);
pub const XMSS_SHAKE_10_256: ParameterSet =
    registered(0x07, Variant::Xmss, HashFunction::Shake128, 10, 1);
pub const XMSS_SHAKE_16_256: ParameterSet =
    registered(0x08, Variant::Xmss, HashFunction::Shake128, 16, 1);
pub const XMSS_SHAKE_20_256: ParameterSet =
    registered(0x09, Variant::Xmss, HashFunction::Shake128, 20, 1);

pub const XMSSMT_SHA2_20_2_256: ParameterSet =
    registered(0x01, Variant::XmssMt, HashFunction::Sha256, 10, 2);
pub const XMSSMT_SHA2_20_4_256: ParameterSet =
    registered(0x02, Variant::XmssMt, HashFunction::Sha256, 5, 4);
pub const XMSSMT_SHA2_40_2_256: ParameterSet =
    registered(0x03, Variant::XmssMt, HashFunction::Sha256, 20, 2);
pub const XMSSMT_SHA2_40_4_256: ParameterSet =
    registered(0x04, Variant::XmssMt, HashFunction::Sha256, 10, 4);
pub const XMSSMT_SHA2_40_8_256: ParameterSet =
    registered(0x05, Variant::XmssMt, HashFunction::Sha256, 5, 8);
pub const XMSSMT_SHA2_60_3_256: ParameterSet =
    registered(0x06, Variant::XmssMt, HashFunction::Sha256, 20, 3);
pub const XMSSMT_SHA2_60_6_256: ParameterSet =
    registered(0x07, Variant::XmssMt, HashFunction::Sha256, 10, 6);
pub const XMSSMT_SHA2_60_12_256: ParameterSet =
    registered(0x08, Variant::XmssMt, HashFunction::Sha256, 5, 12);
pub const XMSSMT_SHAKE_20_2_256: ParameterSet =
    registered(0x11, Variant::XmssMt, HashFunction::Shake128, 10, 2);
pub const XMSSMT_SHAKE_20_4_256: ParameterSet =
    registered(0x12, Variant::XmssMt, HashFunction::Shake128, 5, 4);
pub const XMSSMT_SHAKE_40_2_256: ParameterSet =
    registered(0x13, Variant::XmssMt, HashFunction::Shake128, 20, 2);
pub const XMSSMT_SHAKE_40_4_256: ParameterSet =
    registered(0x14, Variant::XmssMt, HashFunction::Shake128, 10, 4);
pub const XMSSMT_SHAKE_40_8_256: ParameterSet =
    registered(0x15, Variant::XmssMt, HashFunction::Shake128, 5, 8);
pub const XMSSMT_SHAKE_60_3_256: ParameterSet =
    registered(0x16, Variant::XmssMt, HashFunction::Shake128, 20, 3);
pub const XMSSMT_SHAKE_60_6_256: ParameterSet =
    registered(0x17, Variant::XmssMt, HashFunction::Shake128, 10, 6);
pub const XMSSMT_SHAKE_60_12_256: ParameterSet =
    registered(0x18, Variant::XmssMt, HashFunction::Shake128, 5, 12);

const XMSS_REGISTRY: &[ParameterSet] = &[
    XMSS_SHA2_10_256,
    XMSS_SHA2_16_256,
    XMSS_SHA2_20_256,
    XMSS_SHAKE_10_256,
    XMSS_SHAKE_16_256,
    XMSS_SHAKE_20_256,
];

const XMSSMT_REGISTRY: &[ParameterSet] = &[
    XMSSMT_SHA2_20_2_256,
    XMSSMT_SHA2_20_4_256,
    XMSSMT_SHA2_40_2_256,
    XMSSMT_SHA2_40_4_256,
    XMSSMT_SHA2_40_8_256,
    XMSSMT_SHA2_60_3_256,
    XMSSMT_SHA2_60_6_256,
    XMSSMT_SHA2_60_12_256,
    XMSSMT_SHAKE_20_2_256,
    XMSSMT_SHAKE_20_4_256,
    XMSSMT_SHAKE_40_2_256,
    XMSSMT_SHAKE_40_4_256,
    XMSSMT_SHAKE_40_8_256,
    XMSSMT_SHAKE_60_3_256,
    XMSSMT_SHAKE_60_6_256,
    XMSSMT_SHAKE_60_12_256,
];

impl ParameterSet {
    /// Looks up a registered parameter set by registry and OID.
    pub fn from_oid(variant: Variant, oid: u32) -> Result<Self> {
        let registry = match variant {
            Variant::Xmss => XMSS_REGISTRY,
            Variant::XmssMt => XMSSMT_REGISTRY,
        };
        registry
            .iter()
            .find(|p| p.oid == oid)
            .copied()
            .ok_or_else(|| Error::InvalidParameterSet(format!("unknown OID 0x{:08x}", oid)))
    }

    /// Builds a validated, unregistered parameter set.
    ///
    /// Intended for testing and experimentation with small trees; keys and
    /// signatures produced under a custom set can only be decoded with the
    /// explicit-parameters `from_bytes_with` constructors, since their OID
    /// (0) is not in any registry.
    pub fn custom(hash: HashFunction, n: usize, w: usize, h: u32, d: u32, k: u32) -> Result<Self> {
        if n == 0 || n > 64 {
            return Err(Error::InvalidParameterSet(format!("n = {} out of range", n)));
        }
        if hash == HashFunction::Sha256 && n > 32 {
            return Err(Error::InvalidParameterSet(
                "SHA-256 cannot produce more than 32 bytes".into(),
            ));
        }
        if w != 4 && w != 16 {
            return Err(Error::InvalidParameterSet(format!("w = {} not in {{4, 16}}", w)));
        }
        // The address encoding carries leaf and node indices in single
        // 32-bit words, and no registered set exceeds h = 20.
        if h == 0 || h > 20 {
            return Err(Error::InvalidParameterSet(format!("h = {} out of range", h)));
        }
        match h.checked_mul(d) {
            Some(total) if d > 0 && total <= 63 => {}
            _ => {
                return Err(Error::InvalidParameterSet(format!(
                    "total height {}*{} out of range",
                    h, d
                )));
            }
        }
        if k > h {
            return Err(Error::InvalidParameterSet(format!("k = {} exceeds h = {}", k, h)));
        }
        let variant = if d == 1 { Variant::Xmss } else { Variant::XmssMt };
        Ok(Self {
            oid: 0,
            variant,
            hash,
            n,
            w,
            h,
            d,
            k,
        })
    }

    /// log2 of the Winternitz base.
    pub fn log_w(&self) -> usize {
        match self.w {
            4 => 2,
            _ => 4,
        }
    }

    /// Number of base-w digits covering the message digest.
    pub fn len1(&self) -> usize {
        8 * self.n / self.log_w()
    }

    /// Number of base-w digits covering the checksum.
    pub fn len2(&self) -> usize {
        let max_csum = (self.len1() * (self.w - 1)) as f64;
        (max_csum.log2() / (self.log_w() as f64)).floor() as usize + 1
    }

    /// Total number of WOTS+ chains.
    pub fn wots_len(&self) -> usize {
        self.len1() + self.len2()
    }

    /// Combined height of all layers.
    pub fn total_height(&self) -> u32 {
        self.h * self.d
    }

    /// Width of the serialized signing index in bytes.
    pub fn index_bytes(&self) -> usize {
        ((self.total_height() + 7) / 8) as usize
    }

    /// Total number of one-time signatures the key pair can issue.
    pub fn capacity(&self) -> u64 {
        1u64 << self.total_height()
    }

    /// Number of leaves in each layer tree.
    pub fn leaves_per_tree(&self) -> u64 {
        1u64 << self.h
    }

    /// Byte size of one WOTS+ signature (and of one WOTS+ public key).
    pub fn wots_sig_bytes(&self) -> usize {
        self.wots_len() * self.n
    }

    /// Byte size of an encoded public key: OID(4) || root(n) || pub_seed(n).
    pub fn pk_bytes(&self) -> usize {
        4 + 2 * self.n
    }

    /// Byte size of the persisted secret-key state:
    /// OID(4) || index || sk_seed(n) || sk_prf(n) || pub_seed(n) || root(n).
    pub fn sk_bytes(&self) -> usize {
        4 + self.index_bytes() + 4 * self.n
    }

    /// Byte size of an encoded signature:
    /// index || r(n) || d * (WOTS+ sig || auth path).
    pub fn sig_bytes(&self) -> usize {
        self.index_bytes()
            + self.n
            + self.d as usize * (self.wots_sig_bytes() + self.h as usize * self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_derivation_rfc_sets() {
        let p = XMSS_SHA2_10_256;
        assert_eq!(p.len1(), 64);
        assert_eq!(p.len2(), 3);
        assert_eq!(p.wots_len(), 67);
        assert_eq!(p.index_bytes(), 2);
        assert_eq!(p.capacity(), 1024);
        assert_eq!(p.pk_bytes(), 68);
        assert_eq!(p.sk_bytes(), 134);
        assert_eq!(p.sig_bytes(), 2 + 32 + 67 * 32 + 10 * 32);
    }

    #[test]
    fn test_len_derivation_w4() {
        let p = ParameterSet::custom(HashFunction::Sha256, 32, 4, 4, 1, 0).unwrap();
        assert_eq!(p.len1(), 128);
        // len1 * (w-1) = 384, log_4(384) = 4.29 -> len2 = 5
        assert_eq!(p.len2(), 5);
    }

    #[test]
    fn test_oid_lookup() {
        let p = ParameterSet::from_oid(Variant::Xmss, 0x01).unwrap();
        assert_eq!(p, XMSS_SHA2_10_256);
        let p = ParameterSet::from_oid(Variant::XmssMt, 0x01).unwrap();
        assert_eq!(p, XMSSMT_SHA2_20_2_256);
        assert_eq!(p.total_height(), 20);
        assert!(matches!(
            ParameterSet::from_oid(Variant::Xmss, 0xdead),
            Err(Error::InvalidParameterSet(_))
        ));
    }

    #[test]
    fn test_custom_validation() {
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 3, 2, 1).is_ok());
        assert!(ParameterSet::custom(HashFunction::Sha256, 0, 16, 3, 1, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 48, 16, 3, 1, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Shake256, 48, 16, 3, 1, 0).is_ok());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 8, 3, 1, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 16, 4, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 3, 1, 4).is_err());
        // A single address word cannot hold leaf indices of trees past h = 32,
        // and the total-height product must not overflow.
        assert!(ParameterSet::custom(HashFunction::Shake256, 32, 16, 40, 1, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 21, 3, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 65536, 65536, 0).is_err());
        assert!(ParameterSet::custom(HashFunction::Sha256, 16, 16, 20, 3, 2).is_ok());
    }

    #[test]
    fn test_registries_are_consistent() {
        for p in XMSS_REGISTRY {
            assert_eq!(p.variant, Variant::Xmss);
            assert_eq!(p.d, 1);
        }
        for p in XMSSMT_REGISTRY {
            assert_eq!(p.variant, Variant::XmssMt);
            assert!(p.d > 1);
            assert!(p.total_height() <= 60);
        }
    }
}
