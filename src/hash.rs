//! Keyed hash layer: the F, H, H_msg and PRF functions of RFC 8391, built on
//! SHA-256 or SHAKE128/256 and keyed through n-byte domain-separation
//! prefixes and [`Adrs`]-derived keys and bitmasks.

use crate::params::{HashFunction, ParameterSet};
use crate::utils::{to_byte, xor_into};
use crate::wots_plus::adrs::Adrs;
use sha2::Sha256;
use sha3::digest::{ExtendableOutput, FixedOutput, Update, XofReader};
use sha3::{Shake128, Shake256};

const PREFIX_F: u64 = 0;
const PREFIX_H: u64 = 1;
const PREFIX_H_MSG: u64 = 2;
const PREFIX_PRF: u64 = 3;

#[derive(Copy, Clone, Debug)]
pub(crate) struct Hasher {
    func: HashFunction,
    n: usize,
}

impl Hasher {
    pub fn new(params: &ParameterSet) -> Self {
        Self {
            func: params.hash,
            n: params.n,
        }
    }

    /// Hashes the concatenation of `parts`, producing `n` bytes.
    fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        match self.func {
            HashFunction::Sha256 => {
                let mut hasher = Sha256::default();
                for part in parts {
                    Update::update(&mut hasher, part);
                }
                hasher.finalize_fixed()[..self.n].to_vec()
            }
            HashFunction::Shake128 => {
                let mut hasher = Shake128::default();
                for part in parts {
                    hasher.update(part);
                }
                let mut out = vec![0u8; self.n];
                hasher.finalize_xof().read(&mut out);
                out
            }
            HashFunction::Shake256 => {
                let mut hasher = Shake256::default();
                for part in parts {
                    hasher.update(part);
                }
                let mut out = vec![0u8; self.n];
                hasher.finalize_xof().read(&mut out);
                out
            }
        }
    }

    /// PRF(KEY, M) = Hash(toByte(3, n) || KEY || M); `m` is a 32-byte value,
    /// either an encoded address or toByte(index, 32).
    pub fn prf(&self, key: &[u8], m: &[u8]) -> Vec<u8> {
        self.digest(&[&to_byte(PREFIX_PRF, self.n), key, m])
    }

    /// Randomized message digest
    /// H_msg(r || root || toByte(idx, n), M) = Hash(toByte(2, n) || r || root || toByte(idx, n) || M).
    pub fn h_msg(&self, r: &[u8], root: &[u8], idx: u64, message: &[u8]) -> Vec<u8> {
        self.digest(&[
            &to_byte(PREFIX_H_MSG, self.n),
            r,
            root,
            &to_byte(idx, self.n),
            message,
        ])
    }

    /// Chain-step function F. The key and the bitmask applied to `input` are
    /// both derived from `pub_seed` under the given address, with the
    /// key-and-mask word set explicitly for each sub-call.
    pub fn f(&self, pub_seed: &[u8], adrs: &mut Adrs, input: &[u8]) -> Vec<u8> {
        adrs.set_key_and_mask(0);
        let key = self.prf(pub_seed, &adrs.to_bytes());
        adrs.set_key_and_mask(1);
        let bitmask = self.prf(pub_seed, &adrs.to_bytes());

        let mut masked = input[..self.n].to_vec();
        xor_into(&mut masked, &bitmask);
        self.digest(&[&to_byte(PREFIX_F, self.n), &key, &masked])
    }

    /// Two-child node hash H (RAND_HASH), used for L-tree and tree-hash
    /// nodes. Left and right children are masked independently.
    pub fn rand_hash(&self, pub_seed: &[u8], adrs: &mut Adrs, left: &[u8], right: &[u8]) -> Vec<u8> {
        adrs.set_key_and_mask(0);
        let key = self.prf(pub_seed, &adrs.to_bytes());
        adrs.set_key_and_mask(1);
        let bitmask_l = self.prf(pub_seed, &adrs.to_bytes());
        adrs.set_key_and_mask(2);
        let bitmask_r = self.prf(pub_seed, &adrs.to_bytes());

        let mut masked_l = left[..self.n].to_vec();
        xor_into(&mut masked_l, &bitmask_l);
        let mut masked_r = right[..self.n].to_vec();
        xor_into(&mut masked_r, &bitmask_r);
        self.digest(&[&to_byte(PREFIX_H, self.n), &key, &masked_l, &masked_r])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;
    use crate::wots_plus::adrs::AdrsType;

    fn toy_hasher(func: HashFunction) -> Hasher {
        let params = ParameterSet::custom(func, 16, 16, 3, 1, 0).unwrap();
        Hasher::new(&params)
    }

    #[test]
    fn test_output_length_and_determinism() {
        for func in [
            HashFunction::Sha256,
            HashFunction::Shake128,
            HashFunction::Shake256,
        ] {
            let hasher = toy_hasher(func);
            let key = [7u8; 16];
            let m = [9u8; 32];
            let a = hasher.prf(&key, &m);
            let b = hasher.prf(&key, &m);
            assert_eq!(a.len(), 16);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_backends_disagree() {
        let key = [7u8; 16];
        let m = [9u8; 32];
        let sha = toy_hasher(HashFunction::Sha256).prf(&key, &m);
        let shake128 = toy_hasher(HashFunction::Shake128).prf(&key, &m);
        let shake256 = toy_hasher(HashFunction::Shake256).prf(&key, &m);
        assert_ne!(sha, shake128);
        assert_ne!(sha, shake256);
        assert_ne!(shake128, shake256);
    }

    #[test]
    fn test_domain_separation_between_f_and_h() {
        let hasher = toy_hasher(HashFunction::Sha256);
        let pub_seed = [1u8; 16];
        let block = [2u8; 16];
        let mut adrs_f = Adrs::from(AdrsType::Ots);
        let mut adrs_h = Adrs::from(AdrsType::Ots);
        let f = hasher.f(&pub_seed, &mut adrs_f, &block);
        let h = hasher.rand_hash(&pub_seed, &mut adrs_h, &block, &block);
        assert_ne!(f, h);
    }

    #[test]
    fn test_address_changes_output() {
        let hasher = toy_hasher(HashFunction::Sha256);
        let pub_seed = [1u8; 16];
        let block = [2u8; 16];

        let mut adrs = Adrs::from(AdrsType::Ots);
        let out_a = hasher.f(&pub_seed, &mut adrs, &block);
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_hash_addr(1);
        let out_b = hasher.f(&pub_seed, &mut adrs, &block);
        assert_ne!(out_a, out_b);
    }

    #[test]
    fn test_h_msg_binds_index() {
        let hasher = toy_hasher(HashFunction::Sha256);
        let r = [3u8; 16];
        let root = [4u8; 16];
        let a = hasher.h_msg(&r, &root, 0, b"message");
        let b = hasher.h_msg(&r, &root, 1, b"message");
        assert_ne!(a, b);
    }
}
