//! # Winternitz One-Time Signature Scheme Plus (WOTS+)
//!
//! This module implements the WOTS+ scheme as used inside XMSS: hash-chain
//! based one-time signatures over an n-byte message digest, keyed through
//! [`Adrs`] addresses so that every chain step of every keypair invokes the
//! hash under a unique address.
//!
//! Each of the `len` chains starts from a secret value derived by a keyed
//! PRF over the secret seed and the chain-specific address. Signing reveals
//! each chain advanced to the corresponding base-w digit of the digest;
//! the appended checksum digits (sum of `w-1-digit` over the message
//! digits) make it impossible to forge by advancing chains further.
//!
//! A WOTS+ keypair must sign exactly one digest. Index discipline is the
//! responsibility of the secret-key state manager, not of this module.

use crate::hash::Hasher;
use crate::params::ParameterSet;
use crate::utils::to_byte;
use crate::wots_plus::adrs::Adrs;
use rayon::prelude::*;

pub mod adrs;

/// Encapsulates the WOTS+ operations for one parameter set and public seed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WotsPlus<'a> {
    params: &'a ParameterSet,
    hasher: Hasher,
    pub_seed: &'a [u8],
}

impl<'a> WotsPlus<'a> {
    pub fn new(params: &'a ParameterSet, pub_seed: &'a [u8]) -> Self {
        Self {
            params,
            hasher: Hasher::new(params),
            pub_seed,
        }
    }

    /// Applies the chain function `steps` times starting from position
    /// `start`. `start + steps <= w - 1` is a caller contract.
    pub fn chain(&self, input: &[u8], start: u32, steps: u32, adrs: &mut Adrs) -> Vec<u8> {
        debug_assert!(start + steps <= self.params.w as u32 - 1);

        let mut value = input[..self.params.n].to_vec();
        for i in start..start + steps {
            adrs.set_hash_addr(i);
            value = self.hasher.f(self.pub_seed, adrs, &value);
        }
        value
    }

    /// Derives the secret start value of chain `chain` from `sk_seed` and the
    /// chain-specific address.
    fn secret_value(&self, sk_seed: &[u8], adrs: &Adrs, chain: u32) -> Vec<u8> {
        let mut sk_adrs = *adrs;
        sk_adrs.set_chain_addr(chain);
        sk_adrs.set_hash_addr(0);
        sk_adrs.set_key_and_mask(0);
        self.hasher.prf(sk_seed, &sk_adrs.to_bytes())
    }

    /// Generates the WOTS+ public key: every chain advanced the full `w - 1`
    /// steps. `adrs` must carry the layer, tree and OTS keypair fields.
    /// Chains are independent and computed in parallel.
    pub fn pk_gen(&self, sk_seed: &[u8], adrs: &Adrs) -> Vec<Vec<u8>> {
        let w = self.params.w as u32;
        (0..self.params.wots_len() as u32)
            .into_par_iter()
            .map(|i| {
                let sk = self.secret_value(sk_seed, adrs, i);
                let mut chain_adrs = *adrs;
                chain_adrs.set_chain_addr(i);
                self.chain(&sk, 0, w - 1, &mut chain_adrs)
            })
            .collect()
    }

    /// Signs an n-byte digest: chain `i` advanced to digit `i` of the
    /// base-w representation of `digest` plus checksum.
    pub fn sign(&self, digest: &[u8], sk_seed: &[u8], adrs: &Adrs) -> Vec<Vec<u8>> {
        let lengths = self.chain_lengths(digest);
        lengths
            .iter()
            .enumerate()
            .map(|(i, &steps)| {
                let sk = self.secret_value(sk_seed, adrs, i as u32);
                let mut chain_adrs = *adrs;
                chain_adrs.set_chain_addr(i as u32);
                self.chain(&sk, 0, steps, &mut chain_adrs)
            })
            .collect()
    }

    /// Completes each signature chain the remaining `w - 1 - digit` steps,
    /// yielding the public key iff the signature is valid for `digest`.
    pub fn pk_from_sig(&self, sig: &[Vec<u8>], digest: &[u8], adrs: &Adrs) -> Vec<Vec<u8>> {
        let w = self.params.w as u32;
        let lengths = self.chain_lengths(digest);
        lengths
            .iter()
            .zip(sig.iter())
            .enumerate()
            .map(|(i, (&steps, block))| {
                let mut chain_adrs = *adrs;
                chain_adrs.set_chain_addr(i as u32);
                self.chain(block, steps, w - 1 - steps, &mut chain_adrs)
            })
            .collect()
    }

    /// Converts bytes into `out_len` base-w digits.
    fn base_w(&self, input: &[u8], out_len: usize) -> Vec<u32> {
        let log_w = self.params.log_w();
        let mut out = Vec::with_capacity(out_len);
        let mut bits = 0;
        let mut total: u8 = 0;
        let mut input_index = 0;

        for _ in 0..out_len {
            if bits == 0 {
                total = input[input_index];
                input_index += 1;
                bits = 8;
            }
            bits -= log_w;
            out.push(u32::from((total >> bits) & ((self.params.w - 1) as u8)));
        }
        out
    }

    /// Computes the base-w digits of the WOTS+ checksum over the message
    /// digits.
    fn checksum(&self, msg_digits: &[u32]) -> Vec<u32> {
        let log_w = self.params.log_w();
        let len2 = self.params.len2();
        let w = self.params.w as u32;

        let mut csum: u64 = 0;
        for &digit in msg_digits {
            csum += u64::from(w - 1 - digit);
        }

        // Left-align the checksum so the expected empty bits are the least
        // significant ones before base-w conversion.
        let shift = (8 - ((len2 * log_w) % 8)) % 8;
        csum <<= shift;
        let csum_bytes = to_byte(csum, (len2 * log_w + 7) / 8);
        self.base_w(&csum_bytes, len2)
    }

    /// Takes an n-byte digest and derives all `len` chain lengths.
    pub fn chain_lengths(&self, digest: &[u8]) -> Vec<u32> {
        let mut lengths = self.base_w(digest, self.params.len1());
        lengths.extend(self.checksum(&lengths));
        lengths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HashFunction, ParameterSet};
    use crate::wots_plus::adrs::AdrsType;
    use rand::rngs::OsRng;
    use rand::RngCore;

    fn toy_params() -> ParameterSet {
        ParameterSet::custom(HashFunction::Sha256, 16, 16, 3, 1, 0).unwrap()
    }

    fn ots_adrs(keypair: u32) -> Adrs {
        let mut adrs = Adrs::from(AdrsType::Ots);
        adrs.set_ots_addr(keypair);
        adrs
    }

    #[test]
    fn test_chain_composition() {
        let params = toy_params();
        let pub_seed = [5u8; 16];
        let wp = WotsPlus::new(&params, &pub_seed);
        let start = [1u8; 16];

        let mut adrs = ots_adrs(0);
        let full = wp.chain(&start, 0, 9, &mut adrs);
        let mut adrs = ots_adrs(0);
        let half = wp.chain(&start, 0, 4, &mut adrs);
        let mut adrs = ots_adrs(0);
        let rest = wp.chain(&half, 4, 5, &mut adrs);
        assert_eq!(full, rest);
    }

    #[test]
    fn test_chain_lengths_checksum() {
        let params = toy_params();
        let pub_seed = [5u8; 16];
        let wp = WotsPlus::new(&params, &pub_seed);

        // All-zero digest: every message digit is 0, checksum is len1*(w-1).
        let lengths = wp.chain_lengths(&[0u8; 16]);
        assert_eq!(lengths.len(), params.wots_len());
        assert!(lengths[..params.len1()].iter().all(|&l| l == 0));
        let csum: u64 = lengths[params.len1()..]
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| u64::from(d) << (i * params.log_w()))
            .sum();
        assert_eq!(csum, (params.len1() * (params.w - 1)) as u64);
    }

    #[test]
    fn test_sign_and_recover_pk() {
        let params = toy_params();
        let mut pub_seed = [0u8; 16];
        let mut sk_seed = [0u8; 16];
        OsRng.fill_bytes(&mut pub_seed);
        OsRng.fill_bytes(&mut sk_seed);
        let wp = WotsPlus::new(&params, &pub_seed);

        let mut digest = [0u8; 16];
        OsRng.fill_bytes(&mut digest);

        let adrs = ots_adrs(3);
        let pk = wp.pk_gen(&sk_seed, &adrs);
        let sig = wp.sign(&digest, &sk_seed, &adrs);
        assert_eq!(wp.pk_from_sig(&sig, &digest, &adrs), pk);

        let mut forged = sig.clone();
        forged[0][0] ^= 1;
        assert_ne!(wp.pk_from_sig(&forged, &digest, &adrs), pk);

        let mut other = digest;
        other[0] ^= 1;
        assert_ne!(wp.pk_from_sig(&sig, &other, &adrs), pk);
    }

    #[test]
    fn test_keypair_address_separates_keys() {
        let params = toy_params();
        let pub_seed = [7u8; 16];
        let sk_seed = [8u8; 16];
        let wp = WotsPlus::new(&params, &pub_seed);
        let pk0 = wp.pk_gen(&sk_seed, &ots_adrs(0));
        let pk1 = wp.pk_gen(&sk_seed, &ots_adrs(1));
        assert_ne!(pk0, pk1);
        // Deterministic per address.
        assert_eq!(pk0, wp.pk_gen(&sk_seed, &ots_adrs(0)));
    }
}
