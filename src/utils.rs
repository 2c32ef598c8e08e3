pub(crate) fn u32_to_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub(crate) fn u64_to_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Big-endian encoding of `value` into exactly `len` bytes (RFC 8391 toByte).
pub(crate) fn to_byte(value: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let full = u64_to_bytes(value);
    let take = len.min(8);
    out[len - take..].copy_from_slice(&full[8 - take..]);
    out
}

/// Big-endian decoding of at most 8 bytes into a u64.
pub(crate) fn bytes_to_index(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for &b in bytes {
        value = (value << 8) | u64::from(b);
    }
    value
}

pub(crate) fn xor_into(dst: &mut [u8], mask: &[u8]) {
    for (d, m) in dst.iter_mut().zip(mask.iter()) {
        *d ^= m;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_byte_widths() {
        assert_eq!(to_byte(0x0102, 4), vec![0, 0, 1, 2]);
        assert_eq!(to_byte(0xff, 1), vec![0xff]);
        assert_eq!(to_byte(5, 10), vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 5]);
        assert_eq!(bytes_to_index(&to_byte(712_345, 5)), 712_345);
    }

    #[test]
    fn test_bytes_to_index_short() {
        assert_eq!(bytes_to_index(&[1, 0]), 256);
        assert_eq!(bytes_to_index(&[]), 0);
    }

    #[test]
    fn test_xor_into() {
        let mut a = [0b1010, 0b0110];
        xor_into(&mut a, &[0b0011, 0b0110]);
        assert_eq!(a, [0b1001, 0]);
    }
}
