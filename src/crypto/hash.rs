use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Blake2b with a 32-byte output, the digest used for signing and addresses.
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of several byte slices fed in order.
pub fn blake2b256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Blake2b-256 as `0x`-prefixed hex
pub fn blake2b256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(blake2b256(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b256_matches_empty_input_vector() {
        let digest = blake2b256_hex(b"");
        assert_eq!(
            digest,
            "0x0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
        assert_eq!(digest.len(), 66);
    }

    #[test]
    fn concat_equals_single_buffer() {
        let joined = blake2b256(b"penalsui");
        let parts = blake2b256_concat(&[b"penal", b"sui"]);
        assert_eq!(joined, parts);
    }
}
