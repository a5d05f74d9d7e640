//! Keccak-256 and Keccak-512 primitives for Ethash.
//!
//! These are the *original* Keccak padding (`0x01` domain separator), not
//! the NIST SHA-3 variants (`0x06`) — `sha3::Keccak256`/`Keccak512` already
//! implement the former, which is what go-ethereum's `ethash.go` links
//! against via `libethash/sha3.c`.

use sha3::{Digest, Keccak256, Keccak512};

/// Keccak-256 of `data`, byte-exact with the Ethash reference implementation.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Keccak-512 of `data`.
pub fn keccak512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Keccak512::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    out
}

/// Keccak-256 over the concatenation of several byte slices, avoiding an
/// intermediate allocation for the common two- and three-part cases used
/// throughout the hashimoto mixing loop.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Keccak-512 over the concatenation of several byte slices.
pub fn keccak512_concat(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Keccak512::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_of_zero_hash_matches_epoch_one_seed() {
        // seed_hash(30000) from spec §8's concrete scenario.
        let zero = [0u8; 32];
        let seed1 = keccak256(&zero);
        assert_eq!(
            hex_encode(&seed1),
            "290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
    }

    #[test]
    fn keccak256_concat_matches_sequential_update() {
        let a = [1u8; 8];
        let b = [2u8; 40];
        let combined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(keccak256_concat(&[&a, &b]), keccak256(&combined));
    }

    #[test]
    fn keccak512_concat_matches_sequential_update() {
        let a = [7u8; 32];
        let b = [9u8; 8];
        let combined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(keccak512_concat(&[&a, &b]), keccak512(&combined));
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
