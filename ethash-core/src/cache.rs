//! Cache construction (component C): RandMemoHash over Keccak-512 items.

use byteorder::{ByteOrder, LittleEndian};

use crate::epoch::Params;

const HASH_BYTES: usize = 64;
const CACHE_ROUNDS: usize = 3;

/// An epoch's light cache: `cache_size` bytes, `n_items = cache_size / 64`
/// items of 64 bytes each.
#[derive(Clone)]
pub struct Cache {
    bytes: Vec<u8>,
}

impl Cache {
    /// Number of 64-byte items in the cache.
    pub fn len(&self) -> usize {
        self.bytes.len() / HASH_BYTES
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Borrows the `i`-th 64-byte item (`i` is reduced modulo the item count
    /// by callers, per the Ethash item-derivation algorithm).
    pub fn item(&self, i: usize) -> &[u8; 64] {
        let start = i * HASH_BYTES;
        (&self.bytes[start..start + HASH_BYTES])
            .try_into()
            .expect("slice of length 64")
    }
}

/// Builds the cache for `params` from `seed`, per §3:
/// 1. item\[0\] = Keccak512(seed); item\[i\] = Keccak512(item\[i-1\]).
/// 2. `CACHE_ROUNDS` passes of RandMemoHash mixing each item with a
///    pseudo-randomly selected sibling.
pub fn build_cache(params: Params, seed: &[u8; 32]) -> Cache {
    let n_items = (params.cache_size as usize) / HASH_BYTES;
    let mut bytes = vec![0u8; n_items * HASH_BYTES];

    let first = ethash_hash::keccak512(seed);
    bytes[0..HASH_BYTES].copy_from_slice(&first);
    for i in 1..n_items {
        let prev = {
            let start = (i - 1) * HASH_BYTES;
            let mut buf = [0u8; HASH_BYTES];
            buf.copy_from_slice(&bytes[start..start + HASH_BYTES]);
            buf
        };
        let next = ethash_hash::keccak512(&prev);
        let start = i * HASH_BYTES;
        bytes[start..start + HASH_BYTES].copy_from_slice(&next);
    }

    for _ in 0..CACHE_ROUNDS {
        for i in 0..n_items {
            let left_idx = (i + n_items - 1) % n_items;
            let item_idx = LittleEndian::read_u32(&bytes[i * HASH_BYTES..i * HASH_BYTES + 4]) as usize % n_items;

            let mut mixed = [0u8; HASH_BYTES];
            for (j, byte) in mixed.iter_mut().enumerate() {
                *byte = bytes[left_idx * HASH_BYTES + j] ^ bytes[item_idx * HASH_BYTES + j];
            }
            let hashed = ethash_hash::keccak512(&mixed);
            let start = i * HASH_BYTES;
            bytes[start..start + HASH_BYTES].copy_from_slice(&hashed);
        }
    }

    Cache { bytes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch::params_for;

    #[test]
    fn cache_build_is_deterministic() {
        let seed = [0u8; 32];
        let params = Params {
            cache_size: 64 * 64,
            full_size: 128 * 128,
        };
        let a = build_cache(params, &seed);
        let b = build_cache(params, &seed);
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn cache_size_matches_params() {
        let params = params_for(0);
        // Building the full epoch-0 cache (~16MB) is slow but well within
        // reach for a one-off test; item count matches the computed size.
        let small = Params {
            cache_size: 64 * 16,
            full_size: params.full_size,
        };
        let cache = build_cache(small, &[1u8; 32]);
        assert_eq!(cache.len(), 16);
        assert_eq!(cache.size_bytes(), 64 * 16);
    }
}
