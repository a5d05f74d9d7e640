//! Epoch arithmetic and seed-hash derivation (component B).

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::CoreError;

/// Number of blocks sharing one epoch's seed, cache and DAG.
pub const EPOCH_LENGTH: u64 = 30_000;

/// The engine refuses any block at or beyond this height.
pub const MAX_BLOCK_NUMBER: u64 = EPOCH_LENGTH * 2048;

const HASH_BYTES: u64 = 64;
const MIX_BYTES: u64 = 128;

const CACHE_INIT_BYTES: u64 = 1 << 24;
const CACHE_GROWTH_BYTES: u64 = 1 << 17;
const DATASET_INIT_BYTES: u64 = 1 << 30;
const DATASET_GROWTH_BYTES: u64 = 1 << 23;

/// Cache and full-dataset sizes for a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub cache_size: u64,
    pub full_size: u64,
}

/// Returns `floor(block_number / EPOCH_LENGTH)`, rejecting out-of-range heights.
pub fn epoch(block_number: u64) -> Result<u64, CoreError> {
    if block_number >= MAX_BLOCK_NUMBER {
        return Err(CoreError::BlockOutOfRange {
            block_number,
            limit: MAX_BLOCK_NUMBER,
        });
    }
    Ok(block_number / EPOCH_LENGTH)
}

/// Seed cache shared process-wide: `seed(e)` only ever grows by iterated
/// Keccak-256, so every call memoizes instead of recomputing the full chain.
static SEEDS: Lazy<Mutex<Vec<[u8; 32]>>> = Lazy::new(|| Mutex::new(vec![[0u8; 32]]));

/// `seed(epoch)`: 32 zero bytes for epoch 0, `Keccak256(seed(epoch-1))` after.
pub fn seed_for_epoch(epoch: u64) -> [u8; 32] {
    let epoch = epoch as usize;
    let mut seeds = SEEDS.lock().expect("seed cache poisoned");
    while seeds.len() <= epoch {
        let next = ethash_hash::keccak256(seeds.last().expect("seeds never empty"));
        seeds.push(next);
    }
    seeds[epoch]
}

/// `seed_hash(block_number) = seed(epoch(block_number))`.
pub fn seed_hash(block_number: u64) -> Result<[u8; 32], CoreError> {
    Ok(seed_for_epoch(epoch(block_number)?))
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Cache and dataset sizes for `epoch`, reproducing the reference Ethash
/// parameter table bit-exactly: each size is the largest
/// granularity-aligned value no greater than the linearly-grown candidate
/// such that `size / granularity` is prime.
pub fn params_for(epoch: u64) -> Params {
    Params {
        cache_size: cache_size_for_epoch(epoch),
        full_size: full_size_for_epoch(epoch),
    }
}

fn cache_size_for_epoch(epoch: u64) -> u64 {
    let mut size = CACHE_INIT_BYTES + CACHE_GROWTH_BYTES * epoch - HASH_BYTES;
    while !is_prime(size / HASH_BYTES) {
        size -= 2 * HASH_BYTES;
    }
    size
}

fn full_size_for_epoch(epoch: u64) -> u64 {
    let mut size = DATASET_INIT_BYTES + DATASET_GROWTH_BYTES * epoch - MIX_BYTES;
    while !is_prime(size / MIX_BYTES) {
        size -= 2 * MIX_BYTES;
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_at_epoch_zero_is_zero() {
        assert_eq!(seed_hash(0).unwrap(), [0u8; 32]);
    }

    #[test]
    fn seed_at_epoch_one_matches_reference_vector() {
        let seed = seed_hash(EPOCH_LENGTH).unwrap();
        assert_eq!(
            crate::test_support::hex(&seed),
            "290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563"
        );
    }

    #[test]
    fn range_guard_rejects_boundary_block() {
        assert!(matches!(
            seed_hash(MAX_BLOCK_NUMBER),
            Err(CoreError::BlockOutOfRange { .. })
        ));
    }

    #[test]
    fn params_are_monotonic_across_epochs() {
        for e in 0..8 {
            let p0 = params_for(e);
            let p1 = params_for(e + 1);
            assert!(p1.cache_size > p0.cache_size);
            assert!(p1.full_size > p0.full_size);
        }
    }

    #[test]
    fn params_satisfy_alignment_invariants() {
        for e in [0u64, 1, 2, 10, 100] {
            let p = params_for(e);
            assert_eq!(p.cache_size % HASH_BYTES, 0);
            assert_eq!(p.full_size % (2 * HASH_BYTES), 0);
        }
    }

    #[test]
    fn epoch_zero_params_match_known_reference_sizes() {
        let p = params_for(0);
        // Well-known Ethash epoch-0 sizes.
        assert_eq!(p.cache_size, 16_776_896);
        assert_eq!(p.full_size, 1_073_739_904);
    }
}
