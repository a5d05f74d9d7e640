//! The hashimoto mixing loop (component F), shared verbatim between the
//! light (cache-recompute) and full (dataset-read) access paths. Per the
//! redesign notes, the two paths differ only in how a dataset item pair is
//! fetched — modeled here as the [`ItemPairSource`] capability — so the
//! mixing algorithm itself is written once.

use byteorder::{ByteOrder, LittleEndian};

use crate::cache::Cache;
use crate::dataset::{compute_item, Dataset};

const HASH_BYTES: usize = 64;
const MIX_BYTES: usize = 128;
const ACCESSES: usize = 64;
const FNV_PRIME: u32 = 0x0100_0193;

#[inline]
fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(FNV_PRIME) ^ b
}

fn fnv_mix_into(mix: &mut [u8], input: &[u8]) {
    debug_assert_eq!(mix.len(), input.len());
    debug_assert_eq!(mix.len() % 4, 0);
    for off in (0..mix.len()).step_by(4) {
        let a = LittleEndian::read_u32(&mix[off..off + 4]);
        let b = LittleEndian::read_u32(&input[off..off + 4]);
        LittleEndian::write_u32(&mut mix[off..off + 4], fnv(a, b));
    }
}

/// Capability to fetch a pair of consecutive 64-byte dataset items
/// (`D[2*page]`, `D[2*page+1]`) given a page index, plus the dataset's
/// total item count. Implemented once for the light (cache-recompute) path
/// and once for the full (dataset-read) path; [`hashimoto`] is written
/// against this trait only.
pub trait ItemPairSource: Sync {
    /// `n_full`, the total number of 64-byte dataset items.
    fn n_items(&self) -> usize;

    /// The 128-byte concatenation `D[2*page] ‖ D[2*page+1]`.
    fn fetch_pair(&self, page: usize) -> [u8; MIX_BYTES];
}

/// Light-path source: recomputes each dataset item on demand from the cache.
pub struct LightSource<'a> {
    cache: &'a Cache,
    n_items: usize,
}

impl<'a> LightSource<'a> {
    pub fn new(cache: &'a Cache, n_items: usize) -> Self {
        LightSource { cache, n_items }
    }
}

impl ItemPairSource for LightSource<'_> {
    fn n_items(&self) -> usize {
        self.n_items
    }

    fn fetch_pair(&self, page: usize) -> [u8; MIX_BYTES] {
        let a = compute_item(self.cache, 2 * page);
        let b = compute_item(self.cache, 2 * page + 1);
        concat_items(&a, &b)
    }
}

/// Full-path source: reads items directly from a materialized dataset.
pub struct FullSource<'a> {
    dataset: &'a Dataset,
}

impl<'a> FullSource<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        FullSource { dataset }
    }
}

impl ItemPairSource for FullSource<'_> {
    fn n_items(&self) -> usize {
        self.dataset.n_items()
    }

    fn fetch_pair(&self, page: usize) -> [u8; MIX_BYTES] {
        let a = self.dataset.get_item(2 * page);
        let b = self.dataset.get_item(2 * page + 1);
        concat_items(a, b)
    }
}

fn concat_items(a: &[u8; HASH_BYTES], b: &[u8; HASH_BYTES]) -> [u8; MIX_BYTES] {
    let mut out = [0u8; MIX_BYTES];
    out[0..HASH_BYTES].copy_from_slice(a);
    out[HASH_BYTES..MIX_BYTES].copy_from_slice(b);
    out
}

/// Output of a hashimoto invocation: the value compared against the PoW
/// target, and the attestation embedded in the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashimotoResult {
    pub result: [u8; 32],
    pub mix_hash: [u8; 32],
}

/// The shared mixing loop (§3). `header_hash` is the block hash without its
/// nonce field; `source` supplies dataset item pairs either by recomputing
/// from the cache (light) or reading a materialized dataset (full) — both
/// must produce bit-identical output for identical inputs.
pub fn hashimoto(header_hash: &[u8; 32], nonce: u64, source: &impl ItemPairSource) -> HashimotoResult {
    let mut nonce_le = [0u8; 8];
    LittleEndian::write_u64(&mut nonce_le, nonce);
    let seed_mix = ethash_hash::keccak512_concat(&[header_hash, &nonce_le]);

    let mut mix = [0u8; MIX_BYTES];
    mix[0..HASH_BYTES].copy_from_slice(&seed_mix);
    mix[HASH_BYTES..MIX_BYTES].copy_from_slice(&seed_mix);

    let seed_lane0 = LittleEndian::read_u32(&seed_mix[0..4]);
    let n_mix_lanes = MIX_BYTES / 4;
    let n_pages = source.n_items() / 2;

    for i in 0..ACCESSES {
        let lane_off = (i % n_mix_lanes) * 4;
        let lane = LittleEndian::read_u32(&mix[lane_off..lane_off + 4]);
        let page = (fnv(i as u32 ^ seed_lane0, lane) as usize) % n_pages;
        let block = source.fetch_pair(page);
        fnv_mix_into(&mut mix, &block);
    }

    let cmix = compress_mix(&mix);

    let result = ethash_hash::keccak256_concat(&[&seed_mix, &cmix]);

    HashimotoResult {
        result,
        mix_hash: cmix,
    }
}

/// FNV-compresses each group of 4 little-endian u32 lanes of `mix` (128
/// bytes, 32 lanes) down to one lane each, producing 32 bytes (8 lanes).
fn compress_mix(mix: &[u8; MIX_BYTES]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for group in 0..8 {
        let base = group * 16;
        let mut acc = LittleEndian::read_u32(&mix[base..base + 4]);
        for lane in 1..4 {
            let next = LittleEndian::read_u32(&mix[base + lane * 4..base + lane * 4 + 4]);
            acc = fnv(acc, next);
        }
        LittleEndian::write_u32(&mut out[group * 4..group * 4 + 4], acc);
    }
    out
}

/// Recomputes a hash with the cache-driven light path.
pub fn hashimoto_light(cache: &Cache, n_items: usize, header_hash: &[u8; 32], nonce: u64) -> HashimotoResult {
    hashimoto(header_hash, nonce, &LightSource::new(cache, n_items))
}

/// Computes a hash by reading directly from a materialized dataset.
pub fn hashimoto_full(dataset: &Dataset, header_hash: &[u8; 32], nonce: u64) -> HashimotoResult {
    hashimoto(header_hash, nonce, &FullSource::new(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_cache;
    use crate::dataset::build_dataset;
    use crate::epoch::Params;

    fn small_params() -> Params {
        Params {
            cache_size: 64 * 64,
            full_size: 128 * 64,
        }
    }

    #[test]
    fn light_and_full_paths_agree() {
        let params = small_params();
        let cache = build_cache(params, &[9u8; 32]);
        let dataset = build_dataset(&cache, params, 2, None).unwrap();

        let header_hash = [0x42u8; 32];
        for nonce in [0u64, 1, 42, u64::MAX] {
            let light = hashimoto_light(&cache, dataset.n_items(), &header_hash, nonce);
            let full = hashimoto_full(&dataset, &header_hash, nonce);
            assert_eq!(light, full, "mismatch at nonce {nonce}");
        }
    }

    #[test]
    fn hashimoto_is_deterministic() {
        let params = small_params();
        let cache = build_cache(params, &[1u8; 32]);
        let dataset = build_dataset(&cache, params, 1, None).unwrap();
        let header_hash = [7u8; 32];
        let a = hashimoto_full(&dataset, &header_hash, 99);
        let b = hashimoto_full(&dataset, &header_hash, 99);
        assert_eq!(a, b);
    }

    #[test]
    fn different_nonces_produce_different_results() {
        let params = small_params();
        let cache = build_cache(params, &[2u8; 32]);
        let dataset = build_dataset(&cache, params, 1, None).unwrap();
        let header_hash = [3u8; 32];
        let a = hashimoto_full(&dataset, &header_hash, 1);
        let b = hashimoto_full(&dataset, &header_hash, 2);
        assert_ne!(a.result, b.result);
    }
}
