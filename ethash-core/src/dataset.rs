//! Dataset item derivation (component D) and full-DAG construction
//! (component E).

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

use crate::cache::Cache;
use crate::epoch::Params;
use crate::error::CoreError;

const HASH_BYTES: usize = 64;
const DATASET_PARENTS: usize = 256;
const FNV_PRIME: u32 = 0x0100_0193;

#[inline]
fn fnv(a: u32, b: u32) -> u32 {
    a.wrapping_mul(FNV_PRIME) ^ b
}

/// FNV-mixes `input`'s 16 little-endian u32 lanes into `mix`'s corresponding
/// lanes, in place.
pub(crate) fn fnv_mix(mix: &mut [u8; HASH_BYTES], input: &[u8; HASH_BYTES]) {
    for lane in 0..16 {
        let off = lane * 4;
        let a = LittleEndian::read_u32(&mix[off..off + 4]);
        let b = LittleEndian::read_u32(&input[off..off + 4]);
        LittleEndian::write_u32(&mut mix[off..off + 4], fnv(a, b));
    }
}

/// Derives the `i`-th 64-byte dataset item from `cache` (§3).
pub fn compute_item(cache: &Cache, i: usize) -> [u8; 64] {
    let n_cache = cache.len();
    let mut mix = *cache.item(i % n_cache);
    let lane0 = LittleEndian::read_u32(&mix[0..4]) ^ (i as u32);
    LittleEndian::write_u32(&mut mix[0..4], lane0);
    mix = ethash_hash::keccak512(&mix);

    for j in 0..DATASET_PARENTS {
        let lane_off = (j % 16) * 4;
        let lane = LittleEndian::read_u32(&mix[lane_off..lane_off + 4]);
        let parent_index = fnv(i as u32 ^ j as u32, lane) as usize % n_cache;
        fnv_mix(&mut mix, cache.item(parent_index));
    }

    ethash_hash::keccak512(&mix)
}

/// Owned storage backing a materialized dataset: either a heap buffer built
/// in-process, or a read-only memory map of a persisted DAG file whose
/// dataset bytes start at `data_offset`.
enum Storage {
    Heap(Vec<u8>),
    Mapped {
        mmap: memmap2::Mmap,
        data_offset: usize,
    },
}

/// The full materialized DAG (component E's product), or a handle onto a
/// memory-mapped persisted copy of one (component G). Both variants expose
/// the same `get_item` so the hashimoto core (component F) never needs to
/// know which kind it has.
pub struct Dataset {
    storage: Storage,
    n_items: usize,
}

impl Dataset {
    pub(crate) fn from_heap(bytes: Vec<u8>) -> Self {
        let n_items = bytes.len() / HASH_BYTES;
        Dataset {
            storage: Storage::Heap(bytes),
            n_items,
        }
    }

    pub(crate) fn from_mapped(mmap: memmap2::Mmap, data_offset: usize, full_size: usize) -> Self {
        Dataset {
            storage: Storage::Mapped { mmap, data_offset },
            n_items: full_size / HASH_BYTES,
        }
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    pub fn full_size(&self) -> usize {
        self.n_items * HASH_BYTES
    }

    /// Borrows the `i`-th 64-byte dataset item.
    pub fn get_item(&self, i: usize) -> &[u8; 64] {
        let start = i * HASH_BYTES;
        let slice = match &self.storage {
            Storage::Heap(bytes) => &bytes[start..start + HASH_BYTES],
            Storage::Mapped { mmap, data_offset } => {
                &mmap[data_offset + start..data_offset + start + HASH_BYTES]
            }
        };
        slice.try_into().expect("slice of length 64")
    }

    /// Raw dataset bytes, for persistence. `None` for a memory-mapped
    /// dataset (it is already on disk).
    pub(crate) fn heap_bytes(&self) -> Option<&[u8]> {
        match &self.storage {
            Storage::Heap(bytes) => Some(bytes),
            Storage::Mapped { .. } => None,
        }
    }
}

/// Advisory progress callback: reports a value in `[0.0, 1.0]`. Never
/// affects the resulting bytes.
pub type ProgressCallback<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// Builds the full dataset for `params` by generating items `0..n_full`
/// from `cache`, sharded across `threads` worker threads (component E).
/// Each shard writes only its own slice of the output, so no
/// synchronization is needed during the build itself.
pub fn build_dataset(
    cache: &Cache,
    params: Params,
    threads: usize,
    progress: Option<&ProgressCallback<'_>>,
) -> Result<Dataset, CoreError> {
    let n_items = (params.full_size as usize) / HASH_BYTES;
    let mut bytes = vec![0u8; n_items * HASH_BYTES];

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| CoreError::ConstructionFailed(e.to_string()))?;

    const CHUNK_ITEMS: usize = 1 << 16;
    let total_chunks = n_items.div_ceil(CHUNK_ITEMS);

    pool.install(|| {
        for (chunk_idx, chunk) in bytes.chunks_mut(CHUNK_ITEMS * HASH_BYTES).enumerate() {
            let base = chunk_idx * CHUNK_ITEMS;
            chunk
                .par_chunks_mut(HASH_BYTES)
                .enumerate()
                .for_each(|(offset, slot)| {
                    slot.copy_from_slice(&compute_item(cache, base + offset));
                });
            if let Some(cb) = progress {
                cb((chunk_idx + 1) as f64 / total_chunks as f64);
            }
        }
    });

    Ok(Dataset::from_heap(bytes))
}
