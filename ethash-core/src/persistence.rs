//! DAG persistence (component G): a self-describing on-disk file format so
//! a restart does not repeat a multi-minute dataset build.
//!
//! ```text
//! magic[8]            // "ETHDAG\0\0"
//! seed_hash[32]       // seed for the epoch, self-describing
//! dataset[full_size]  // raw D[0] .. D[n_full-1]
//! ```
//!
//! Reading, writing and memory-mapping are all best-effort: any failure
//! (unwritable directory, corrupt or truncated file) falls back to the
//! in-memory dataset the caller already has, per §7's
//! `PersistenceUnavailable` policy — it is logged, never surfaced.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::dataset::Dataset;
use crate::epoch::Params;
use crate::error::CoreError;

const MAGIC: &[u8; 8] = b"ETHDAG\0\0";
const HEADER_LEN: usize = MAGIC.len() + 32;

fn dag_path(dir: &Path, seed: &[u8; 32], params: Params) -> PathBuf {
    let seed_prefix = ethash_hash_hex_prefix(seed);
    dir.join(format!("{}-{}.dag", seed_prefix, params.full_size))
}

fn ethash_hash_hex_prefix(seed: &[u8; 32]) -> String {
    seed[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Attempts to open an existing, matching DAG file as a memory map;
/// returns `None` (never an error) if the file is absent, corrupt,
/// truncated, or for a different epoch.
fn try_open(path: &Path, seed: &[u8; 32], params: Params) -> Option<Dataset> {
    let file = fs::File::open(path).ok()?;
    let expected_len = HEADER_LEN as u64 + params.full_size;
    let actual_len = file.metadata().ok()?.len();
    if actual_len != expected_len {
        debug!(
            "dag file {:?} has length {} (expected {}), treating as absent",
            path, actual_len, expected_len
        );
        return None;
    }

    // SAFETY: the file is not concurrently modified by this process; the OS
    // and filesystem provide the usual mmap guarantees for a read-only map.
    let mmap = unsafe { memmap2::Mmap::map(&file).ok()? };
    if &mmap[0..MAGIC.len()] != MAGIC.as_slice() {
        debug!("dag file {:?} has bad magic, treating as absent", path);
        return None;
    }
    if &mmap[MAGIC.len()..HEADER_LEN] != seed {
        debug!("dag file {:?} seed mismatch, treating as absent", path);
        return None;
    }

    Some(Dataset::from_mapped(mmap, HEADER_LEN, params.full_size as usize))
}

/// Best-effort: writes `dataset` to a temp file under `dir` and atomically
/// renames it into place, then re-opens it as a memory map. On any failure
/// (unwritable directory, out of space) logs and returns `None` — the
/// caller keeps using its in-memory dataset.
fn try_persist(dir: &Path, seed: &[u8; 32], params: Params, dataset: &Dataset) -> Option<Dataset> {
    let bytes = dataset.heap_bytes()?;
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("dag directory {:?} unavailable ({e}), skipping persistence", dir);
        return None;
    }

    let final_path = dag_path(dir, seed, params);
    let tmp_path = dir.join(format!(".{}.tmp", final_path.file_name()?.to_string_lossy()));

    let write_result = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(MAGIC.as_slice())?;
        f.write_all(seed)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    })();

    if let Err(e) = write_result {
        warn!("failed to persist dag to {:?} ({e}), continuing in-memory", final_path);
        let _ = fs::remove_file(&tmp_path);
        return None;
    }

    try_open(&final_path, seed, params)
}

/// Returns the DAG for `(seed, params)`, reading a persisted copy under
/// `dir` if one matches, or building it via `build_fn` and persisting the
/// result for next time. `build_fn` runs at most once.
pub fn open_or_build(
    dir: &Path,
    seed: &[u8; 32],
    params: Params,
    build_fn: impl FnOnce() -> Result<Dataset, CoreError>,
) -> Result<Dataset, CoreError> {
    let path = dag_path(dir, seed, params);
    if let Some(existing) = try_open(&path, seed, params) {
        debug!("loaded dag from {:?}", path);
        return Ok(existing);
    }

    let built = build_fn()?;
    match try_persist(dir, seed, params, &built) {
        Some(mapped) => Ok(mapped),
        None => Ok(built),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_cache;
    use crate::dataset::build_dataset;

    fn small_params() -> Params {
        Params {
            cache_size: 64 * 32,
            full_size: 128 * 32,
        }
    }

    #[test]
    fn persists_and_reopens_matching_dag() {
        let dir = tempfile::tempdir().unwrap();
        let params = small_params();
        let seed = [11u8; 32];
        let cache = build_cache(params, &seed);

        let built_once = std::sync::atomic::AtomicUsize::new(0);
        let dataset = open_or_build(dir.path(), &seed, params, || {
            built_once.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            build_dataset(&cache, params, 1, None)
        })
        .unwrap();
        assert_eq!(dataset.n_items(), params.full_size as usize / 64);
        assert_eq!(built_once.load(std::sync::atomic::Ordering::SeqCst), 1);

        // Second call should hit the persisted file and never invoke build_fn.
        let dataset2 = open_or_build(dir.path(), &seed, params, || {
            built_once.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            build_dataset(&cache, params, 1, None)
        })
        .unwrap();
        assert_eq!(built_once.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(dataset.get_item(0), dataset2.get_item(0));
    }

    #[test]
    fn corrupt_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let params = small_params();
        let seed = [22u8; 32];
        let path = dag_path(dir.path(), &seed, params);
        fs::write(&path, b"not a real dag file").unwrap();

        let cache = build_cache(params, &seed);
        let dataset = open_or_build(dir.path(), &seed, params, || build_dataset(&cache, params, 1, None)).unwrap();
        assert_eq!(dataset.n_items(), params.full_size as usize / 64);
    }

    #[test]
    fn unwritable_directory_falls_back_to_in_memory() {
        let params = small_params();
        let seed = [33u8; 32];
        let cache = build_cache(params, &seed);
        // A path that cannot exist as a writable directory.
        let bogus_dir = PathBuf::from("/proc/self/nonexistent-ethash-dag-dir/deeper");
        let dataset =
            open_or_build(&bogus_dir, &seed, params, || build_dataset(&cache, params, 1, None)).unwrap();
        assert_eq!(dataset.n_items(), params.full_size as usize / 64);
    }
}
