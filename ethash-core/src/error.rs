use thiserror::Error;

/// Errors surfaced by cache/DAG construction and epoch arithmetic.
#[derive(Error, Debug)]
pub enum CoreError {
    /// `block_number` is at or beyond `EPOCH_LENGTH * 2048`.
    #[error("block number {block_number} is out of range (limit is {limit})")]
    BlockOutOfRange { block_number: u64, limit: u64 },

    /// Allocation or I/O failure while building a cache or DAG.
    #[error("construction failed: {0}")]
    ConstructionFailed(String),
}
