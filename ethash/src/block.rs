use primitive_types::U256;

/// The contract a block header must satisfy to be verified or mined
/// against. Deliberately minimal: this crate never constructs or serializes
/// a block, it only reads these five fields off one.
pub trait PowBlock {
    /// Block height; determines the epoch.
    fn number(&self) -> u64;

    /// Keccak-256 of the header with the nonce and mix digest fields
    /// excluded, per §2.
    fn hash_no_nonce(&self) -> [u8; 32];

    fn nonce(&self) -> u64;

    /// The mix digest the block claims hashimoto produced.
    fn mix_digest(&self) -> [u8; 32];

    fn difficulty(&self) -> U256;
}
