//! Shared helpers for the Ethash workspace: hex (de)serialization errors and
//! the big-endian 256-bit target/difficulty arithmetic used by both mining
//! and verification.

use primitive_types::U256;
use thiserror::Error;

/// Errors surfaced by the hex helpers below.
#[derive(Error, Debug)]
pub enum UtilError {
    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid length: expected {expected} bytes, got {found}")]
    InvalidLength { expected: usize, found: usize },
}

/// Decodes a hex string into bytes.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, UtilError> {
    Ok(hex::decode(s.trim_start_matches("0x"))?)
}

/// Encodes bytes as a lowercase hex string, no `0x` prefix.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string into a fixed-size array, erroring on length mismatch.
pub fn hex_to_array<const N: usize>(s: &str) -> Result<[u8; N], UtilError> {
    let bytes = hex_to_bytes(s)?;
    if bytes.len() != N {
        return Err(UtilError::InvalidLength {
            expected: N,
            found: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Interprets a 32-byte buffer as a big-endian unsigned 256-bit integer, the
/// representation Ethash's `result` and block `difficulty`/target are
/// compared in.
pub fn be_bytes_to_u256(bytes: &[u8; 32]) -> U256 {
    U256::from_big_endian(bytes)
}

/// Writes a `U256` out as 32 big-endian bytes.
pub fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// `floor(2^256 / divisor)` without overflowing a `U256`: computed from
/// `floor(U256::MAX / divisor)` and its remainder, since `U256::MAX` is
/// `2^256 - 1`.
///
/// `divisor == 1` is special-cased: the true result, `2^256`, does not fit
/// in a `U256` at all. Since a target of `2^256` and a target of
/// `U256::MAX` both mean "every 256-bit hash qualifies", `U256::MAX` is the
/// correct representable stand-in — not an approximation of it.
fn floor_two_pow_256_over(divisor: U256) -> U256 {
    if divisor.is_zero() || divisor == U256::one() {
        return U256::MAX;
    }
    let quotient = U256::MAX / divisor;
    let remainder = U256::MAX % divisor;
    if remainder + U256::one() == divisor {
        quotient + U256::one()
    } else {
        quotient
    }
}

/// `floor(2^256 / difficulty)`, the PoW target a `result` must not exceed.
///
/// A `difficulty` of zero is nonsensical for a real chain; by convention
/// (matching go-ethereum/parity, which never construct such a block) it
/// maps to the maximal target, i.e. every hash passes.
pub fn difficulty_to_target(difficulty: U256) -> U256 {
    floor_two_pow_256_over(difficulty)
}

/// The difficulty a hash exactly at `result` would satisfy: the inverse of
/// [`difficulty_to_target`], since the relation is symmetric. Used to
/// derive a difficulty to test against from a hashimoto result actually
/// produced, e.g. in tests.
pub fn target_to_difficulty(result: &[u8; 32]) -> U256 {
    floor_two_pow_256_over(be_bytes_to_u256(result))
}

/// `true` iff the PoW `result` meets the difficulty target (`result <= target`).
pub fn meets_target(result: &[u8; 32], difficulty: U256) -> bool {
    be_bytes_to_u256(result) <= difficulty_to_target(difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        let hex = bytes_to_hex(&bytes);
        assert_eq!(hex_to_bytes(&hex).unwrap(), bytes);
    }

    #[test]
    fn hex_to_array_checks_length() {
        let err = hex_to_array::<32>("deadbeef").unwrap_err();
        assert!(matches!(err, UtilError::InvalidLength { expected: 32, found: 4 }));
    }

    #[test]
    fn difficulty_one_has_maximal_target() {
        assert_eq!(difficulty_to_target(U256::one()), U256::MAX);
    }

    #[test]
    fn difficulty_monotonicity() {
        let low = U256::from(10u64);
        let high = U256::from(1_000_000u64);
        assert!(difficulty_to_target(high) < difficulty_to_target(low));
    }

    #[test]
    fn power_of_two_difficulty_rounds_up_by_one() {
        // difficulty = 2 divides 2^256 exactly; verifies the +1 correction path.
        let target = difficulty_to_target(U256::from(2u64));
        // floor(2^256/2) = 2^255, one more than floor((2^256-1)/2).
        assert_eq!(target, U256::MAX / U256::from(2u64) + U256::one());
    }

    #[test]
    fn meets_target_respects_difficulty_ordering() {
        let result = be_bytes_to_u256(&[0u8; 32]);
        assert_eq!(result, U256::zero());
        assert!(meets_target(&[0u8; 32], U256::from(7u64)));
    }
}
