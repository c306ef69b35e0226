//! CRC32 checksums for log records
//!
//! Every record carries a checksum over all of its preceding bytes.
//! Any mismatch is corruption.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Returns `true` if `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"orders";
        assert_eq!(compute_checksum(data), compute_checksum(data));
    }

    #[test]
    fn test_single_bit_flip_detected() {
        let data = b"queue record payload".to_vec();
        let checksum = compute_checksum(&data);

        let mut flipped = data.clone();
        flipped[3] ^= 0x01;

        assert!(verify_checksum(&data, checksum));
        assert!(!verify_checksum(&flipped, checksum));
    }
}
