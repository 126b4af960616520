//! HDF5 format signature (magic bytes).

use crate::error::FormatError;

/// The 8-byte HDF5 magic signature that opens every superblock.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Offsets at which a superblock may start: 0, then 512 and every power of
/// two after it, bounded by `len`.
fn candidate_offsets(len: usize) -> impl Iterator<Item = usize> {
    core::iter::once(0)
        .chain(core::iter::successors(Some(512usize), |o| o.checked_mul(2)))
        .take_while(move |o| o.saturating_add(HDF5_SIGNATURE.len()) <= len)
}

/// Locate the superblock signature.
///
/// Files with a user block carry the signature at a power-of-two offset;
/// the earliest match wins.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    candidate_offsets(data.len())
        .find(|&o| data[o..o + HDF5_SIGNATURE.len()] == HDF5_SIGNATURE)
        .ok_or(FormatError::SignatureNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_signature_at(len: usize, at: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[at..at + 8].copy_from_slice(&HDF5_SIGNATURE);
        data
    }

    #[test]
    fn signature_at_start() {
        assert_eq!(find_signature(&with_signature_at(64, 0)), Ok(0));
    }

    #[test]
    fn signature_after_user_block() {
        assert_eq!(find_signature(&with_signature_at(1024, 512)), Ok(512));
        assert_eq!(find_signature(&with_signature_at(4096, 2048)), Ok(2048));
    }

    #[test]
    fn signature_at_unaligned_offset_ignored() {
        assert_eq!(
            find_signature(&with_signature_at(1024, 100)),
            Err(FormatError::SignatureNotFound)
        );
    }

    #[test]
    fn short_or_empty_input() {
        assert_eq!(find_signature(&[]), Err(FormatError::SignatureNotFound));
        assert_eq!(
            find_signature(&HDF5_SIGNATURE[..5]),
            Err(FormatError::SignatureNotFound)
        );
    }

    #[test]
    fn earliest_signature_wins() {
        let mut data = with_signature_at(1024, 512);
        data[..8].copy_from_slice(&HDF5_SIGNATURE);
        assert_eq!(find_signature(&data), Ok(0));
    }
}
