//! SHA-256 content verification.
//!
//! Validates integrity of downloaded artifact archives before they enter
//! the local cache.

use std::io::Read;
use std::path::Path;

use hotswap_common::error::{HotswapError, Result};
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of a file, returned as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "computing SHA-256 hash");
    let mut file = std::fs::File::open(path).map_err(|e| HotswapError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| HotswapError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Validates that a file matches the expected SHA-256 hash.
///
/// # Errors
///
/// Returns `HotswapError::HashMismatch` if the hashes do not match.
pub fn validate_hash(path: &Path, expected: &str) -> Result<()> {
    let actual = hash_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(HotswapError::HashMismatch {
            resource: path.display().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_known_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data");
        std::fs::write(&path, b"abc").expect("write");
        // Standard test vector for "abc".
        assert_eq!(
            hash_file(&path).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn validate_accepts_matching_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data");
        std::fs::write(&path, b"abc").expect("write");
        let digest = hash_file(&path).expect("hash");
        assert!(validate_hash(&path, &digest).is_ok());
        assert!(validate_hash(&path, &digest.to_uppercase()).is_ok());
    }

    #[test]
    fn validate_rejects_wrong_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data");
        std::fs::write(&path, b"abc").expect("write");
        let result = validate_hash(&path, &"0".repeat(64));
        assert!(matches!(
            result,
            Err(HotswapError::HashMismatch { .. })
        ));
    }

    #[test]
    fn hash_missing_file_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(hash_file(&dir.path().join("missing")).is_err());
    }
}
