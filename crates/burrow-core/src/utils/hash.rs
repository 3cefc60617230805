//! SHA-256 fingerprints for archive integrity.
//!
//! Fingerprints are rendered as `sha256:<hex>`, the form recorded in lock
//! files.

use crate::error::{BurrowError, BurrowResult};
use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Compute the fingerprint of data
pub fn fingerprint(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{}{}", PREFIX, hex::encode(digest))
}

/// Compute the fingerprint of a file
pub fn fingerprint_file(path: &std::path::Path) -> BurrowResult<String> {
    let data = std::fs::read(path)
        .map_err(|e| BurrowError::io(format!("Failed to read file: {}", path.display()), e))?;
    Ok(fingerprint(&data))
}

/// Check that a string is a well-formed fingerprint
pub fn is_fingerprint(value: &str) -> bool {
    value
        .strip_prefix(PREFIX)
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Verify data against an expected fingerprint
pub fn verify_fingerprint(package: &str, data: &[u8], expected: &str) -> BurrowResult<()> {
    let actual = fingerprint(data);
    if actual == expected {
        Ok(())
    } else {
        Err(BurrowError::IntegrityFailure {
            package: package.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
