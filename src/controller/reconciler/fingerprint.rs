//! # Fingerprints
//!
//! SHA-256 digests of secret values, used only for equality comparison.
//!
//! A [`Fingerprint`] never prints its full digest: `Debug` and `Display` show a
//! short masked prefix so a fingerprint that ends up in a log line cannot be used
//! to confirm a guessed credential.

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of digest bytes shown by the masked representation
const VISIBLE_PREFIX_BYTES: usize = 4;

/// Fixed-length digest of a single secret value
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Masked form: `sha256:` plus the first few hex digits
    #[must_use]
    pub fn masked(&self) -> String {
        let prefix: String = self.0[..VISIBLE_PREFIX_BYTES]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        format!("sha256:{prefix}…")
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.masked())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Compute the fingerprint of a value. Total and deterministic.
#[must_use]
pub fn fingerprint(value: &[u8]) -> Fingerprint {
    Fingerprint(Sha256::digest(value).into())
}
