//! Content fingerprints for corpora and model artefacts.
//!
//! Digests are recorded with every run so a tracked result can be traced
//! back to the exact rows and bytes that produced it.

use sha2::{Digest, Sha256};

/// Incremental SHA-256 hasher producing lowercase hex digests.
#[derive(Clone, Debug, Default)]
pub struct Fingerprint {
    inner: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Feed one field followed by a unit separator so that adjacent fields
    /// cannot run into each other.
    pub fn field(&mut self, value: &str) {
        self.inner.update(value.as_bytes());
        self.inner.update([0x1fu8]);
    }

    /// Finalise and return a 64-character lowercase hex string.
    pub fn finish_hex(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

/// One-shot digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut fp = Fingerprint::new();
    fp.update(bytes);
    fp.finish_hex()
}
