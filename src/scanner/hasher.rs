//! Digest algorithms and content hash values.
//!
//! # Overview
//! A [`Hasher`] is an incremental digest state over one of the supported
//! [`HashAlgorithm`]s. Both produce 32-byte digests, so the rest of the
//! crate only ever deals with [`Hash`].
//!
//! A [`ContentHash`] pairs a digest with the [`NodeKind`] it was computed
//! for, so a file and a symlink whose contents happen to coincide never
//! land in the same duplicate group.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::NodeKind;

/// A 32-byte content digest.
pub type Hash = [u8; 32];

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (default)
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => f.write_str("blake3"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Incremental digest state.
pub enum Hasher {
    /// BLAKE3 state
    Blake3(Box<blake3::Hasher>),
    /// SHA-256 state
    Sha256(sha2::Sha256),
}

impl Hasher {
    /// Start a new digest.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
        }
    }

    /// Feed bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Finish the digest.
    #[must_use]
    pub fn finalize(self) -> Hash {
        match self {
            Self::Blake3(h) => *h.finalize().as_bytes(),
            Self::Sha256(h) => h.finalize().into(),
        }
    }
}

/// Convert a hash to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Digest of a node's content tagged with the node's kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash {
    /// Content digest
    pub digest: Hash,
    /// Kind of node the digest was computed for
    pub kind: NodeKind,
}

impl ContentHash {
    /// Create a content hash.
    #[must_use]
    pub fn new(digest: Hash, kind: NodeKind) -> Self {
        Self { digest, kind }
    }

    /// Digest as hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.digest_hex(), self.kind)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
