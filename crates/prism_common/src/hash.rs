//! Content hashing for cache keys and artifact staleness detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of hex characters in the textual form of a hash.
const HEX_LEN: usize = 32;

/// A 128-bit content hash computed using XXH3.
///
/// Two subtrees with the same `ContentHash` are assumed to have identical
/// structure and component state. The hash is the key of every export cache
/// entry and doubles as the "nothing changed" sentinel between runs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_u128(xxhash_rust::xxh3::xxh3_128(data))
    }

    /// Wraps a finished XXH3-128 digest.
    pub fn from_u128(digest: u128) -> Self {
        Self(digest.to_le_bytes())
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when a hash token is not 32 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hash token '{token}': expected {HEX_LEN} hex characters")]
pub struct ParseHashError {
    /// The rejected token.
    pub token: String,
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseHashError {
            token: s.to_string(),
        };
        if s.len() != HEX_LEN || !s.is_ascii() {
            return Err(err());
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        Ok(Self(bytes))
    }
}

/// Hash of an emitted export artifact as it currently exists on disk.
///
/// Kept distinct from [`ContentHash`] so that a source hash can never be
/// compared against an artifact hash by accident.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHash(pub ContentHash);

impl ArtifactHash {
    /// Hashes the raw bytes of an artifact file.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(ContentHash::from_bytes(data))
    }
}

impl fmt::Display for ArtifactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ArtifactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactHash({:02x}{:02x}..)", self.0 .0[0], self.0 .0[1])
    }
}

impl FromStr for ArtifactHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
