//! Content hashes and board/user keys.
//!
//! This module provides `ContentHash`, the 32-byte SHA3-256 address of any
//! content object, and the opaque 32-byte `PublicKey`/`SecretKey` types that
//! identify boards and users. The hash is computed over bincode-serialized
//! data, ensuring deterministic addressing.
//!
//! All three types serialize as raw bytes for binary formats (bincode) and as
//! lowercase hex strings for human-readable formats (JSON).

use crate::error::{Result, StateError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Length in bytes of hashes and keys.
pub const KEY_LEN: usize = 32;

/// Hashes raw bytes with SHA3-256.
pub fn hash_data(data: &[u8]) -> [u8; KEY_LEN] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn serialize_fixed<S: Serializer>(
    bytes: &[u8; KEY_LEN],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&hex::encode(bytes))
    } else {
        serializer.serialize_bytes(bytes)
    }
}

fn deserialize_fixed<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<[u8; KEY_LEN], D::Error> {
    struct FixedVisitor;

    impl<'de> serde::de::Visitor<'de> for FixedVisitor {
        type Value = [u8; KEY_LEN];

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("32 bytes or a 64 character hex string")
        }

        fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let bytes = hex::decode(v).map_err(E::custom)?;
            self.visit_bytes(&bytes)
        }

        fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v.len() != KEY_LEN {
                return Err(E::invalid_length(v.len(), &self));
            }
            let mut arr = [0u8; KEY_LEN];
            arr.copy_from_slice(v);
            Ok(arr)
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut arr = [0u8; KEY_LEN];
            for (i, byte) in arr.iter_mut().enumerate() {
                *byte = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
            }
            Ok(arr)
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_str(FixedVisitor)
    } else {
        deserializer.deserialize_bytes(FixedVisitor)
    }
}

fn decode_hex(s: &str, what: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = hex::decode(s)
        .map_err(|_| StateError::invalid_read(format!("Invalid hex string for {}", what)))?;
    if bytes.len() != KEY_LEN {
        return Err(StateError::invalid_read(format!(
            "{} must be exactly {} bytes ({} hex characters)",
            what,
            KEY_LEN,
            KEY_LEN * 2
        )));
    }
    let mut arr = [0u8; KEY_LEN];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// A 32-byte content hash using SHA3-256.
///
/// This is the address of any content object in a snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ContentHash([u8; KEY_LEN]);

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_fixed(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_fixed(deserializer).map(ContentHash)
    }
}

impl ContentHash {
    /// Computes the content hash of serializable data.
    ///
    /// Uses bincode for deterministic serialization, then SHA3-256 for hashing.
    pub fn compute<T: Serialize>(data: &T) -> Result<Self> {
        let serialized = bincode::serialize(data).map_err(|e| {
            StateError::serialization(format!("Failed to serialize for hash: {}", e))
        })?;
        Ok(Self::of_bytes(&serialized))
    }

    /// Hashes already serialized bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hash_data(bytes))
    }

    /// Creates a ContentHash from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Returns hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a ContentHash from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex(s, "ContentHash").map(Self)
    }

    /// Returns a short form of the hash for display (first 8 bytes / 16 hex chars).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}...)", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Public key of a board or a user.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; KEY_LEN]);

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_fixed(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_fixed(deserializer).map(PublicKey)
    }
}

impl PublicKey {
    /// Creates a PublicKey from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Returns hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a PublicKey from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_hex(s, "PublicKey").map(Self)
    }

    /// Returns a short form of the key for display.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", self.short())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Secret key of a board this node can write to.
///
/// The key is only carried around to decide the board's role; it is never
/// serialized or printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Creates a SecretKey from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}
