use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;
use crate::id::{is_valid_id, random_id};

/// A validated blob identifier: exactly 12 characters of `[A-Za-z0-9]`.
///
/// The identifier doubles as the on-disk file name, so anything that gets
/// past [`BlobId::parse`] is safe to join onto a storage directory.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobId(String);

impl BlobId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(random_id())
    }

    /// Parse an identifier, rejecting anything outside `^[A-Za-z0-9]{12}$`.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if is_valid_id(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(StorageError::InvalidId(s.escape_default().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.0)
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BlobId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
