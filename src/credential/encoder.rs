// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical credential encoding and content hashing.
//!
//! The content hash is what the registry contract stores. Anyone holding the
//! credential's semantic fields can recompute it, so the serialization must be
//! byte-for-byte stable:
//!
//! - JSON object with the key order `issuer, recipient, title, description, timestamp`
//! - text fields in Unicode NFC
//! - timestamp as RFC 3339 UTC with millisecond precision (`2024-05-01T10:00:00.000Z`)
//!
//! The hash is keccak-256 over the UTF-8 bytes of that JSON.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, B256};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("missing required credential field: {0}")]
    MissingField(&'static str),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),
}

/// 32-byte keccak-256 digest of a credential's canonical encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(B256);

impl ContentHash {
    pub const fn new(digest: B256) -> Self {
        Self(digest)
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl fmt::Display for ContentHash {
    /// `0x`-prefixed lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s.trim())
            .map(Self)
            .map_err(|_| EncodeError::InvalidHash(s.to_string()))
    }
}

impl From<B256> for ContentHash {
    fn from(digest: B256) -> Self {
        Self(digest)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The semantic fields a content hash commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFields {
    pub issuer: String,
    pub recipient: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Wire shape of the canonical encoding. Field order here IS the key order.
#[derive(Serialize)]
struct CanonicalCredential {
    issuer: String,
    recipient: String,
    title: String,
    description: String,
    timestamp: String,
}

/// Render a timestamp the way the canonical encoding expects it.
///
/// Sub-millisecond precision is dropped, so two instants within the same
/// millisecond hash identically.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Registry key for a credential: keccak-256 of the UTF-8 credential id.
pub fn chain_credential_id(credential_id: &str) -> B256 {
    keccak256(credential_id.as_bytes())
}

fn nfc(value: &str) -> String {
    value.nfc().collect()
}

impl CredentialFields {
    pub fn new(
        issuer: impl Into<String>,
        recipient: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            recipient: recipient.into(),
            title: title.into(),
            description: description.into(),
            timestamp,
        }
    }

    /// Reject blank required fields. `description` may be empty.
    pub fn check_required(&self) -> Result<(), EncodeError> {
        if self.issuer.trim().is_empty() {
            return Err(EncodeError::MissingField("issuer"));
        }
        if self.recipient.trim().is_empty() {
            return Err(EncodeError::MissingField("recipient"));
        }
        if self.title.trim().is_empty() {
            return Err(EncodeError::MissingField("title"));
        }
        Ok(())
    }

    /// Canonical UTF-8 bytes the content hash is computed over.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        self.check_required()?;

        let canonical = CanonicalCredential {
            issuer: nfc(&self.issuer),
            recipient: nfc(&self.recipient),
            title: nfc(&self.title),
            description: nfc(&self.description),
            timestamp: canonical_timestamp(&self.timestamp),
        };

        serde_json::to_vec(&canonical).map_err(|e| EncodeError::Serialization(e.to_string()))
    }

    pub fn content_hash(&self) -> Result<ContentHash, EncodeError> {
        let bytes = self.canonical_bytes()?;
        Ok(ContentHash(keccak256(&bytes)))
    }
}
