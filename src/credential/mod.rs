// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Content
//!
//! Everything that decides *what* gets anchored:
//!
//! - `encoder` - canonical serialization and the keccak-256 content hash
//! - `validation` - input rules applied before a credential is created

pub mod encoder;
pub mod validation;

pub use encoder::{chain_credential_id, canonical_timestamp, ContentHash, CredentialFields, EncodeError};
pub use validation::ValidationError;
