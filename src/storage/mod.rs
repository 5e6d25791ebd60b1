// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relational Storage Module
//!
//! Off-chain system of record for users, credentials and verifications,
//! persisted in an embedded redb database under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   credentials.redb   # all tables, see `database` for the layout
//! ```
//!
//! ## Important Notes
//!
//! - The credential row is written before the chain call and only gains a
//!   transaction hash afterwards (`attach_transaction`)
//! - `pending_anchors` journals hashes that could not be attached yet
//! - Listings are served through `CredentialCache`

pub mod cache;
pub mod database;
pub mod records;

pub use cache::{listing_key, CredentialCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use database::{CredentialDatabase, CredentialStore, StoreError, StoreResult};
pub use records::{
    AttachOutcome, CredentialRecord, CredentialStatus, PendingAnchor, TransitionError,
    UserRecord, UserRole, VerificationRecord, VerificationStatus,
};
