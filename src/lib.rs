// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential Anchoring Service
//!
//! Issues academic credentials as keccak-256 content hashes anchored on an
//! EVM credential registry, and keeps the off-chain record reconciled with
//! the ledger transaction that anchored it.
//!
//! ## Modules
//!
//! - `credential` - canonical encoding, content hashing and input validation
//! - `chain` - ledger gateway (JSON-RPC and in-memory backends), provider events
//! - `storage` - embedded redb store and the listing cache
//! - `workflow` - issuance, verification and reconciliation
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - bearer token authentication

pub mod api;
pub mod auth;
pub mod chain;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitoring;
pub mod rate_limit;
pub mod state;
pub mod storage;
pub mod workflow;
