// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chain Gateway
//!
//! Anchoring and verification against the credential registry contract.
//!
//! ## Modules
//!
//! - `gateway` - the `ChainGateway` trait and error taxonomy
//! - `rpc` - JSON-RPC backend (alloy)
//! - `memory` - in-process ledger for development and tests
//! - `events` - account/network change observers
//! - `watcher` - background provider polling
//! - `contract` - registry ABI
//! - `types` - chain-facing data types

pub mod contract;
pub mod events;
pub mod gateway;
pub mod memory;
pub mod rpc;
pub mod types;
pub mod watcher;

pub use events::{EpochGuard, ProviderEvent, ProviderEvents, Subscription};
pub use gateway::{classify_rpc_error, ChainGateway, GatewayError};
pub use memory::InMemoryLedger;
pub use rpc::RpcGateway;
pub use types::*;
pub use watcher::ChainWatcher;
