// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Workflow
//!
//! Orchestrates the store, the chain gateway and the listing cache.
//!
//! - `service` - the operations exposed through the API
//! - `reconcile` - attaching ledger transactions to stored credentials
//! - `retry` - bounded backoff for idempotent calls

pub mod reconcile;
pub mod retry;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use reconcile::{Reconciler, DEFAULT_RECONCILE_INTERVAL};
pub use retry::{retry_async, RetryPolicy};
pub use service::{
    BatchIssued, CredentialService, CredentialVerification, IssuedCredential, NewCredential,
    NewUser, ReconciliationState, RegisterInstitution, ServiceConfig,
};

use crate::chain::GatewayError;
use crate::credential::{EncodeError, ValidationError};
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One batch entry failed validation; nothing was written.
    #[error("batch entry {index}: {reason}")]
    InvalidBatch { index: usize, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// The caller's profile is not ready for this operation.
    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The ledger write succeeded but the store has not recorded it yet.
    #[error("transaction {tx_hash} is not yet recorded for credential {credential_id}; reconciliation is queued")]
    ReconciliationPending {
        credential_id: String,
        tx_hash: String,
    },

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => WorkflowError::NotFound(what),
            StoreError::AlreadyExists(what) => WorkflowError::Conflict(format!("{what} already exists")),
            StoreError::Transition(e) => WorkflowError::Conflict(e.to_string()),
            other => WorkflowError::Store(other),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
