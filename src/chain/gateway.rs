// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The boundary between the service and the credential registry.
//!
//! Writes (`issue`, `issue_batch`, institution registration) are submitted
//! once and waited on until confirmed. They are not idempotent and are never
//! retried here. Reads (`verify`, `institution`) are side-effect free and may
//! be retried by callers on [`GatewayError::Rpc`].

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::warn;

use crate::credential::{chain_credential_id, ContentHash};

use super::types::{
    AnchorReceipt, AnchorRequest, BatchVerifyEntry, BatchVerifyOutcome, Institution,
    ProviderContext, VerificationResult,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No wallet provider is configured. Raised before any network call.
    #[error("wallet provider is required but not configured")]
    ProviderUnavailable,

    #[error("wallet provider exposes no accounts")]
    NoAccounts,

    #[error("provider is on chain {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    /// The account holder declined to sign. Message is the provider's own.
    #[error("{0}")]
    UserRejected(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("transaction {0} failed on-chain")]
    TransactionFailed(String),

    #[error("provider account or network changed during the operation")]
    ContextChanged,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport or node failure.
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl GatewayError {
    /// Only transport failures are worth retrying, and only for reads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Rpc(_))
    }
}

/// Sort a provider error message into the gateway taxonomy.
///
/// EIP-1193 code 4001 and the usual wallet phrasings mean the user declined;
/// anything mentioning a revert carries the contract's reason.
pub fn classify_rpc_error(message: &str) -> GatewayError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("code: 4001")
        || lower.contains("\"code\":4001")
    {
        GatewayError::UserRejected(message.to_string())
    } else if lower.contains("revert") {
        GatewayError::Reverted(message.to_string())
    } else {
        GatewayError::Rpc(message.to_string())
    }
}

/// Local checks applied to every anchor request before it is submitted.
pub fn validate_anchor_request(request: &AnchorRequest) -> Result<(), GatewayError> {
    if request.credential_id.trim().is_empty() {
        return Err(GatewayError::InvalidInput("credential id is empty".into()));
    }
    if request.recipient.trim().is_empty() {
        return Err(GatewayError::InvalidInput("recipient is empty".into()));
    }
    Ok(())
}

/// Checks a batch as a unit: non-empty, every entry valid, no id twice.
pub fn validate_batch(requests: &[AnchorRequest]) -> Result<(), GatewayError> {
    if requests.is_empty() {
        return Err(GatewayError::InvalidInput("batch is empty".into()));
    }

    let mut keys = HashSet::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        validate_anchor_request(request).map_err(|e| match e {
            GatewayError::InvalidInput(reason) => {
                GatewayError::InvalidInput(format!("entry {index}: {reason}"))
            }
            other => other,
        })?;
        if !keys.insert(chain_credential_id(&request.credential_id)) {
            return Err(GatewayError::InvalidInput(format!(
                "entry {index}: duplicate credential id {}",
                request.credential_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Human-readable backend name for health output.
    fn backend(&self) -> &'static str;

    /// Request accounts from the provider and return the active one.
    async fn connect(&self) -> Result<String, GatewayError>;

    /// Current chain id and exposed accounts.
    async fn provider_context(&self) -> Result<ProviderContext, GatewayError>;

    async fn register_institution(
        &self,
        name: &str,
        accreditation_proof: &str,
        required_verifiers: u8,
    ) -> Result<AnchorReceipt, GatewayError>;

    async fn verify_institution(&self, institution: &str) -> Result<AnchorReceipt, GatewayError>;

    /// `Ok(None)` when the address has never registered.
    async fn institution(&self, address: &str) -> Result<Option<Institution>, GatewayError>;

    /// Anchor one credential hash. Not idempotent.
    async fn issue(&self, request: &AnchorRequest) -> Result<AnchorReceipt, GatewayError>;

    /// Anchor several hashes in one transaction. Any invalid entry rejects
    /// the whole batch before anything is written.
    async fn issue_batch(&self, requests: &[AnchorRequest]) -> Result<AnchorReceipt, GatewayError>;

    async fn verify(
        &self,
        credential_id: &str,
        content_hash: &ContentHash,
    ) -> Result<VerificationResult, GatewayError>;

    /// Verify each entry independently, pairing every input with its outcome.
    async fn verify_batch_detailed(&self, entries: &[BatchVerifyEntry]) -> Vec<BatchVerifyOutcome> {
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = self
                .verify(&entry.credential_id, &entry.content_hash)
                .await
                .map_err(|e| e.to_string());
            outcomes.push(BatchVerifyOutcome {
                credential_id: entry.credential_id.clone(),
                result,
            });
        }
        outcomes
    }

    /// Verify each entry independently and return only the ones that could
    /// be queried. Failed entries are dropped, so the output may be shorter
    /// than the input.
    async fn verify_batch(&self, entries: &[BatchVerifyEntry]) -> Vec<VerificationResult> {
        self.verify_batch_detailed(entries)
            .await
            .into_iter()
            .filter_map(|outcome| match outcome.result {
                Ok(result) => Some(result),
                Err(error) => {
                    warn!(
                        credential_id = %outcome.credential_id,
                        error = %error,
                        "Dropping failed entry from batch verification"
                    );
                    None
                }
            })
            .collect()
    }
}
