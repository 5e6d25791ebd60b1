// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies that exist only at the HTTP boundary. The
//! domain types (`CredentialRecord`, `UserRecord`, `AnchorReceipt`, ...) are
//! serialized as they are.
//!
//! ## Model Categories
//!
//! - **Users**: wallet linking
//! - **Credentials**: batch issuance and reconciliation
//! - **Verification**: public hash checks, single and batched
//! - **Health**: liveness and readiness probes

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::chain::{BatchVerifyEntry, BatchVerifyOutcome, VerificationResult};
use crate::credential::ContentHash;
use crate::storage::AttachOutcome;
use crate::workflow::NewCredential;

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkWalletRequest {
    #[schema(example = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")]
    pub wallet_address: String,
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueBatchRequest {
    pub credentials: Vec<NewCredential>,
}

/// Record a transaction hash the ledger already confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub credential_id: String,
    pub tx_hash: String,
    pub outcome: AttachOutcome,
}

// =============================================================================
// Verification
// =============================================================================

/// Check a content hash against the ledger without a stored credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckAnchorRequest {
    pub credential_id: String,
    #[schema(value_type = String, example = "0x5f16f4c7f149ac4f9510d9cf8cf384038ad348b3bcdc01915f95de12df9d1b02")]
    pub content_hash: ContentHash,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchVerifyRequest {
    pub entries: Vec<BatchVerifyEntry>,
    /// Return one item per entry, including failures, instead of dropping them
    #[serde(default)]
    pub detailed: bool,
}

/// One entry of a detailed batch verification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchVerifyItem {
    pub credential_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VerificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchVerifyOutcome> for BatchVerifyItem {
    fn from(outcome: BatchVerifyOutcome) -> Self {
        let (result, error) = match outcome.result {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            credential_id: outcome.credential_id,
            result,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum BatchVerifyResponse {
    Detailed(Vec<BatchVerifyItem>),
    Results(Vec<VerificationResult>),
}

// =============================================================================
// Health
// =============================================================================

/// Simple health check response for liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Credential database
    pub store: String,
    /// Wallet provider reachability ("ok", "unavailable", "no_accounts", "error")
    pub provider: String,
    /// `rpc` or `memory`
    pub backend: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Ledger transactions waiting to be recorded
    pub pending_reconciliations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_item_carries_either_result_or_error() {
        let failed: BatchVerifyItem = BatchVerifyOutcome {
            credential_id: "c1".into(),
            result: Err("RPC error: timeout".into()),
        }
        .into();
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("RPC error: timeout"));

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"credential_id": "c1", "error": "RPC error: timeout"})
        );
    }

    #[test]
    fn batch_request_defaults_to_plain_results() {
        let request: BatchVerifyRequest = serde_json::from_str(
            r#"{"entries":[{"credential_id":"c1","content_hash":"0x5f16f4c7f149ac4f9510d9cf8cf384038ad348b3bcdc01915f95de12df9d1b02"}]}"#,
        )
        .unwrap();
        assert!(!request.detailed);
        assert_eq!(request.entries.len(), 1);
    }
}
