// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain-facing data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::credential::ContentHash;

/// Network the registry contract lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Display name
    pub name: String,
    /// Expected chain id; `None` accepts whatever the provider reports
    pub chain_id: Option<u64>,
    /// JSON-RPC endpoint; `None` means no provider is available
    pub rpc_url: Option<String>,
    /// Block explorer base URL
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
    }
}

/// One credential to anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRequest {
    /// Off-chain credential id (hashed into the registry key)
    pub credential_id: String,
    /// Recipient wallet address, or the recipient's user id when no wallet is linked
    pub recipient: String,
    pub content_hash: ContentHash,
    pub metadata_uri: String,
}

/// Confirmed ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnchorReceipt {
    /// Transaction hash (`0x`-prefixed hex)
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
}

/// What the registry reports for a `(credential id, content hash)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationResult {
    pub credential_id: String,
    /// True iff the supplied hash equals the anchored one
    pub is_valid: bool,
    /// Issuing account, empty when the credential is unknown
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<DateTime<Utc>>,
    pub metadata_uri: String,
}

/// Entry for a batch verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchVerifyEntry {
    pub credential_id: String,
    #[schema(value_type = String, example = "0x5f16f4c7f149ac4f9510d9cf8cf384038ad348b3bcdc01915f95de12df9d1b02")]
    pub content_hash: ContentHash,
}

/// Batch verification entry paired with its own outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVerifyOutcome {
    pub credential_id: String,
    pub result: Result<VerificationResult, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InstitutionStatus {
    Pending,
    Verified,
    Rejected,
}

impl InstitutionStatus {
    /// Map the contract's `uint8` status.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => InstitutionStatus::Verified,
            2 => InstitutionStatus::Rejected,
            _ => InstitutionStatus::Pending,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            InstitutionStatus::Pending => 0,
            InstitutionStatus::Verified => 1,
            InstitutionStatus::Rejected => 2,
        }
    }
}

/// On-chain institution record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Institution {
    pub address: String,
    pub name: String,
    pub status: InstitutionStatus,
    pub accreditation_proof: String,
    /// Accounts that have vouched for this institution
    pub verifiers: Vec<String>,
}

/// Snapshot of the provider's account and network.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderContext {
    pub chain_id: Option<u64>,
    pub accounts: Vec<String>,
}
