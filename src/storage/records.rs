// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent record types and the credential lifecycle.
//!
//! ```text
//! Created --attach tx--> Anchored --revoke--> Revoked
//! ```
//!
//! A credential is never deleted. The transaction hash is written exactly
//! once; re-attaching the same hash is a no-op, a different one is a conflict.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::credential::{ContentHash, CredentialFields, ValidationError};

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Institution,
    Employer,
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "institution" => Ok(UserRole::Institution),
            "employer" => Ok(UserRole::Employer),
            other => Err(ValidationError::InvalidUserType(other.to_string())),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Student => write!(f, "student"),
            UserRole::Institution => write!(f, "institution"),
            UserRole::Employer => write!(f, "employer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserRecord {
    /// Auth subject
    pub id: String,
    /// Lowercased email
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Credentials
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Created,
    Anchored,
    Revoked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachOutcome {
    /// The hash was written by this call
    Attached,
    /// The same hash was already recorded; nothing changed
    AlreadyAttached,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("credential {credential_id} is already anchored by transaction {existing}")]
    ConflictingTransaction {
        credential_id: String,
        existing: String,
    },

    #[error("credential {0} is not anchored")]
    NotAnchored(String),

    #[error("credential {0} is already revoked")]
    AlreadyRevoked(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CredentialRecord {
    pub id: String,
    pub issuer_id: String,
    pub recipient_id: String,
    pub title: String,
    pub description: String,
    /// Timestamp committed to by the content hash
    pub issue_date: DateTime<Utc>,
    /// Hash computed at creation; informational, verification recomputes it
    #[schema(value_type = String)]
    pub content_hash: ContentHash,
    pub metadata_uri: String,
    pub status: CredentialStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    /// A fresh, not yet anchored credential.
    pub fn new_created(
        id: impl Into<String>,
        fields: &CredentialFields,
        content_hash: ContentHash,
        metadata_uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            issuer_id: fields.issuer.clone(),
            recipient_id: fields.recipient.clone(),
            title: fields.title.clone(),
            description: fields.description.clone(),
            issue_date: fields.timestamp,
            content_hash,
            metadata_uri: metadata_uri.into(),
            status: CredentialStatus::Created,
            tx_hash: None,
            created_at: now,
            updated_at: now,
            revoked_at: None,
        }
    }

    /// Semantic fields to recompute the content hash from.
    pub fn fields(&self) -> CredentialFields {
        CredentialFields::new(
            self.issuer_id.clone(),
            self.recipient_id.clone(),
            self.title.clone(),
            self.description.clone(),
            self.issue_date,
        )
    }

    pub fn is_anchored(&self) -> bool {
        self.tx_hash.is_some()
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.issuer_id == user_id || self.recipient_id == user_id
    }

    pub fn attach_transaction(
        &mut self,
        tx_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<AttachOutcome, TransitionError> {
        match self.tx_hash.as_deref() {
            Some(existing) if existing.eq_ignore_ascii_case(tx_hash) => {
                Ok(AttachOutcome::AlreadyAttached)
            }
            Some(existing) => Err(TransitionError::ConflictingTransaction {
                credential_id: self.id.clone(),
                existing: existing.to_string(),
            }),
            None => {
                self.tx_hash = Some(tx_hash.to_string());
                self.status = CredentialStatus::Anchored;
                self.updated_at = now;
                Ok(AttachOutcome::Attached)
            }
        }
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.status {
            CredentialStatus::Anchored => {
                self.status = CredentialStatus::Revoked;
                self.revoked_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            CredentialStatus::Created => Err(TransitionError::NotAnchored(self.id.clone())),
            CredentialStatus::Revoked => Err(TransitionError::AlreadyRevoked(self.id.clone())),
        }
    }
}

// =============================================================================
// Verifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

/// Off-chain audit entry for one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VerificationRecord {
    pub id: String,
    pub credential_id: String,
    pub verifier_id: String,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Transaction hash awaiting attachment to its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PendingAnchor {
    pub credential_id: String,
    pub tx_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> CredentialRecord {
        let fields = CredentialFields::new(
            "inst-1",
            "stu-1",
            "BSc Physics",
            "",
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        );
        let hash = fields.content_hash().unwrap();
        CredentialRecord::new_created("cred-1", &fields, hash, "urn:credential:cred-1")
    }

    #[test]
    fn fields_round_trip_to_the_same_hash() {
        let record = created();
        assert_eq!(record.fields().content_hash().unwrap(), record.content_hash);
    }

    #[test]
    fn attach_is_idempotent_for_the_same_hash() {
        let mut record = created();
        assert_eq!(
            record.attach_transaction("0xabc", Utc::now()),
            Ok(AttachOutcome::Attached)
        );
        assert_eq!(record.status, CredentialStatus::Anchored);
        assert_eq!(
            record.attach_transaction("0xABC", Utc::now()),
            Ok(AttachOutcome::AlreadyAttached)
        );
        assert!(matches!(
            record.attach_transaction("0xdef", Utc::now()),
            Err(TransitionError::ConflictingTransaction { .. })
        ));
        assert_eq!(record.tx_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn revoke_requires_anchoring_and_is_terminal() {
        let mut record = created();
        assert_eq!(
            record.revoke(Utc::now()),
            Err(TransitionError::NotAnchored("cred-1".into()))
        );

        record.attach_transaction("0xabc", Utc::now()).unwrap();
        record.revoke(Utc::now()).unwrap();
        assert_eq!(record.status, CredentialStatus::Revoked);
        assert!(record.revoked_at.is_some());
        assert_eq!(
            record.revoke(Utc::now()),
            Err(TransitionError::AlreadyRevoked("cred-1".into()))
        );

        // Re-running reconciliation after revocation changes nothing.
        assert_eq!(
            record.attach_transaction("0xabc", Utc::now()),
            Ok(AttachOutcome::AlreadyAttached)
        );
        assert_eq!(record.status, CredentialStatus::Revoked);
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Institution".parse::<UserRole>(), Ok(UserRole::Institution));
        assert_eq!(UserRole::Employer.to_string(), "employer");
        assert!("admin".parse::<UserRole>().is_err());
    }
}
