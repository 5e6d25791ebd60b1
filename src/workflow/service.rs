// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Service
//!
//! The operations behind the API. Each issuance follows the same order:
//!
//! 1. validate input and resolve the recipient
//! 2. compute the content hash and store the credential as `created`
//! 3. anchor the hash on the ledger (one attempt, never retried)
//! 4. attach the transaction hash through the [`Reconciler`]
//!
//! A failure in step 3 leaves the credential `created` and surfaces the
//! gateway error. A failure in step 4 does not fail the call: the result
//! reports the reconciliation as pending so the caller does not submit the
//! ledger write a second time.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use alloy::primitives::B256;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chain::{
    AnchorReceipt, AnchorRequest, BatchVerifyEntry, BatchVerifyOutcome, ChainGateway,
    GatewayError, Institution, VerificationResult,
};
use crate::credential::validation::{
    normalize_email, parse_wallet_address, sanitize_input, validate_description, validate_email,
    validate_title,
};
use crate::credential::{ContentHash, CredentialFields, ValidationError};
use crate::storage::{
    listing_key, AttachOutcome, CredentialCache, CredentialRecord, CredentialStatus,
    CredentialStore, UserRecord, UserRole, VerificationRecord, VerificationStatus,
};

use super::reconcile::Reconciler;
use super::retry::{retry_async, RetryPolicy};
use super::{WorkflowError, WorkflowResult};

pub const DEFAULT_METADATA_BASE_URI: &str = "urn:credential:";
pub const DEFAULT_REQUIRED_VERIFIERS: u8 = 3;

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    #[schema(example = "student")]
    pub user_type: UserRole,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCredential {
    /// Email of a registered recipient
    pub recipient_email: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterInstitution {
    pub name: String,
    pub accreditation_proof: String,
    /// Vouches needed before the institution counts as verified (default 3)
    #[serde(default)]
    pub required_verifiers: Option<u8>,
}

// =============================================================================
// Outputs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationState {
    /// The transaction hash is recorded on the credential
    Reconciled,
    /// Anchored on the ledger; the store update is queued
    Pending,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedCredential {
    pub credential: CredentialRecord,
    pub receipt: AnchorReceipt,
    pub reconciliation: ReconciliationState,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchIssued {
    pub credentials: Vec<CredentialRecord>,
    pub receipt: AnchorReceipt,
    /// Ids whose transaction hash is not recorded yet
    pub pending_reconciliation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CredentialVerification {
    pub credential_id: String,
    /// Issuing user; the ledger reports the signing account instead
    pub issuer_id: String,
    /// Anchored, hash matches the ledger, and not revoked
    pub is_valid: bool,
    pub status: CredentialStatus,
    /// Hash recomputed from the stored fields
    #[schema(value_type = String)]
    pub content_hash: ContentHash,
    /// What the ledger reported; absent when the credential was never anchored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<VerificationResult>,
    pub verification_id: String,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Prefix for per-credential metadata URIs
    pub metadata_base_uri: String,
    /// Policy for idempotent ledger reads
    pub read_retry: RetryPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            metadata_base_uri: DEFAULT_METADATA_BASE_URI.to_string(),
            read_retry: RetryPolicy::default(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Credential draft that passed validation but is not stored yet.
struct Draft {
    record: CredentialRecord,
    request: AnchorRequest,
}

pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    gateway: Arc<dyn ChainGateway>,
    cache: Arc<CredentialCache>,
    reconciler: Arc<Reconciler>,
    config: ServiceConfig,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        gateway: Arc<dyn ChainGateway>,
        cache: Arc<CredentialCache>,
        reconciler: Arc<Reconciler>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            cache,
            reconciler,
            config,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ChainGateway> {
        &self.gateway
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn register_user(&self, user_id: &str, input: NewUser) -> WorkflowResult<UserRecord> {
        validate_email(&input.email)?;
        let full_name = sanitize_input(&input.full_name);
        if full_name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let wallet_address = input
            .wallet_address
            .as_deref()
            .map(|raw| parse_wallet_address(raw).map(|address| address.to_checksum(None)))
            .transpose()?;

        let user = UserRecord {
            id: user_id.to_string(),
            email: normalize_email(&input.email),
            full_name,
            role: input.user_type,
            wallet_address,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user)?;

        info!(user_id, role = %user.role, "User registered");
        Ok(user)
    }

    pub fn current_user(&self, user_id: &str) -> WorkflowResult<UserRecord> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("user {user_id}")))
    }

    pub fn link_wallet(&self, user_id: &str, wallet_address: &str) -> WorkflowResult<UserRecord> {
        let address = parse_wallet_address(wallet_address)?;
        let user = self
            .store
            .set_wallet_address(user_id, &address.to_checksum(None))?;
        info!(user_id, wallet = %address, "Wallet linked");
        Ok(user)
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    pub async fn issue_credential(
        &self,
        issuer_id: &str,
        input: NewCredential,
    ) -> WorkflowResult<IssuedCredential> {
        let issuer = self.authorize_issuer(issuer_id)?;
        let Draft { record, request } = self.draft(&issuer, input)?;

        self.store.insert_credential(&record)?;
        self.invalidate_listings(&record);

        let receipt = match self.gateway.issue(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(credential_id = %record.id, error = %e, "Anchoring failed, credential stays created");
                return Err(e.into());
            }
        };

        let reconciliation = self.settle(&record.id, &receipt.tx_hash).await;
        let credential = self.reload(record);

        info!(
            credential_id = %credential.id,
            tx_hash = %receipt.tx_hash,
            ?reconciliation,
            "Credential issued"
        );
        Ok(IssuedCredential {
            credential,
            receipt,
            reconciliation,
        })
    }

    /// Submit a stored `created` credential to the ledger.
    ///
    /// Refused when the credential already has a transaction, recorded or
    /// awaiting reconciliation.
    pub async fn anchor_credential(
        &self,
        issuer_id: &str,
        credential_id: &str,
    ) -> WorkflowResult<IssuedCredential> {
        self.authorize_issuer(issuer_id)?;
        let record = self.owned_credential(issuer_id, credential_id)?;

        if let Some(tx_hash) = &record.tx_hash {
            return Err(WorkflowError::Conflict(format!(
                "credential {credential_id} is already anchored by transaction {tx_hash}"
            )));
        }
        if let Some(tx_hash) = self.reconciler.pending_for(credential_id) {
            return Err(WorkflowError::ReconciliationPending {
                credential_id: credential_id.to_string(),
                tx_hash,
            });
        }

        let content_hash = record.fields().content_hash()?;
        let request = AnchorRequest {
            credential_id: record.id.clone(),
            recipient: self.ledger_recipient(&record.recipient_id)?,
            content_hash,
            metadata_uri: record.metadata_uri.clone(),
        };

        let receipt = self.gateway.issue(&request).await?;
        let reconciliation = self.settle(&record.id, &receipt.tx_hash).await;
        let credential = self.reload(record);

        info!(credential_id, tx_hash = %receipt.tx_hash, "Stored credential anchored");
        Ok(IssuedCredential {
            credential,
            receipt,
            reconciliation,
        })
    }

    /// Every entry is validated before anything is stored or submitted.
    pub async fn issue_batch(
        &self,
        issuer_id: &str,
        inputs: Vec<NewCredential>,
    ) -> WorkflowResult<BatchIssued> {
        let issuer = self.authorize_issuer(issuer_id)?;
        if inputs.is_empty() {
            return Err(WorkflowError::InvalidBatch {
                index: 0,
                reason: "batch is empty".into(),
            });
        }

        let mut drafts = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let draft = self
                .draft(&issuer, input)
                .map_err(|e| WorkflowError::InvalidBatch {
                    index,
                    reason: e.to_string(),
                })?;
            drafts.push(draft);
        }

        for draft in &drafts {
            self.store.insert_credential(&draft.record)?;
            self.invalidate_listings(&draft.record);
        }

        let requests: Vec<AnchorRequest> = drafts.iter().map(|d| d.request.clone()).collect();
        let receipt = match self.gateway.issue_batch(&requests).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(count = requests.len(), error = %e, "Batch anchoring failed, credentials stay created");
                return Err(e.into());
            }
        };

        let mut credentials = Vec::with_capacity(drafts.len());
        let mut pending_reconciliation = Vec::new();
        for Draft { record, .. } in drafts {
            if self.settle(&record.id, &receipt.tx_hash).await == ReconciliationState::Pending {
                pending_reconciliation.push(record.id.clone());
            }
            credentials.push(self.reload(record));
        }

        info!(
            count = credentials.len(),
            tx_hash = %receipt.tx_hash,
            pending = pending_reconciliation.len(),
            "Credential batch issued"
        );
        Ok(BatchIssued {
            credentials,
            receipt,
            pending_reconciliation,
        })
    }

    /// Re-apply a transaction hash to its credential. Never writes the ledger.
    ///
    /// The hash is accepted when it is the one queued for the credential or
    /// already recorded on it. Otherwise the ledger must hold the
    /// credential's content hash, so a credential that was never anchored
    /// cannot be marked anchored.
    pub async fn reconcile(
        &self,
        issuer_id: &str,
        credential_id: &str,
        tx_hash: &str,
    ) -> WorkflowResult<AttachOutcome> {
        let credential = self.owned_credential(issuer_id, credential_id)?;
        let tx_hash = parse_tx_hash(tx_hash)?;

        let known = self
            .reconciler
            .pending_for(credential_id)
            .into_iter()
            .chain(credential.tx_hash.clone())
            .any(|candidate| parse_tx_hash(&candidate).is_ok_and(|hash| hash == tx_hash));
        if !known {
            let content_hash = credential.fields().content_hash()?;
            let anchored = self.check_anchor(credential_id, &content_hash).await?;
            if !anchored.is_valid {
                warn!(credential_id, %tx_hash, "Reconcile refused, credential is not on the ledger");
                return Err(WorkflowError::Precondition(format!(
                    "credential {credential_id} is not anchored on the ledger"
                )));
            }
        }

        let tx_hash = tx_hash.to_string();
        match self.reconciler.reconcile(credential_id, &tx_hash).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_transient() => Err(WorkflowError::ReconciliationPending {
                credential_id: credential_id.to_string(),
                tx_hash,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn revoke_credential(
        &self,
        issuer_id: &str,
        credential_id: &str,
    ) -> WorkflowResult<CredentialRecord> {
        self.owned_credential(issuer_id, credential_id)?;
        let revoked = self.store.revoke_credential(credential_id)?;
        self.invalidate_listings(&revoked);
        info!(credential_id, issuer_id, "Credential revoked");
        Ok(revoked)
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Check a stored credential against the ledger and record the attempt.
    pub async fn verify_credential(
        &self,
        verifier_id: &str,
        credential_id: &str,
    ) -> WorkflowResult<CredentialVerification> {
        let verifier = self.current_user(verifier_id)?;
        if verifier.role != UserRole::Employer {
            return Err(WorkflowError::Forbidden(
                "only employers can verify credentials".into(),
            ));
        }

        let credential = self
            .store
            .get_credential(credential_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("credential {credential_id}")))?;
        let content_hash = credential.fields().content_hash()?;

        // A queued reconciliation means the ledger already has it.
        let ledger = if credential.is_anchored() || self.reconciler.pending_for(credential_id).is_some() {
            Some(self.check_anchor(credential_id, &content_hash).await?)
        } else {
            None
        };

        let is_valid = credential.status != CredentialStatus::Revoked
            && ledger.as_ref().is_some_and(|result| result.is_valid);

        let now = Utc::now();
        let record = VerificationRecord {
            id: Uuid::new_v4().to_string(),
            credential_id: credential_id.to_string(),
            verifier_id: verifier_id.to_string(),
            status: if is_valid {
                VerificationStatus::Verified
            } else {
                VerificationStatus::Rejected
            },
            verified_at: Some(now),
            created_at: now,
        };
        self.store.insert_verification(&record)?;

        info!(credential_id, verifier_id, is_valid, "Credential verified");
        Ok(CredentialVerification {
            credential_id: credential_id.to_string(),
            issuer_id: credential.issuer_id.clone(),
            is_valid,
            status: credential.status,
            content_hash,
            ledger,
            verification_id: record.id,
        })
    }

    /// Ask the ledger whether `content_hash` is the one anchored for this id.
    pub async fn check_anchor(
        &self,
        credential_id: &str,
        content_hash: &ContentHash,
    ) -> WorkflowResult<VerificationResult> {
        let result = self
            .read_with_retry("verify", || self.gateway.verify(credential_id, content_hash))
            .await?;
        Ok(result)
    }

    /// Entries that could not be queried are dropped from the result.
    pub async fn verify_batch(
        &self,
        entries: &[BatchVerifyEntry],
    ) -> WorkflowResult<Vec<VerificationResult>> {
        let results = self
            .verify_batch_detailed(entries)
            .await?
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
            .collect();
        Ok(results)
    }

    /// One outcome per entry, in input order. Each read is retried like
    /// [`check_anchor`](Self::check_anchor).
    pub async fn verify_batch_detailed(
        &self,
        entries: &[BatchVerifyEntry],
    ) -> WorkflowResult<Vec<BatchVerifyOutcome>> {
        Self::check_batch_size(entries)?;
        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = self
                .read_with_retry("verify", || {
                    self.gateway.verify(&entry.credential_id, &entry.content_hash)
                })
                .await
                .map_err(|e| e.to_string());
            outcomes.push(BatchVerifyOutcome {
                credential_id: entry.credential_id.clone(),
                result,
            });
        }
        Ok(outcomes)
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Everything the user issued or received, newest first.
    pub fn list_credentials(&self, user_id: &str) -> WorkflowResult<Vec<CredentialRecord>> {
        let credentials = self
            .cache
            .get_or_try_insert_with(&listing_key(user_id), || {
                let mut seen = HashSet::new();
                let mut all: Vec<CredentialRecord> = self
                    .store
                    .list_by_issuer(user_id)?
                    .into_iter()
                    .chain(self.store.list_by_recipient(user_id)?)
                    .filter(|c| c.involves(user_id) && seen.insert(c.id.clone()))
                    .collect();
                all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                Ok::<_, WorkflowError>(all)
            })?;
        Ok(credentials)
    }

    /// Visible to its issuer and recipient only.
    pub fn get_credential(
        &self,
        user_id: &str,
        credential_id: &str,
    ) -> WorkflowResult<CredentialRecord> {
        let credential = self
            .store
            .get_credential(credential_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("credential {credential_id}")))?;
        if !credential.involves(user_id) {
            return Err(WorkflowError::Forbidden(
                "credential belongs to another user".into(),
            ));
        }
        Ok(credential)
    }

    pub fn list_verifications(
        &self,
        user_id: &str,
        credential_id: &str,
    ) -> WorkflowResult<Vec<VerificationRecord>> {
        self.get_credential(user_id, credential_id)?;
        Ok(self.store.list_verifications(credential_id)?)
    }

    // =========================================================================
    // Institutions
    // =========================================================================

    pub async fn register_institution(
        &self,
        user_id: &str,
        input: RegisterInstitution,
    ) -> WorkflowResult<AnchorReceipt> {
        self.require_role(user_id, UserRole::Institution, "only institutions can register")?;

        let name = sanitize_input(&input.name);
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let proof = input.accreditation_proof.trim();
        if proof.is_empty() {
            return Err(WorkflowError::InvalidInput("accreditation proof is empty".into()));
        }
        let required = input
            .required_verifiers
            .unwrap_or(DEFAULT_REQUIRED_VERIFIERS)
            .max(1);

        let receipt = self.gateway.register_institution(&name, proof, required).await?;
        info!(user_id, tx_hash = %receipt.tx_hash, "Institution registered on ledger");
        Ok(receipt)
    }

    /// Vouch for another institution.
    pub async fn verify_institution(
        &self,
        user_id: &str,
        address: &str,
    ) -> WorkflowResult<AnchorReceipt> {
        self.require_role(user_id, UserRole::Institution, "only institutions can vouch for institutions")?;
        let address = parse_wallet_address(address)?;
        let receipt = self
            .gateway
            .verify_institution(&address.to_checksum(None))
            .await?;
        info!(user_id, institution = %address, tx_hash = %receipt.tx_hash, "Institution vouched for");
        Ok(receipt)
    }

    pub async fn institution(&self, address: &str) -> WorkflowResult<Institution> {
        let address = parse_wallet_address(address)?.to_checksum(None);
        self.read_with_retry("institution", || self.gateway.institution(&address))
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("institution {address}")))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_role(&self, user_id: &str, role: UserRole, message: &str) -> WorkflowResult<UserRecord> {
        let user = self.current_user(user_id)?;
        if user.role != role {
            return Err(WorkflowError::Forbidden(message.to_string()));
        }
        Ok(user)
    }

    fn authorize_issuer(&self, issuer_id: &str) -> WorkflowResult<UserRecord> {
        let issuer = self.require_role(
            issuer_id,
            UserRole::Institution,
            "only institutions can issue credentials",
        )?;
        if issuer.wallet_address.is_none() {
            return Err(WorkflowError::Precondition(
                "link a wallet before issuing credentials".into(),
            ));
        }
        Ok(issuer)
    }

    /// Load a credential the caller issued.
    fn owned_credential(&self, issuer_id: &str, credential_id: &str) -> WorkflowResult<CredentialRecord> {
        let credential = self
            .store
            .get_credential(credential_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("credential {credential_id}")))?;
        if credential.issuer_id != issuer_id {
            return Err(WorkflowError::Forbidden(
                "only the issuing institution can manage this credential".into(),
            ));
        }
        Ok(credential)
    }

    fn draft(&self, issuer: &UserRecord, input: NewCredential) -> WorkflowResult<Draft> {
        let title = sanitize_input(&input.title);
        validate_title(&title)?;
        let description = sanitize_input(input.description.as_deref().unwrap_or_default());
        validate_description(&description)?;

        validate_email(&input.recipient_email)?;
        let email = normalize_email(&input.recipient_email);
        let recipient = self
            .store
            .find_user_by_email(&email)?
            .ok_or_else(|| WorkflowError::NotFound(format!("recipient {email}")))?;

        let fields = CredentialFields::new(
            issuer.id.clone(),
            recipient.id.clone(),
            title,
            description,
            Utc::now(),
        );
        let content_hash = fields.content_hash()?;

        let id = Uuid::new_v4().to_string();
        let metadata_uri = format!("{}{}", self.config.metadata_base_uri, id);
        let record = CredentialRecord::new_created(id, &fields, content_hash, metadata_uri);
        let request = AnchorRequest {
            credential_id: record.id.clone(),
            recipient: recipient.wallet_address.unwrap_or(recipient.id),
            content_hash,
            metadata_uri: record.metadata_uri.clone(),
        };
        Ok(Draft { record, request })
    }

    /// Recipient as recorded on the ledger: their wallet, else their user id.
    fn ledger_recipient(&self, recipient_id: &str) -> WorkflowResult<String> {
        Ok(self
            .store
            .get_user(recipient_id)?
            .and_then(|user| user.wallet_address)
            .unwrap_or_else(|| recipient_id.to_string()))
    }

    async fn settle(&self, credential_id: &str, tx_hash: &str) -> ReconciliationState {
        match self.reconciler.reconcile(credential_id, tx_hash).await {
            Ok(_) => ReconciliationState::Reconciled,
            Err(e) => {
                error!(
                    credential_id,
                    tx_hash,
                    error = %e,
                    "Credential anchored but not recorded"
                );
                ReconciliationState::Pending
            }
        }
    }

    /// Latest stored copy, or `fallback` if the store cannot be read.
    fn reload(&self, fallback: CredentialRecord) -> CredentialRecord {
        match self.store.get_credential(&fallback.id) {
            Ok(Some(credential)) => credential,
            _ => fallback,
        }
    }

    fn invalidate_listings(&self, credential: &CredentialRecord) {
        self.cache.invalidate(&listing_key(&credential.issuer_id));
        self.cache.invalidate(&listing_key(&credential.recipient_id));
    }

    async fn read_with_retry<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        retry_async(
            &self.config.read_retry,
            operation,
            GatewayError::is_retryable,
            op,
        )
        .await
    }

    fn check_batch_size(entries: &[BatchVerifyEntry]) -> WorkflowResult<()> {
        if entries.is_empty() {
            return Err(WorkflowError::InvalidInput("batch is empty".into()));
        }
        if entries.len() > MAX_VERIFY_BATCH {
            return Err(WorkflowError::InvalidInput(format!(
                "batch exceeds {MAX_VERIFY_BATCH} entries"
            )));
        }
        Ok(())
    }
}

/// Largest batch accepted by `verify_batch`.
pub const MAX_VERIFY_BATCH: usize = 100;

/// A transaction hash is 32 bytes, `0x`-prefixed hex.
fn parse_tx_hash(raw: &str) -> WorkflowResult<B256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WorkflowError::InvalidInput("transaction hash is empty".into()));
    }
    raw.parse::<B256>()
        .map_err(|e| WorkflowError::InvalidInput(format!("invalid transaction hash {raw}: {e}")))
}
