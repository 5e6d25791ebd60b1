// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process credential registry.
//!
//! Mirrors the registry contract's rules (duplicate ids revert, batches are
//! atomic, institutions need `required_verifiers` vouches) without a node.
//! Used for `CHAIN_BACKEND=memory` and throughout the test suite, which is
//! why it can be told to fail the next write or the next few reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{keccak256, Address, B256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::credential::{chain_credential_id, ContentHash};

use super::events::{ProviderEvent, ProviderEvents};
use super::gateway::{validate_anchor_request, validate_batch, ChainGateway, GatewayError};
use super::types::{
    AnchorReceipt, AnchorRequest, Institution, InstitutionStatus, ProviderContext,
    VerificationResult,
};

/// Chain id reported by the in-process ledger (the usual local devnet id).
pub const MEMORY_CHAIN_ID: u64 = 31337;

/// Default signing account (first well-known devnet account).
pub const DEFAULT_ACCOUNT: Address = Address::new([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

struct AnchoredCredential {
    content_hash: B256,
    issuer: Address,
    issued_at: DateTime<Utc>,
    metadata_uri: String,
}

struct InstitutionEntry {
    name: String,
    status: InstitutionStatus,
    accreditation_proof: String,
    verifiers: Vec<Address>,
    required_verifiers: u8,
}

enum InjectedFailure {
    Rejected(String),
    Reverted(String),
}

/// Provider change applied while the next write waits for its signature.
enum Interruption {
    Network(u64),
    Account(Address),
}

struct LedgerState {
    /// `None` once the provider exposes no accounts
    account: Option<Address>,
    chain_id: u64,
    /// Writes are refused on any other chain
    expected_chain_id: Option<u64>,
    credentials: HashMap<B256, AnchoredCredential>,
    institutions: HashMap<Address, InstitutionEntry>,
    transactions: u64,
    next_write_failure: Option<InjectedFailure>,
    next_write_interruption: Option<Interruption>,
    verify_failures: HashMap<String, u32>,
}

pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    events: Arc<ProviderEvents>,
}

impl InMemoryLedger {
    pub fn new(events: Arc<ProviderEvents>) -> Self {
        Self::with_account(events, DEFAULT_ACCOUNT)
    }

    pub fn with_account(events: Arc<ProviderEvents>, account: Address) -> Self {
        events.seed(ProviderContext {
            chain_id: Some(MEMORY_CHAIN_ID),
            accounts: vec![account.to_string()],
        });
        Self {
            state: Mutex::new(LedgerState {
                account: Some(account),
                chain_id: MEMORY_CHAIN_ID,
                expected_chain_id: None,
                credentials: HashMap::new(),
                institutions: HashMap::new(),
                transactions: 0,
                next_write_failure: None,
                next_write_interruption: None,
                verify_failures: HashMap::new(),
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Fault injection and provider simulation
    // =========================================================================

    /// The next write fails as if the account holder declined to sign.
    pub fn reject_next_write(&self, message: impl Into<String>) {
        self.lock().next_write_failure = Some(InjectedFailure::Rejected(message.into()));
    }

    /// The next write reverts with the given reason.
    pub fn revert_next_write(&self, reason: impl Into<String>) {
        self.lock().next_write_failure = Some(InjectedFailure::Reverted(reason.into()));
    }

    /// The next `times` reads of this credential fail with a transport error.
    pub fn fail_verifications(&self, credential_id: &str, times: u32) {
        self.lock()
            .verify_failures
            .insert(credential_id.to_string(), times);
    }

    pub fn switch_network(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
        self.events.publish(ProviderEvent::ChainChanged(chain_id));
    }

    pub fn switch_account(&self, account: Address) {
        self.lock().account = Some(account);
        self.events
            .publish(ProviderEvent::AccountsChanged(vec![account.to_string()]));
    }

    /// The provider stops exposing accounts, as when a wallet is locked.
    pub fn disconnect_accounts(&self) {
        self.lock().account = None;
        self.events.publish(ProviderEvent::AccountsChanged(Vec::new()));
    }

    /// Refuse writes unless the ledger is on `chain_id`.
    pub fn expect_chain_id(&self, chain_id: u64) {
        self.lock().expected_chain_id = Some(chain_id);
    }

    /// The network changes after the next write has captured its context
    /// but before it is submitted.
    pub fn switch_network_during_next_write(&self, chain_id: u64) {
        self.lock().next_write_interruption = Some(Interruption::Network(chain_id));
    }

    /// Like [`switch_network_during_next_write`](Self::switch_network_during_next_write)
    /// for the active account.
    pub fn switch_account_during_next_write(&self, account: Address) {
        self.lock().next_write_interruption = Some(Interruption::Account(account));
    }

    /// Number of confirmed write transactions.
    pub fn write_count(&self) -> u64 {
        self.lock().transactions
    }

    pub fn anchored_count(&self) -> usize {
        self.lock().credentials.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Shared prologue of every write. The context is captured before the
    /// simulated signing step and re-checked after it, then the chain and
    /// sender are resolved.
    fn begin_write(&self) -> Result<(MutexGuard<'_, LedgerState>, Address), GatewayError> {
        let guard = self.events.guard();

        let interruption = self.lock().next_write_interruption.take();
        match interruption {
            Some(Interruption::Network(chain_id)) => self.switch_network(chain_id),
            Some(Interruption::Account(account)) => self.switch_account(account),
            None => {}
        }

        let mut state = self.lock();
        guard.ensure_current(&self.events)?;
        Self::take_injected_failure(&mut state)?;
        if let Some(expected) = state.expected_chain_id {
            if expected != state.chain_id {
                return Err(GatewayError::WrongNetwork {
                    expected,
                    actual: state.chain_id,
                });
            }
        }
        let sender = state.account.ok_or(GatewayError::NoAccounts)?;
        Ok((state, sender))
    }

    fn take_injected_failure(state: &mut LedgerState) -> Result<(), GatewayError> {
        match state.next_write_failure.take() {
            Some(InjectedFailure::Rejected(message)) => Err(GatewayError::UserRejected(message)),
            Some(InjectedFailure::Reverted(reason)) => Err(GatewayError::Reverted(reason)),
            None => Ok(()),
        }
    }

    fn confirm(state: &mut LedgerState) -> AnchorReceipt {
        state.transactions += 1;
        let tx_hash = keccak256(format!("memory-ledger-tx-{}", state.transactions).as_bytes());
        AnchorReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: Some(state.transactions),
            explorer_url: None,
        }
    }

    fn parse_address(address: &str) -> Result<Address, GatewayError> {
        address
            .trim()
            .parse::<Address>()
            .map_err(|e| GatewayError::InvalidAddress(format!("{address}: {e}")))
    }

    fn block_time() -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
    }
}

#[async_trait]
impl ChainGateway for InMemoryLedger {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<String, GatewayError> {
        self.lock()
            .account
            .map(|account| account.to_string())
            .ok_or(GatewayError::NoAccounts)
    }

    async fn provider_context(&self) -> Result<ProviderContext, GatewayError> {
        let state = self.lock();
        Ok(ProviderContext {
            chain_id: Some(state.chain_id),
            accounts: state.account.iter().map(Address::to_string).collect(),
        })
    }

    async fn register_institution(
        &self,
        name: &str,
        accreditation_proof: &str,
        required_verifiers: u8,
    ) -> Result<AnchorReceipt, GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidInput("institution name is empty".into()));
        }
        if accreditation_proof.trim().is_empty() {
            return Err(GatewayError::InvalidInput("accreditation proof is empty".into()));
        }

        let (mut state, sender) = self.begin_write()?;

        if state.institutions.contains_key(&sender) {
            return Err(GatewayError::Reverted("Institution already registered".into()));
        }
        state.institutions.insert(
            sender,
            InstitutionEntry {
                name: name.to_string(),
                status: InstitutionStatus::Pending,
                accreditation_proof: accreditation_proof.to_string(),
                verifiers: Vec::new(),
                required_verifiers: required_verifiers.max(1),
            },
        );

        let receipt = Self::confirm(&mut state);
        info!(institution = %sender, tx_hash = %receipt.tx_hash, "Institution registered");
        Ok(receipt)
    }

    async fn verify_institution(&self, institution: &str) -> Result<AnchorReceipt, GatewayError> {
        let target = Self::parse_address(institution)?;

        let (mut state, sender) = self.begin_write()?;

        let entry = state
            .institutions
            .get_mut(&target)
            .ok_or_else(|| GatewayError::Reverted("Institution not registered".into()))?;
        if sender == target {
            return Err(GatewayError::Reverted("Cannot verify own institution".into()));
        }
        if entry.verifiers.contains(&sender) {
            return Err(GatewayError::Reverted("Already verified by this account".into()));
        }

        entry.verifiers.push(sender);
        if entry.verifiers.len() >= usize::from(entry.required_verifiers) {
            entry.status = InstitutionStatus::Verified;
        }

        Ok(Self::confirm(&mut state))
    }

    async fn institution(&self, address: &str) -> Result<Option<Institution>, GatewayError> {
        let target = Self::parse_address(address)?;
        let state = self.lock();
        Ok(state.institutions.get(&target).map(|entry| Institution {
            address: target.to_string(),
            name: entry.name.clone(),
            status: entry.status,
            accreditation_proof: entry.accreditation_proof.clone(),
            verifiers: entry.verifiers.iter().map(Address::to_string).collect(),
        }))
    }

    async fn issue(&self, request: &AnchorRequest) -> Result<AnchorReceipt, GatewayError> {
        validate_anchor_request(request)?;

        let (mut state, sender) = self.begin_write()?;

        let key = chain_credential_id(&request.credential_id);
        if state.credentials.contains_key(&key) {
            return Err(GatewayError::Reverted("Credential already exists".into()));
        }

        state.credentials.insert(
            key,
            AnchoredCredential {
                content_hash: request.content_hash.as_b256(),
                issuer: sender,
                issued_at: Self::block_time(),
                metadata_uri: request.metadata_uri.clone(),
            },
        );

        let receipt = Self::confirm(&mut state);
        debug!(
            credential_id = %request.credential_id,
            tx_hash = %receipt.tx_hash,
            "Credential anchored in memory ledger"
        );
        Ok(receipt)
    }

    async fn issue_batch(&self, requests: &[AnchorRequest]) -> Result<AnchorReceipt, GatewayError> {
        validate_batch(requests)?;

        let (mut state, sender) = self.begin_write()?;

        if let Some(existing) = requests
            .iter()
            .find(|r| state.credentials.contains_key(&chain_credential_id(&r.credential_id)))
        {
            return Err(GatewayError::Reverted(format!(
                "Credential already exists: {}",
                existing.credential_id
            )));
        }

        let issued_at = Self::block_time();
        for request in requests {
            state.credentials.insert(
                chain_credential_id(&request.credential_id),
                AnchoredCredential {
                    content_hash: request.content_hash.as_b256(),
                    issuer: sender,
                    issued_at,
                    metadata_uri: request.metadata_uri.clone(),
                },
            );
        }

        let receipt = Self::confirm(&mut state);
        info!(count = requests.len(), tx_hash = %receipt.tx_hash, "Credential batch anchored");
        Ok(receipt)
    }

    async fn verify(
        &self,
        credential_id: &str,
        content_hash: &ContentHash,
    ) -> Result<VerificationResult, GatewayError> {
        let mut state = self.lock();

        if let Some(remaining) = state.verify_failures.get_mut(credential_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GatewayError::Rpc("request timed out".into()));
            }
        }

        let key = chain_credential_id(credential_id);
        let result = match state.credentials.get(&key) {
            Some(anchored) => VerificationResult {
                credential_id: credential_id.to_string(),
                is_valid: anchored.content_hash == content_hash.as_b256(),
                issuer: anchored.issuer.to_string(),
                issue_date: Some(anchored.issued_at),
                metadata_uri: anchored.metadata_uri.clone(),
            },
            None => VerificationResult {
                credential_id: credential_id.to_string(),
                is_valid: false,
                issuer: String::new(),
                issue_date: None,
                metadata_uri: String::new(),
            },
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::BatchVerifyEntry;
    use crate::credential::CredentialFields;
    use chrono::TimeZone;

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(Arc::new(ProviderEvents::new()))
    }

    fn hash_of(title: &str) -> ContentHash {
        CredentialFields::new(
            "INST-1",
            "STU-1",
            title,
            "",
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        )
        .content_hash()
        .unwrap()
    }

    fn request(id: &str, title: &str) -> AnchorRequest {
        AnchorRequest {
            credential_id: id.to_string(),
            recipient: "STU-1".to_string(),
            content_hash: hash_of(title),
            metadata_uri: format!("urn:credential:{id}"),
        }
    }

    #[tokio::test]
    async fn verify_is_valid_only_for_the_anchored_hash() {
        let ledger = ledger();
        ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap();

        let ok = ledger.verify("cred-1", &hash_of("BSc Physics")).await.unwrap();
        assert!(ok.is_valid);
        assert_eq!(ok.issuer, DEFAULT_ACCOUNT.to_string());
        assert!(ok.issue_date.is_some());

        let tampered = ledger.verify("cred-1", &hash_of("MSc Physics")).await.unwrap();
        assert!(!tampered.is_valid);

        let unknown = ledger.verify("cred-404", &hash_of("BSc Physics")).await.unwrap();
        assert!(!unknown.is_valid);
        assert!(unknown.issuer.is_empty());
    }

    #[tokio::test]
    async fn reissuing_an_id_reverts() {
        let ledger = ledger();
        ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap();
        let err = ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Reverted(_)));
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn malformed_batch_entry_aborts_the_whole_batch() {
        let ledger = ledger();
        let mut bad = request("cred-3", "BSc Chemistry");
        bad.recipient = "  ".into();
        let batch = vec![
            request("cred-1", "BSc Physics"),
            request("cred-2", "BSc Biology"),
            bad,
        ];

        let err = ledger.issue_batch(&batch).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(ref m) if m.starts_with("entry 2")));
        assert_eq!(ledger.anchored_count(), 0);
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn batch_with_already_anchored_id_writes_nothing() {
        let ledger = ledger();
        ledger.issue(&request("cred-2", "BSc Biology")).await.unwrap();

        let batch = vec![request("cred-1", "BSc Physics"), request("cred-2", "BSc Biology")];
        assert!(matches!(
            ledger.issue_batch(&batch).await,
            Err(GatewayError::Reverted(_))
        ));
        assert_eq!(ledger.anchored_count(), 1);
    }

    #[tokio::test]
    async fn batch_issue_shares_one_transaction() {
        let ledger = ledger();
        let batch = vec![request("cred-1", "BSc Physics"), request("cred-2", "BSc Biology")];
        let receipt = ledger.issue_batch(&batch).await.unwrap();
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(ledger.write_count(), 1);
        assert_eq!(ledger.anchored_count(), 2);
    }

    #[tokio::test]
    async fn batch_verify_drops_failed_entries() {
        let ledger = ledger();
        ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap();
        ledger.issue(&request("cred-2", "BSc Biology")).await.unwrap();
        ledger.fail_verifications("cred-2", u32::MAX);

        let entries = vec![
            BatchVerifyEntry { credential_id: "cred-1".into(), content_hash: hash_of("BSc Physics") },
            BatchVerifyEntry { credential_id: "cred-2".into(), content_hash: hash_of("BSc Biology") },
        ];

        let results = ledger.verify_batch(&entries).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].credential_id, "cred-1");

        let detailed = ledger.verify_batch_detailed(&entries).await;
        assert_eq!(detailed.len(), 2);
        assert!(detailed[0].result.is_ok());
        assert!(detailed[1].result.is_err());
    }

    #[tokio::test]
    async fn injected_rejection_is_surfaced_and_writes_nothing() {
        let ledger = ledger();
        ledger.reject_next_write("User denied transaction signature.");
        let err = ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap_err();
        assert_eq!(err.to_string(), "User denied transaction signature.");
        assert_eq!(ledger.anchored_count(), 0);

        // Only the next write is affected.
        assert!(ledger.issue(&request("cred-1", "BSc Physics")).await.is_ok());
    }

    #[tokio::test]
    async fn network_switch_is_published_to_observers() {
        let events = Arc::new(ProviderEvents::new());
        let ledger = InMemoryLedger::new(events.clone());
        let before = events.epoch();

        ledger.switch_network(11155111);

        assert_eq!(events.epoch(), before + 1);
        assert_eq!(events.context().chain_id, Some(11155111));
        let context = ledger.provider_context().await.unwrap();
        assert_eq!(context.chain_id, Some(11155111));
    }

    #[tokio::test]
    async fn context_change_before_submission_aborts_the_write() {
        let events = Arc::new(ProviderEvents::new());
        let ledger = InMemoryLedger::new(events.clone());

        ledger.switch_network_during_next_write(11155111);
        let err = ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap_err();
        assert!(matches!(err, GatewayError::ContextChanged));
        assert_eq!(ledger.anchored_count(), 0);
        assert_eq!(ledger.write_count(), 0);
        assert_eq!(events.context().chain_id, Some(11155111));

        ledger.switch_account_during_next_write(Address::repeat_byte(0x22));
        let batch = vec![request("cred-1", "BSc Physics"), request("cred-2", "BSc Biology")];
        assert!(matches!(
            ledger.issue_batch(&batch).await,
            Err(GatewayError::ContextChanged)
        ));
        assert_eq!(ledger.anchored_count(), 0);

        // The interruption is one-shot; the next write uses the new context.
        ledger.issue(&request("cred-1", "BSc Physics")).await.unwrap();
        let anchored = ledger.verify("cred-1", &hash_of("BSc Physics")).await.unwrap();
        assert_eq!(anchored.issuer, Address::repeat_byte(0x22).to_string());
    }

    #[tokio::test]
    async fn locked_wallet_exposes_no_accounts() {
        let ledger = ledger();
        ledger.disconnect_accounts();

        assert!(matches!(ledger.connect().await, Err(GatewayError::NoAccounts)));
        assert!(ledger.provider_context().await.unwrap().accounts.is_empty());
        assert!(matches!(
            ledger.issue(&request("cred-1", "BSc Physics")).await,
            Err(GatewayError::NoAccounts)
        ));
        assert!(matches!(
            ledger.register_institution("Nairobi Polytechnic", "ipfs://accreditation", 1).await,
            Err(GatewayError::NoAccounts)
        ));
        assert_eq!(ledger.write_count(), 0);
    }

    #[tokio::test]
    async fn writes_are_refused_off_the_expected_chain() {
        let ledger = ledger();
        ledger.expect_chain_id(11155111);
        assert!(matches!(
            ledger.issue(&request("cred-1", "BSc Physics")).await,
            Err(GatewayError::WrongNetwork {
                expected: 11155111,
                actual: MEMORY_CHAIN_ID
            })
        ));

        ledger.switch_network(11155111);
        assert!(ledger.issue(&request("cred-1", "BSc Physics")).await.is_ok());
    }

    #[tokio::test]
    async fn institution_becomes_verified_after_enough_vouches() {
        let events = Arc::new(ProviderEvents::new());
        let ledger = InMemoryLedger::new(events);
        let institution = DEFAULT_ACCOUNT.to_string();

        ledger
            .register_institution("Nairobi Polytechnic", "ipfs://accreditation", 2)
            .await
            .unwrap();
        assert!(matches!(
            ledger.verify_institution(&institution).await,
            Err(GatewayError::Reverted(_))
        ));

        ledger.switch_account(Address::repeat_byte(0x22));
        ledger.verify_institution(&institution).await.unwrap();
        let record = ledger.institution(&institution).await.unwrap().unwrap();
        assert_eq!(record.status, InstitutionStatus::Pending);

        ledger.switch_account(Address::repeat_byte(0x33));
        ledger.verify_institution(&institution).await.unwrap();
        let record = ledger.institution(&institution).await.unwrap().unwrap();
        assert_eq!(record.status, InstitutionStatus::Verified);
        assert_eq!(record.verifiers.len(), 2);

        assert!(ledger
            .institution(&Address::repeat_byte(0x44).to_string())
            .await
            .unwrap()
            .is_none());
    }
}
