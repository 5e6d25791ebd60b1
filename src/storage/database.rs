// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded relational store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized UserRecord
//! - `user_emails`: lowercase email → user_id
//! - `user_wallets`: lowercase wallet address → user_id
//! - `credentials`: credential_id → serialized CredentialRecord
//! - `issuer_index` / `recipient_index`: composite key (len(user), user, !created_ms, credential_id) → credential_id
//! - `verifications`: verification_id → serialized VerificationRecord
//! - `verification_index`: composite key (len(credential), credential, !created_ms, verification_id) → verification_id
//! - `pending_anchors`: credential_id → tx_hash (reconciliation journal)

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

use super::records::{
    AttachOutcome, CredentialRecord, PendingAnchor, TransitionError, UserRecord,
    VerificationRecord,
};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");
const USER_WALLETS: TableDefinition<&str, &str> = TableDefinition::new("user_wallets");

const CREDENTIALS: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");
const ISSUER_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("issuer_index");
const RECIPIENT_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("recipient_index");

const VERIFICATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("verifications");
const VERIFICATION_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("verification_index");

const PENDING_ANCHORS: TableDefinition<&str, &str> = TableDefinition::new("pending_anchors");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Failures of the store itself, as opposed to rejections of the request.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StoreError::NotFound(_)
                | StoreError::AlreadyExists(_)
                | StoreError::Transition(_)
                | StoreError::Serde(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Store Contract
// =============================================================================

/// Relational operations the workflow depends on.
pub trait CredentialStore: Send + Sync {
    /// Fails with `AlreadyExists` on a duplicate id, email or wallet.
    fn insert_user(&self, user: &UserRecord) -> StoreResult<()>;
    fn get_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    /// Link (or replace) the user's wallet. A wallet belongs to one user.
    fn set_wallet_address(&self, user_id: &str, wallet_address: &str) -> StoreResult<UserRecord>;

    fn insert_credential(&self, credential: &CredentialRecord) -> StoreResult<()>;
    fn get_credential(&self, credential_id: &str) -> StoreResult<Option<CredentialRecord>>;
    /// Idempotent on `(credential_id, tx_hash)`. Also clears any journal entry.
    fn attach_transaction(&self, credential_id: &str, tx_hash: &str) -> StoreResult<AttachOutcome>;
    fn revoke_credential(&self, credential_id: &str) -> StoreResult<CredentialRecord>;
    /// Newest first.
    fn list_by_issuer(&self, issuer_id: &str) -> StoreResult<Vec<CredentialRecord>>;
    /// Newest first.
    fn list_by_recipient(&self, recipient_id: &str) -> StoreResult<Vec<CredentialRecord>>;

    fn insert_verification(&self, verification: &VerificationRecord) -> StoreResult<()>;
    fn list_verifications(&self, credential_id: &str) -> StoreResult<Vec<VerificationRecord>>;

    fn record_pending_anchor(&self, pending: &PendingAnchor) -> StoreResult<()>;
    fn pending_anchors(&self) -> StoreResult<Vec<PendingAnchor>>;
    fn clear_pending_anchor(&self, credential_id: &str) -> StoreResult<()>;

    fn health_check(&self) -> StoreResult<()>;
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Composite key: `owner_len_be | owner | inverted_millis_be | record_id`.
///
/// The length prefix keeps owners that extend one another (`auth0` and
/// `auth0|abc`) in disjoint ranges. The inverted timestamp gives newest-first
/// order on a forward scan.
fn make_index_key(owner: &str, timestamp_ms: i64, record_id: &str) -> Vec<u8> {
    let mut key = make_prefix(owner);
    key.reserve(8 + record_id.len());
    key.extend_from_slice(&(!timestamp_ms as u64).to_be_bytes());
    key.extend_from_slice(record_id.as_bytes());
    key
}

/// Every key for `owner` starts with this.
fn make_prefix(owner: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + owner.len());
    prefix.extend_from_slice(&(owner.len() as u32).to_be_bytes());
    prefix.extend_from_slice(owner.as_bytes());
    prefix
}

// =============================================================================
// CredentialDatabase
// =============================================================================

pub struct CredentialDatabase {
    db: Database,
}

impl CredentialDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(USER_WALLETS)?;
            let _ = write_txn.open_table(CREDENTIALS)?;
            let _ = write_txn.open_table(ISSUER_INDEX)?;
            let _ = write_txn.open_table(RECIPIENT_INDEX)?;
            let _ = write_txn.open_table(VERIFICATIONS)?;
            let _ = write_txn.open_table(VERIFICATION_INDEX)?;
            let _ = write_txn.open_table(PENDING_ANCHORS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        table_def: TableDefinition<'static, &'static str, &'static [u8]>,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table_def)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Resolve an index range into the records it points at.
    fn scan_index<T: DeserializeOwned>(
        &self,
        index_def: TableDefinition<'static, &'static [u8], &'static str>,
        table_def: TableDefinition<'static, &'static str, &'static [u8]>,
        owner: &str,
    ) -> StoreResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index_def)?;
        let table = read_txn.open_table(table_def)?;

        let prefix = make_prefix(owner);

        let mut results = Vec::new();
        for entry in index.range(prefix.as_slice()..)? {
            let (key, record_id) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            if let Some(value) = table.get(record_id.value())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(results)
    }
}

impl CredentialStore for CredentialDatabase {
    // =========================================================================
    // Users
    // =========================================================================

    fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(user)?;
        let email = user.email.to_lowercase();
        let wallet = user.wallet_address.as_ref().map(|w| w.to_lowercase());

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            if users.get(user.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("user {}", user.id)));
            }

            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("email {email}")));
            }

            let mut wallets = write_txn.open_table(USER_WALLETS)?;
            if let Some(wallet) = &wallet {
                if wallets.get(wallet.as_str())?.is_some() {
                    return Err(StoreError::AlreadyExists(format!("wallet {wallet}")));
                }
                wallets.insert(wallet.as_str(), user.id.as_str())?;
            }

            users.insert(user.id.as_str(), json.as_slice())?;
            emails.insert(email.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        self.get_json(USERS, user_id)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let emails = read_txn.open_table(USER_EMAILS)?;
            match emails.get(email.as_str())? {
                Some(id) => id.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get_user(&user_id)
    }

    fn set_wallet_address(&self, user_id: &str, wallet_address: &str) -> StoreResult<UserRecord> {
        let wallet = wallet_address.to_lowercase();

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS)?;
            let existing_bytes = {
                let existing = users
                    .get(user_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
                existing.value().to_vec()
            };
            let mut user: UserRecord = serde_json::from_slice(&existing_bytes)?;

            let mut wallets = write_txn.open_table(USER_WALLETS)?;
            let owner = wallets.get(wallet.as_str())?.map(|v| v.value().to_string());
            match owner {
                Some(owner) if owner != user_id => {
                    return Err(StoreError::AlreadyExists(format!("wallet {wallet}")));
                }
                _ => {}
            }

            if let Some(previous) = user.wallet_address.as_ref().map(|w| w.to_lowercase()) {
                if previous != wallet {
                    wallets.remove(previous.as_str())?;
                }
            }
            wallets.insert(wallet.as_str(), user_id)?;

            user.wallet_address = Some(wallet_address.to_string());
            let json = serde_json::to_vec(&user)?;
            users.insert(user_id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(user)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    fn insert_credential(&self, credential: &CredentialRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(credential)?;
        let created_ms = credential.created_at.timestamp_millis();

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CREDENTIALS)?;
            if table.get(credential.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("credential {}", credential.id)));
            }
            table.insert(credential.id.as_str(), json.as_slice())?;

            let mut issuer_idx = write_txn.open_table(ISSUER_INDEX)?;
            let key = make_index_key(&credential.issuer_id, created_ms, &credential.id);
            issuer_idx.insert(key.as_slice(), credential.id.as_str())?;

            let mut recipient_idx = write_txn.open_table(RECIPIENT_INDEX)?;
            let key = make_index_key(&credential.recipient_id, created_ms, &credential.id);
            recipient_idx.insert(key.as_slice(), credential.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_credential(&self, credential_id: &str) -> StoreResult<Option<CredentialRecord>> {
        self.get_json(CREDENTIALS, credential_id)
    }

    fn attach_transaction(&self, credential_id: &str, tx_hash: &str) -> StoreResult<AttachOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(CREDENTIALS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(credential_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("credential {credential_id}")))?;
                existing.value().to_vec()
            };

            let mut credential: CredentialRecord = serde_json::from_slice(&existing_bytes)?;
            let outcome = credential.attach_transaction(tx_hash, Utc::now())?;
            if outcome == AttachOutcome::Attached {
                let json = serde_json::to_vec(&credential)?;
                table.insert(credential_id, json.as_slice())?;
            }

            let mut pending = write_txn.open_table(PENDING_ANCHORS)?;
            pending.remove(credential_id)?;
            outcome
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn revoke_credential(&self, credential_id: &str) -> StoreResult<CredentialRecord> {
        let write_txn = self.db.begin_write()?;
        let credential = {
            let mut table = write_txn.open_table(CREDENTIALS)?;
            let existing_bytes = {
                let existing = table
                    .get(credential_id)?
                    .ok_or_else(|| StoreError::NotFound(format!("credential {credential_id}")))?;
                existing.value().to_vec()
            };

            let mut credential: CredentialRecord = serde_json::from_slice(&existing_bytes)?;
            credential.revoke(Utc::now())?;
            let json = serde_json::to_vec(&credential)?;
            table.insert(credential_id, json.as_slice())?;
            credential
        };
        write_txn.commit()?;
        Ok(credential)
    }

    fn list_by_issuer(&self, issuer_id: &str) -> StoreResult<Vec<CredentialRecord>> {
        self.scan_index(ISSUER_INDEX, CREDENTIALS, issuer_id)
    }

    fn list_by_recipient(&self, recipient_id: &str) -> StoreResult<Vec<CredentialRecord>> {
        self.scan_index(RECIPIENT_INDEX, CREDENTIALS, recipient_id)
    }

    // =========================================================================
    // Verifications
    // =========================================================================

    fn insert_verification(&self, verification: &VerificationRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(verification)?;
        let key = make_index_key(
            &verification.credential_id,
            verification.created_at.timestamp_millis(),
            &verification.id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(VERIFICATIONS)?;
            table.insert(verification.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(VERIFICATION_INDEX)?;
            index.insert(key.as_slice(), verification.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_verifications(&self, credential_id: &str) -> StoreResult<Vec<VerificationRecord>> {
        self.scan_index(VERIFICATION_INDEX, VERIFICATIONS, credential_id)
    }

    // =========================================================================
    // Reconciliation journal
    // =========================================================================

    fn record_pending_anchor(&self, pending: &PendingAnchor) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING_ANCHORS)?;
            table.insert(pending.credential_id.as_str(), pending.tx_hash.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn pending_anchors(&self) -> StoreResult<Vec<PendingAnchor>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_ANCHORS)?;
        let mut pending = Vec::new();
        for entry in table.iter()? {
            let (credential_id, tx_hash) = entry?;
            pending.push(PendingAnchor {
                credential_id: credential_id.value().to_string(),
                tx_hash: tx_hash.value().to_string(),
            });
        }
        Ok(pending)
    }

    fn clear_pending_anchor(&self, credential_id: &str) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PENDING_ANCHORS)?;
            table.remove(credential_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(CREDENTIALS)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialFields;
    use crate::storage::records::{CredentialStatus, UserRole, VerificationStatus};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn open() -> (CredentialDatabase, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = CredentialDatabase::open(&dir.path().join("credentials.redb")).unwrap();
        (db, dir)
    }

    fn user(id: &str, email: &str, role: UserRole) -> UserRecord {
        UserRecord {
            id: id.into(),
            email: email.into(),
            full_name: format!("User {id}"),
            role,
            wallet_address: None,
            created_at: Utc::now(),
        }
    }

    fn credential(id: &str, issuer: &str, recipient: &str, age_secs: i64) -> CredentialRecord {
        let fields = CredentialFields::new(
            issuer,
            recipient,
            format!("Credential {id}"),
            "",
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        );
        let hash = fields.content_hash().unwrap();
        let mut record = CredentialRecord::new_created(id, &fields, hash, format!("urn:credential:{id}"));
        record.created_at = Utc::now() - Duration::seconds(age_secs);
        record
    }

    #[test]
    fn users_are_unique_by_id_and_email() {
        let (db, _dir) = open();
        db.insert_user(&user("u1", "a@uni.edu", UserRole::Student)).unwrap();

        assert!(matches!(
            db.insert_user(&user("u1", "b@uni.edu", UserRole::Student)),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            db.insert_user(&user("u2", "a@uni.edu", UserRole::Student)),
            Err(StoreError::AlreadyExists(_))
        ));

        let found = db.find_user_by_email("  A@Uni.edu ").unwrap().unwrap();
        assert_eq!(found.id, "u1");
        assert!(db.find_user_by_email("nobody@uni.edu").unwrap().is_none());
    }

    #[test]
    fn wallet_belongs_to_one_user() {
        let (db, _dir) = open();
        db.insert_user(&user("u1", "a@uni.edu", UserRole::Institution)).unwrap();
        db.insert_user(&user("u2", "b@uni.edu", UserRole::Student)).unwrap();

        let wallet = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
        let updated = db.set_wallet_address("u1", wallet).unwrap();
        assert_eq!(updated.wallet_address.as_deref(), Some(wallet));

        // Same user, same wallet: fine.
        assert!(db.set_wallet_address("u1", wallet).is_ok());
        assert!(matches!(
            db.set_wallet_address("u2", &wallet.to_lowercase()),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            db.set_wallet_address("ghost", wallet),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn attach_transaction_is_idempotent_and_clears_the_journal() {
        let (db, _dir) = open();
        db.insert_credential(&credential("c1", "inst", "stu", 0)).unwrap();
        db.record_pending_anchor(&PendingAnchor {
            credential_id: "c1".into(),
            tx_hash: "0xabc".into(),
        })
        .unwrap();

        assert_eq!(db.attach_transaction("c1", "0xabc").unwrap(), AttachOutcome::Attached);
        assert!(db.pending_anchors().unwrap().is_empty());
        assert_eq!(
            db.attach_transaction("c1", "0xabc").unwrap(),
            AttachOutcome::AlreadyAttached
        );
        assert!(matches!(
            db.attach_transaction("c1", "0xdef"),
            Err(StoreError::Transition(TransitionError::ConflictingTransaction { .. }))
        ));

        let stored = db.get_credential("c1").unwrap().unwrap();
        assert_eq!(stored.status, CredentialStatus::Anchored);
        assert_eq!(stored.tx_hash.as_deref(), Some("0xabc"));

        assert!(matches!(
            db.attach_transaction("missing", "0xabc"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn listings_are_scoped_and_newest_first() {
        let (db, _dir) = open();
        db.insert_credential(&credential("old", "inst", "stu-a", 60)).unwrap();
        db.insert_credential(&credential("new", "inst", "stu-b", 0)).unwrap();
        db.insert_credential(&credential("other", "inst-2", "stu-a", 30)).unwrap();
        // Owner ids sharing a prefix must not bleed into each other.
        db.insert_credential(&credential("prefixed", "inst-x", "stu-c", 10)).unwrap();

        let issued: Vec<String> = db.list_by_issuer("inst").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(issued, vec!["new", "old"]);

        let received: Vec<String> =
            db.list_by_recipient("stu-a").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(received, vec!["other", "old"]);

        // Auth subjects often contain the old separator character.
        db.insert_credential(&credential("nested", "auth0|abc", "stu-d", 5)).unwrap();
        db.insert_credential(&credential("plain", "auth0", "stu-d", 5)).unwrap();
        let issued: Vec<String> = db.list_by_issuer("auth0").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(issued, vec!["plain"]);
        let issued: Vec<String> =
            db.list_by_issuer("auth0|abc").unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(issued, vec!["nested"]);

        assert!(matches!(
            db.insert_credential(&credential("old", "inst", "stu-a", 0)),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn revoke_only_anchored_credentials() {
        let (db, _dir) = open();
        db.insert_credential(&credential("c1", "inst", "stu", 0)).unwrap();
        assert!(matches!(
            db.revoke_credential("c1"),
            Err(StoreError::Transition(TransitionError::NotAnchored(_)))
        ));

        db.attach_transaction("c1", "0xabc").unwrap();
        let revoked = db.revoke_credential("c1").unwrap();
        assert_eq!(revoked.status, CredentialStatus::Revoked);
        assert_eq!(
            db.get_credential("c1").unwrap().unwrap().status,
            CredentialStatus::Revoked
        );
    }

    #[test]
    fn verifications_are_listed_per_credential() {
        let (db, _dir) = open();
        for (id, credential_id) in [("v1", "c1"), ("v2", "c1"), ("v3", "c2")] {
            db.insert_verification(&VerificationRecord {
                id: id.into(),
                credential_id: credential_id.into(),
                verifier_id: "emp".into(),
                status: VerificationStatus::Verified,
                verified_at: Some(Utc::now()),
                created_at: Utc::now(),
            })
            .unwrap();
        }
        assert_eq!(db.list_verifications("c1").unwrap().len(), 2);
        assert_eq!(db.list_verifications("c2").unwrap().len(), 1);
        assert!(db.list_verifications("c3").unwrap().is_empty());
    }

    #[test]
    fn journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.redb");
        {
            let db = CredentialDatabase::open(&path).unwrap();
            db.record_pending_anchor(&PendingAnchor {
                credential_id: "c1".into(),
                tx_hash: "0xabc".into(),
            })
            .unwrap();
        }
        let db = CredentialDatabase::open(&path).unwrap();
        assert_eq!(
            db.pending_anchors().unwrap(),
            vec![PendingAnchor {
                credential_id: "c1".into(),
                tx_hash: "0xabc".into()
            }]
        );
        assert!(db.health_check().is_ok());

        db.clear_pending_anchor("c1").unwrap();
        assert!(db.pending_anchors().unwrap().is_empty());
    }

    #[test]
    fn only_store_failures_are_transient() {
        assert!(StoreError::Unavailable("disk".into()).is_transient());
        assert!(!StoreError::NotFound("c1".into()).is_transient());
        assert!(!StoreError::Transition(TransitionError::NotAnchored("c1".into())).is_transient());
    }
}
