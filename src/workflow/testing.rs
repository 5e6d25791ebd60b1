// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for workflow tests.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crate::credential::CredentialFields;
use crate::storage::{
    AttachOutcome, CredentialDatabase, CredentialRecord, CredentialStore, PendingAnchor,
    StoreError, StoreResult, UserRecord, VerificationRecord,
};

/// A temp redb store whose `attach_transaction` can be made to fail.
pub struct FlakyStore {
    inner: CredentialDatabase,
    failing_attaches: AtomicU32,
    _dir: TempDir,
}

impl FlakyStore {
    pub fn open() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let inner = CredentialDatabase::open(&dir.path().join("credentials.redb")).unwrap();
        Self {
            inner,
            failing_attaches: AtomicU32::new(0),
            _dir: dir,
        }
    }

    /// Fail the next `n` attach calls with a transient error.
    pub fn fail_attaches(&self, n: u32) {
        self.failing_attaches.store(n, Ordering::SeqCst);
    }
}

impl CredentialStore for FlakyStore {
    fn insert_user(&self, user: &UserRecord) -> StoreResult<()> {
        self.inner.insert_user(user)
    }

    fn get_user(&self, user_id: &str) -> StoreResult<Option<UserRecord>> {
        self.inner.get_user(user_id)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        self.inner.find_user_by_email(email)
    }

    fn set_wallet_address(&self, user_id: &str, wallet_address: &str) -> StoreResult<UserRecord> {
        self.inner.set_wallet_address(user_id, wallet_address)
    }

    fn insert_credential(&self, credential: &CredentialRecord) -> StoreResult<()> {
        self.inner.insert_credential(credential)
    }

    fn get_credential(&self, credential_id: &str) -> StoreResult<Option<CredentialRecord>> {
        self.inner.get_credential(credential_id)
    }

    fn attach_transaction(&self, credential_id: &str, tx_hash: &str) -> StoreResult<AttachOutcome> {
        let remaining = self.failing_attaches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_attaches.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected attach failure".into()));
        }
        self.inner.attach_transaction(credential_id, tx_hash)
    }

    fn revoke_credential(&self, credential_id: &str) -> StoreResult<CredentialRecord> {
        self.inner.revoke_credential(credential_id)
    }

    fn list_by_issuer(&self, issuer_id: &str) -> StoreResult<Vec<CredentialRecord>> {
        self.inner.list_by_issuer(issuer_id)
    }

    fn list_by_recipient(&self, recipient_id: &str) -> StoreResult<Vec<CredentialRecord>> {
        self.inner.list_by_recipient(recipient_id)
    }

    fn insert_verification(&self, verification: &VerificationRecord) -> StoreResult<()> {
        self.inner.insert_verification(verification)
    }

    fn list_verifications(&self, credential_id: &str) -> StoreResult<Vec<VerificationRecord>> {
        self.inner.list_verifications(credential_id)
    }

    fn record_pending_anchor(&self, pending: &PendingAnchor) -> StoreResult<()> {
        self.inner.record_pending_anchor(pending)
    }

    fn pending_anchors(&self) -> StoreResult<Vec<PendingAnchor>> {
        self.inner.pending_anchors()
    }

    fn clear_pending_anchor(&self, credential_id: &str) -> StoreResult<()> {
        self.inner.clear_pending_anchor(credential_id)
    }

    fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check()
    }
}

pub fn sample_credential(id: &str) -> CredentialRecord {
    let fields = CredentialFields::new(
        "inst-1",
        "stu-1",
        "BSc Physics",
        "",
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    );
    let hash = fields.content_hash().unwrap();
    CredentialRecord::new_created(id, &fields, hash, format!("urn:credential:{id}"))
}
