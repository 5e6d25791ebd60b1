// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Reconciler
//!
//! Records ledger transaction hashes against their credentials once the
//! ledger write has succeeded.
//!
//! The chain write and the store write are not atomic. When the store write
//! keeps failing, the `(credential_id, tx_hash)` pair is queued in memory and
//! journaled, and a background task retries it on an interval. Attaching is
//! idempotent, so re-running reconciliation never re-writes the ledger and
//! never changes an already recorded credential.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::retry::{retry_async, RetryPolicy};
use crate::storage::{
    listing_key, AttachOutcome, CredentialCache, CredentialStore, PendingAnchor, StoreError,
};

/// Default interval between background drains.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);

pub struct Reconciler {
    store: Arc<dyn CredentialStore>,
    cache: Arc<CredentialCache>,
    /// credential_id → tx_hash
    pending: Mutex<HashMap<String, String>>,
    policy: RetryPolicy,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<CredentialCache>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            pending: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Attach `tx_hash` to the credential, retrying transient store failures.
    ///
    /// When retries run out the pair is queued for the background drain and
    /// the last error is returned. Rejections (conflicting hash, unknown
    /// credential) are returned without queuing.
    pub async fn reconcile(
        &self,
        credential_id: &str,
        tx_hash: &str,
    ) -> Result<AttachOutcome, StoreError> {
        let result = retry_async(&self.policy, "attach_transaction", StoreError::is_transient, || async {
            self.store.attach_transaction(credential_id, tx_hash)
        })
        .await;

        match result {
            Ok(outcome) => {
                self.forget(credential_id);
                self.invalidate_listings(credential_id);
                info!(credential_id, tx_hash, ?outcome, "Credential reconciled");
                Ok(outcome)
            }
            Err(e) if e.is_transient() => {
                error!(
                    credential_id,
                    tx_hash,
                    error = %e,
                    "Reconciliation failed, queued for retry"
                );
                self.enqueue(credential_id, tx_hash);
                Err(e)
            }
            Err(e) => {
                warn!(credential_id, tx_hash, error = %e, "Reconciliation rejected");
                Err(e)
            }
        }
    }

    /// Transaction hash awaiting attachment for this credential, if any.
    pub fn pending_for(&self, credential_id: &str) -> Option<String> {
        self.lock().get(credential_id).cloned()
    }

    pub fn pending(&self) -> Vec<PendingAnchor> {
        let mut pending: Vec<PendingAnchor> = self
            .lock()
            .iter()
            .map(|(credential_id, tx_hash)| PendingAnchor {
                credential_id: credential_id.clone(),
                tx_hash: tx_hash.clone(),
            })
            .collect();
        pending.sort_by(|a, b| a.credential_id.cmp(&b.credential_id));
        pending
    }

    /// Load the journal left by a previous run. Returns the number restored.
    pub fn restore(&self) -> Result<usize, StoreError> {
        let journaled = self.store.pending_anchors()?;
        let mut pending = self.lock();
        for entry in &journaled {
            pending.insert(entry.credential_id.clone(), entry.tx_hash.clone());
        }
        if !journaled.is_empty() {
            info!(count = journaled.len(), "Restored pending reconciliations");
        }
        Ok(journaled.len())
    }

    /// Try every queued pair once. Returns how many were recorded.
    pub fn drain(&self) -> usize {
        let queued = self.pending();
        let mut reconciled = 0;

        for PendingAnchor {
            credential_id,
            tx_hash,
        } in queued
        {
            match self.store.attach_transaction(&credential_id, &tx_hash) {
                Ok(outcome) => {
                    self.forget(&credential_id);
                    self.invalidate_listings(&credential_id);
                    info!(credential_id, tx_hash, ?outcome, "Queued credential reconciled");
                    reconciled += 1;
                }
                Err(e) if e.is_transient() => {
                    debug!(credential_id, error = %e, "Reconciliation still failing");
                }
                Err(e) => {
                    // Retrying cannot fix a rejection; drop it so it is not retried forever.
                    error!(credential_id, tx_hash, error = %e, "Dropping unreconcilable anchor");
                    self.forget(&credential_id);
                    if let Err(e) = self.store.clear_pending_anchor(&credential_id) {
                        warn!(credential_id, error = %e, "Failed to clear reconciliation journal");
                    }
                }
            }
        }
        reconciled
    }

    /// Run the drain loop until the cancellation token is triggered.
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        info!(interval_secs = interval.as_secs(), "Reconciler starting");

        loop {
            if shutdown.is_cancelled() {
                info!("Reconciler shutting down");
                return;
            }

            if !self.lock().is_empty() {
                let reconciled = self.drain();
                if reconciled > 0 {
                    info!(reconciled, "Reconciler pass complete");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Reconciler shutting down");
                    return;
                }
            }
        }
    }

    fn enqueue(&self, credential_id: &str, tx_hash: &str) {
        self.lock()
            .insert(credential_id.to_string(), tx_hash.to_string());
        let entry = PendingAnchor {
            credential_id: credential_id.to_string(),
            tx_hash: tx_hash.to_string(),
        };
        // The store is likely the thing failing; the in-memory queue still holds the pair.
        if let Err(e) = self.store.record_pending_anchor(&entry) {
            warn!(credential_id, error = %e, "Failed to journal pending reconciliation");
        }
    }

    fn forget(&self, credential_id: &str) {
        self.lock().remove(credential_id);
    }

    fn invalidate_listings(&self, credential_id: &str) {
        if let Ok(Some(credential)) = self.store.get_credential(credential_id) {
            self.cache.invalidate(&listing_key(&credential.issuer_id));
            self.cache.invalidate(&listing_key(&credential.recipient_id));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
