// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider event hub.
//!
//! The wallet provider's account and network can change out from under the
//! service. Every such change is published here:
//!
//! - observers registered with [`ProviderEvents::subscribe`] are called, and
//!   stay registered until their [`Subscription`] is unsubscribed or dropped
//! - the hub's epoch is bumped, so any operation holding an older
//!   [`EpochGuard`] refuses to submit against the new context

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info};

use super::gateway::GatewayError;
use super::types::ProviderContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The exposed account list changed (first entry is the active signer)
    AccountsChanged(Vec<String>),
    /// The provider switched to another chain id
    ChainChanged(u64),
}

type Listener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

#[derive(Default)]
pub struct ProviderEvents {
    registry: Mutex<Registry>,
    context: Mutex<ProviderContext>,
    epoch: AtomicU64,
}

impl ProviderEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It is removed when the returned handle is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        debug!(subscription_id = id, "Provider event listener registered");

        Subscription {
            id,
            events: Arc::downgrade(self),
            active: true,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Capture the current epoch before starting a chain operation.
    pub fn guard(&self) -> EpochGuard {
        EpochGuard {
            epoch: self.epoch(),
        }
    }

    pub fn context(&self) -> ProviderContext {
        self.context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the initial context without notifying anyone.
    pub fn seed(&self, context: ProviderContext) {
        *self.context.lock().unwrap_or_else(PoisonError::into_inner) = context;
    }

    /// Apply an event. Returns `false` when it changes nothing.
    pub fn publish(&self, event: ProviderEvent) -> bool {
        {
            let mut context = self.context.lock().unwrap_or_else(PoisonError::into_inner);
            match &event {
                ProviderEvent::AccountsChanged(accounts) => {
                    if context.accounts == *accounts {
                        return false;
                    }
                    context.accounts = accounts.clone();
                }
                ProviderEvent::ChainChanged(chain_id) => {
                    if context.chain_id == Some(*chain_id) {
                        return false;
                    }
                    context.chain_id = Some(*chain_id);
                }
            }
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(?event, epoch, "Provider context changed");

        // Call outside the lock so listeners may (un)subscribe.
        let listeners: Vec<Listener> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(&event);
        }
        true
    }

    fn remove(&self, id: u64) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.listeners.remove(&id).is_some() {
            debug!(subscription_id = id, "Provider event listener removed");
        }
    }
}

/// Handle for a registered observer.
pub struct Subscription {
    id: u64,
    events: Weak<ProviderEvents>,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(events) = self.events.upgrade() {
            events.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Epoch captured at the start of an operation.
#[derive(Debug, Clone, Copy)]
pub struct EpochGuard {
    epoch: u64,
}

impl EpochGuard {
    /// Fails with [`GatewayError::ContextChanged`] if an account or network
    /// change was published since the guard was taken.
    pub fn ensure_current(&self, events: &ProviderEvents) -> Result<(), GatewayError> {
        if events.epoch() == self.epoch {
            Ok(())
        } else {
            Err(GatewayError::ContextChanged)
        }
    }
}
