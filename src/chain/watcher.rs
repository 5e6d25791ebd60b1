// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Provider Watcher
//!
//! JSON-RPC nodes do not push `accountsChanged` / `chainChanged` the way an
//! injected wallet does, so this task polls the provider context and
//! publishes differences to the [`ProviderEvents`] hub.
//!
//! The first successful poll only seeds the hub. Later differences bump the
//! hub epoch, which aborts writes that were prepared against the old context.
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown, like the
//! reconciler.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{ProviderEvent, ProviderEvents};
use super::gateway::{ChainGateway, GatewayError};

/// Default interval between provider polls.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(15);

pub struct ChainWatcher {
    gateway: Arc<dyn ChainGateway>,
    events: Arc<ProviderEvents>,
    poll_interval: Duration,
    seeded: bool,
}

impl ChainWatcher {
    pub fn new(gateway: Arc<dyn ChainGateway>, events: Arc<ProviderEvents>) -> Self {
        Self {
            gateway,
            events,
            poll_interval: DEFAULT_WATCH_INTERVAL,
            seeded: false,
        }
    }

    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the watcher loop until the cancellation token is triggered.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            backend = self.gateway.backend(),
            "Chain watcher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Chain watcher shutting down");
                return;
            }

            self.poll_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Chain watcher shutting down");
                    return;
                }
            }
        }
    }

    /// Poll once. Returns the number of events published.
    pub async fn poll_step(&mut self) -> usize {
        let context = match self.gateway.provider_context().await {
            Ok(context) => context,
            Err(GatewayError::ProviderUnavailable) => {
                debug!("Chain watcher: no provider configured");
                return 0;
            }
            Err(e) => {
                warn!(error = %e, "Chain watcher: failed to read provider context");
                return 0;
            }
        };

        if !self.seeded {
            debug!(chain_id = ?context.chain_id, accounts = context.accounts.len(), "Chain watcher seeded");
            self.events.seed(context);
            self.seeded = true;
            return 0;
        }

        let mut published = 0;
        if let Some(chain_id) = context.chain_id {
            if self.events.publish(ProviderEvent::ChainChanged(chain_id)) {
                published += 1;
            }
        }
        if self
            .events
            .publish(ProviderEvent::AccountsChanged(context.accounts))
        {
            published += 1;
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::InMemoryLedger;
    use crate::chain::rpc::RpcGateway;
    use crate::chain::types::NetworkConfig;
    use alloy::primitives::Address;

    #[tokio::test]
    async fn detects_network_and_account_switches() {
        // The ledger publishes to its own hub; the watcher must notice on its own.
        let ledger = Arc::new(InMemoryLedger::new(Arc::new(ProviderEvents::new())));
        let watched = Arc::new(ProviderEvents::new());
        let mut watcher = ChainWatcher::new(ledger.clone(), watched.clone());

        assert_eq!(watcher.poll_step().await, 0);
        assert_eq!(watched.epoch(), 0);
        assert_eq!(watcher.poll_step().await, 0);

        ledger.switch_network(11155111);
        assert_eq!(watcher.poll_step().await, 1);
        assert_eq!(watched.context().chain_id, Some(11155111));

        ledger.switch_account(Address::repeat_byte(0x42));
        assert_eq!(watcher.poll_step().await, 1);
        assert_eq!(watched.epoch(), 2);
    }

    #[tokio::test]
    async fn missing_provider_is_quiet() {
        let events = Arc::new(ProviderEvents::new());
        let gateway = RpcGateway::new(
            NetworkConfig {
                name: "none".into(),
                chain_id: None,
                rpc_url: None,
                explorer_url: None,
            },
            "0x65a22f0dd95924774c97d8768e43ddc59aacb1f9",
            None,
            events.clone(),
        )
        .unwrap();
        let mut watcher = ChainWatcher::new(Arc::new(gateway), events.clone());
        assert_eq!(watcher.poll_step().await, 0);
        assert_eq!(events.epoch(), 0);
    }

    #[tokio::test]
    async fn stops_on_cancellation() {
        let events = Arc::new(ProviderEvents::new());
        let ledger = Arc::new(InMemoryLedger::new(events.clone()));
        let watcher =
            ChainWatcher::new(ledger, events).with_interval(Duration::from_millis(5));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(shutdown.clone()));
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
