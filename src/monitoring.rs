// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error monitoring and alerting.
//!
//! Server-side failures are counted by message. When one message reaches
//! [`ALERT_THRESHOLD`] occurrences an alert is raised (logged, and posted to
//! `ALERT_WEBHOOK_URL` when configured) and its counter starts over.
//!
//! Messages embed ids, so the counters live in a bounded LRU: a message that
//! stops recurring is eventually evicted instead of being kept forever.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use lru::LruCache;
use serde::Serialize;
use tracing::{error, warn};

/// Occurrences of one error message that trigger an alert.
pub const ALERT_THRESHOLD: u32 = 3;

/// Distinct messages counted at once.
pub const DEFAULT_TRACKED_MESSAGES: usize = 1024;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AlertPayload {
    pub message: String,
    pub count: u32,
    pub timestamp: String,
}

struct AlertWebhook {
    url: String,
    client: reqwest::Client,
}

pub struct Monitor {
    error_counts: Mutex<LruCache<String, u32>>,
    alerts_sent: AtomicU64,
    webhook: Option<AlertWebhook>,
}

impl Monitor {
    /// A monitor that only logs alerts.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TRACKED_MESSAGES)
    }

    /// Log-only monitor tracking at most `capacity` distinct messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            error_counts: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            alerts_sent: AtomicU64::new(0),
            webhook: None,
        }
    }

    /// Also post alerts to `url`. Falls back to log-only if no HTTP client can be built.
    pub fn with_webhook(url: impl Into<String>) -> Self {
        let url = url.into();
        let webhook = match reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => Some(AlertWebhook { url, client }),
            Err(e) => {
                warn!(error = %e, "Failed to build alert webhook client, alerts will only be logged");
                None
            }
        };
        Self {
            webhook,
            ..Self::new()
        }
    }

    /// Count one occurrence. Returns the alert when this one crossed the threshold.
    pub fn record_error(&self, message: &str) -> Option<AlertPayload> {
        let count = {
            let mut counts = self
                .error_counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let reached = counts.peek(message).copied().unwrap_or(0) + 1;
            if reached >= ALERT_THRESHOLD {
                counts.pop(message);
            } else {
                counts.put(message.to_string(), reached);
            }
            reached
        };

        if count < ALERT_THRESHOLD {
            return None;
        }

        let alert = AlertPayload {
            message: format!("Alert: {message}"),
            count,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        error!(message, count, "Error threshold reached");
        self.dispatch(alert.clone());
        Some(alert)
    }

    /// Occurrences counted since the last alert for this message.
    pub fn error_count(&self, message: &str) -> u32 {
        self.error_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peek(message)
            .copied()
            .unwrap_or(0)
    }

    /// Distinct messages currently counted.
    pub fn tracked_messages(&self) -> usize {
        self.error_counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn alerts_sent(&self) -> u64 {
        self.alerts_sent.load(Ordering::Relaxed)
    }

    fn dispatch(&self, alert: AlertPayload) {
        let Some(webhook) = &self.webhook else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, alert webhook skipped");
            return;
        };

        let client = webhook.client.clone();
        let url = webhook.url.clone();
        runtime.spawn(async move {
            match client.post(&url).json(&alert).send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    warn!(status = %response.status(), "Alert webhook rejected the alert");
                }
                Err(e) => warn!(error = %e, "Failed to send alert"),
            }
        });
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_on_the_third_identical_error_and_resets() {
        let monitor = Monitor::new();
        assert!(monitor.record_error("store unavailable").is_none());
        assert!(monitor.record_error("store unavailable").is_none());
        assert_eq!(monitor.error_count("store unavailable"), 2);

        let alert = monitor.record_error("store unavailable").unwrap();
        assert_eq!(alert.count, 3);
        assert_eq!(alert.message, "Alert: store unavailable");
        assert_eq!(monitor.error_count("store unavailable"), 0);
        assert_eq!(monitor.alerts_sent(), 1);

        // Counting starts over.
        assert!(monitor.record_error("store unavailable").is_none());
    }

    #[test]
    fn messages_are_counted_separately() {
        let monitor = Monitor::new();
        monitor.record_error("a");
        monitor.record_error("a");
        assert!(monitor.record_error("b").is_none());
        assert_eq!(monitor.error_count("a"), 2);
        assert_eq!(monitor.error_count("b"), 1);
    }

    #[test]
    fn one_off_messages_are_evicted() {
        let monitor = Monitor::with_capacity(2);
        monitor.record_error("credential c1 not found");
        monitor.record_error("credential c2 not found");
        monitor.record_error("credential c3 not found");

        assert_eq!(monitor.tracked_messages(), 2);
        assert_eq!(monitor.error_count("credential c1 not found"), 0);
        assert_eq!(monitor.error_count("credential c3 not found"), 1);
    }

    #[tokio::test]
    async fn unreachable_webhook_does_not_fail_the_caller() {
        let monitor = Monitor::with_webhook("http://127.0.0.1:9/alerts");
        for _ in 0..3 {
            monitor.record_error("rpc down");
        }
        assert_eq!(monitor.alerts_sent(), 1);
    }
}
