// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-caller request limits.
//!
//! Fixed one-minute windows keyed by `{caller}:{action}`. The first request
//! after a window expires opens a new one. Authenticated callers are keyed by
//! user id, anonymous ones by [`client_key`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Windows kept before expired ones are swept.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    IssueCredential,
    VerifyCredential,
    /// One public batch check; each fans out to up to 100 ledger reads
    VerifyBatch,
    UpdateUser,
    Default,
}

impl RateLimitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RateLimitAction::IssueCredential => "credential:issue",
            RateLimitAction::VerifyCredential => "credential:verify",
            RateLimitAction::VerifyBatch => "credential:verify_batch",
            RateLimitAction::UpdateUser => "user:update",
            RateLimitAction::Default => "api:default",
        }
    }

    /// Requests allowed per window.
    pub fn limit(self) -> u32 {
        match self {
            RateLimitAction::IssueCredential => 10,
            RateLimitAction::VerifyCredential => 20,
            RateLimitAction::VerifyBatch => 5,
            RateLimitAction::UpdateUser => 5,
            RateLimitAction::Default => 30,
        }
    }
}

/// Caller key for unauthenticated requests.
pub fn client_key(addr: &SocketAddr) -> String {
    format!("ip:{}", addr.ip())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded, retry in {}s", .retry_after.as_secs().max(1))]
pub struct RateLimited {
    pub retry_after: Duration,
}

struct Window {
    count: u32,
    started: Instant,
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Count one request from `caller` against `action`'s limit.
    pub fn check(&self, caller: &str, action: RateLimitAction) -> Result<(), RateLimited> {
        let now = Instant::now();
        let key = format!("{caller}:{}", action.as_str());
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        if windows.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        match windows.get_mut(&key) {
            Some(w) if now.duration_since(w.started) < self.window => {
                if w.count >= action.limit() {
                    let retry_after = self.window.saturating_sub(now.duration_since(w.started));
                    warn!(caller, action = action.as_str(), "Rate limit exceeded");
                    return Err(RateLimited { retry_after });
                }
                w.count += 1;
            }
            _ => {
                windows.insert(
                    key,
                    Window {
                        count: 1,
                        started: now,
                    },
                );
            }
        }
        Ok(())
    }

    pub fn reset(&self, caller: &str, action: RateLimitAction) {
        let key = format!("{caller}:{}", action.as_str());
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::default();
        for _ in 0..10 {
            assert!(limiter.check("inst-1", RateLimitAction::IssueCredential).is_ok());
        }
        let err = limiter
            .check("inst-1", RateLimitAction::IssueCredential)
            .unwrap_err();
        assert!(err.retry_after <= RATE_LIMIT_WINDOW);
    }

    #[test]
    fn callers_and_actions_have_separate_windows() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            limiter.check("a", RateLimitAction::UpdateUser).unwrap();
        }
        assert!(limiter.check("a", RateLimitAction::UpdateUser).is_err());
        assert!(limiter.check("b", RateLimitAction::UpdateUser).is_ok());
        assert!(limiter.check("a", RateLimitAction::VerifyCredential).is_ok());
    }

    #[test]
    fn window_expiry_and_reset_open_a_new_window() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        for _ in 0..5 {
            limiter.check("a", RateLimitAction::UpdateUser).unwrap();
        }
        assert!(limiter.check("a", RateLimitAction::UpdateUser).is_err());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("a", RateLimitAction::UpdateUser).is_ok());

        for _ in 0..4 {
            limiter.check("a", RateLimitAction::UpdateUser).unwrap();
        }
        limiter.reset("a", RateLimitAction::UpdateUser);
        assert!(limiter.check("a", RateLimitAction::UpdateUser).is_ok());
    }

    #[test]
    fn anonymous_callers_are_keyed_by_ip() {
        let first: SocketAddr = "203.0.113.7:50000".parse().unwrap();
        let same_host: SocketAddr = "203.0.113.7:50001".parse().unwrap();
        assert_eq!(client_key(&first), "ip:203.0.113.7");
        assert_eq!(client_key(&first), client_key(&same_host));
    }

    #[test]
    fn limits_per_action() {
        assert_eq!(RateLimitAction::IssueCredential.limit(), 10);
        assert_eq!(RateLimitAction::VerifyCredential.limit(), 20);
        assert_eq!(RateLimitAction::VerifyBatch.limit(), 5);
        assert_eq!(RateLimitAction::UpdateUser.limit(), 5);
        assert_eq!(RateLimitAction::Default.limit(), 30);
    }
}
