// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Every component is built once by the composition root in `main.rs` and
//! handed to the router here; nothing is a global.

use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use crate::chain::{ChainGateway, NetworkConfig, ProviderEvents};
use crate::config::AuthSettings;
use crate::monitoring::Monitor;
use crate::rate_limit::RateLimiter;
use crate::storage::CredentialStore;
use crate::workflow::CredentialService;

/// Bearer token verification settings.
#[derive(Clone, Default)]
pub struct AuthConfig {
    decoding_key: Option<DecodingKey>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn hs256(secret: &str) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(secret.as_bytes())),
            issuer: None,
            audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        let base = match &settings.jwt_secret {
            Some(secret) => Self::hs256(secret.expose()),
            None => Self::default(),
        };
        Self {
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            ..base
        }
    }

    pub fn decoding_key(&self) -> Option<&DecodingKey> {
        self.decoding_key.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.decoding_key.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CredentialService>,
    pub store: Arc<dyn CredentialStore>,
    pub gateway: Arc<dyn ChainGateway>,
    pub events: Arc<ProviderEvents>,
    pub network: NetworkConfig,
    pub rate_limiter: Arc<RateLimiter>,
    pub monitor: Arc<Monitor>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(
        service: Arc<CredentialService>,
        store: Arc<dyn CredentialStore>,
        events: Arc<ProviderEvents>,
        network: NetworkConfig,
    ) -> Self {
        let gateway = service.gateway().clone();
        Self {
            service,
            store,
            gateway,
            events,
            network,
            rate_limiter: Arc::new(RateLimiter::default()),
            monitor: Arc::new(Monitor::new()),
            auth_config: AuthConfig::default(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.monitor = Arc::new(monitor);
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Arc::new(rate_limiter);
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::time::Duration;

    use jsonwebtoken::{encode, EncodingKey, Header};
    use tempfile::TempDir;

    use crate::auth::TokenClaims;
    use crate::chain::InMemoryLedger;
    use crate::storage::{CredentialCache, CredentialDatabase, DEFAULT_CACHE_TTL};
    use crate::workflow::{Reconciler, RetryPolicy, ServiceConfig};

    pub const TEST_JWT_SECRET: &str = "test-secret";

    /// State backed by a temp redb and the in-memory ledger.
    pub fn test_state() -> (AppState, TempDir) {
        let (state, _, dir) = test_state_with_ledger();
        (state, dir)
    }

    pub fn test_state_with_ledger() -> (AppState, Arc<InMemoryLedger>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn CredentialStore> =
            Arc::new(CredentialDatabase::open(&dir.path().join("credentials.redb")).unwrap());
        let events = Arc::new(ProviderEvents::new());
        let ledger = Arc::new(InMemoryLedger::new(events.clone()));
        let cache = Arc::new(CredentialCache::new(64, DEFAULT_CACHE_TTL));
        let fast = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2));
        let reconciler = Arc::new(Reconciler::new(store.clone(), cache.clone(), fast));
        let service = Arc::new(CredentialService::new(
            store.clone(),
            ledger.clone(),
            cache,
            reconciler,
            ServiceConfig {
                read_retry: fast,
                ..ServiceConfig::default()
            },
        ));
        let network = NetworkConfig {
            name: "Local devnet".into(),
            chain_id: None,
            rpc_url: None,
            explorer_url: None,
        };

        let state = AppState::new(service, store, events, network)
            .with_auth_config(AuthConfig::hs256(TEST_JWT_SECRET));
        (state, ledger, dir)
    }

    /// A valid bearer token for `user_id`.
    pub fn token_for(user_id: &str) -> String {
        let claims = TokenClaims {
            sub: user_id.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: None,
            iss: None,
            aud: None,
            sid: None,
            email: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[test]
    fn auth_config_from_settings() {
        let unset = AuthConfig::from_settings(&AuthSettings::default());
        assert!(!unset.is_configured());

        let settings = AuthSettings {
            jwt_secret: Some(Secret::new("s3cret")),
            issuer: Some("https://auth.example".into()),
            audience: None,
        };
        let config = AuthConfig::from_settings(&settings);
        assert!(config.is_configured());
        assert_eq!(config.issuer.as_deref(), Some("https://auth.example"));
    }
}
