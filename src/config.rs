// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `credentials.redb` | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `AUTH_JWT_SECRET` | HS256 secret for bearer tokens | Required for production |
//! | `AUTH_JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_JWT_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `CHAIN_BACKEND` | `rpc` or `memory` | `rpc` |
//! | `CHAIN_RPC_URL` | JSON-RPC endpoint; unset means no provider | unset |
//! | `CHAIN_ID` | Expected chain id | unset |
//! | `CHAIN_NAME` | Network display name | `Ethereum Sepolia` |
//! | `CHAIN_EXPLORER_URL` | Block explorer base URL | unset |
//! | `REGISTRY_CONTRACT_ADDRESS` | Credential registry contract | `0x65a2…b1f9` |
//! | `CHAIN_PRIVATE_KEY` | Local signing key (hex) | unset (node accounts) |
//! | `CHAIN_WATCH_INTERVAL_SECS` | Provider poll interval | `15` |
//! | `METADATA_BASE_URI` | Prefix for credential metadata URIs | `urn:credential:` |
//! | `CACHE_CAPACITY` / `CACHE_TTL_SECS` | Listing cache | `1024` / `300` |
//! | `RECONCILE_INTERVAL_SECS` | Reconciliation drain interval | `30` |
//! | `RETRY_MAX_ATTEMPTS` / `RETRY_BASE_MS` / `RETRY_MAX_MS` | Ledger read retry | `3` / `200` / `2000` |
//! | `ALERT_WEBHOOK_URL` | Monitoring alert endpoint | unset |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::NetworkConfig;
use crate::workflow::RetryPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const AUTH_JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const AUTH_JWT_ISSUER_ENV: &str = "AUTH_JWT_ISSUER";
pub const AUTH_JWT_AUDIENCE_ENV: &str = "AUTH_JWT_AUDIENCE";
pub const CHAIN_BACKEND_ENV: &str = "CHAIN_BACKEND";
pub const CHAIN_RPC_URL_ENV: &str = "CHAIN_RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const CHAIN_NAME_ENV: &str = "CHAIN_NAME";
pub const CHAIN_EXPLORER_URL_ENV: &str = "CHAIN_EXPLORER_URL";
pub const REGISTRY_CONTRACT_ADDRESS_ENV: &str = "REGISTRY_CONTRACT_ADDRESS";
pub const CHAIN_PRIVATE_KEY_ENV: &str = "CHAIN_PRIVATE_KEY";
pub const CHAIN_WATCH_INTERVAL_ENV: &str = "CHAIN_WATCH_INTERVAL_SECS";
pub const METADATA_BASE_URI_ENV: &str = "METADATA_BASE_URI";
pub const CACHE_CAPACITY_ENV: &str = "CACHE_CAPACITY";
pub const CACHE_TTL_ENV: &str = "CACHE_TTL_SECS";
pub const RECONCILE_INTERVAL_ENV: &str = "RECONCILE_INTERVAL_SECS";
pub const RETRY_MAX_ATTEMPTS_ENV: &str = "RETRY_MAX_ATTEMPTS";
pub const RETRY_BASE_MS_ENV: &str = "RETRY_BASE_MS";
pub const RETRY_MAX_MS_ENV: &str = "RETRY_MAX_MS";
pub const ALERT_WEBHOOK_URL_ENV: &str = "ALERT_WEBHOOK_URL";

pub const DEFAULT_REGISTRY_ADDRESS: &str = "0x65a22f0dd95924774c97d8768e43ddc59aacb1f9";
pub const DEFAULT_CHAIN_NAME: &str = "Ethereum Sepolia";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "credentials.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// A value that must not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([redacted])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainBackend {
    #[default]
    Rpc,
    Memory,
}

impl FromStr for ChainBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rpc" => Ok(ChainBackend::Rpc),
            "memory" => Ok(ChainBackend::Memory),
            other => Err(format!("unknown backend {other:?}, expected rpc or memory")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthSettings {
    pub jwt_secret: Option<Secret>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSettings {
    pub backend: ChainBackend,
    pub network: NetworkConfig,
    pub registry_address: String,
    pub private_key: Option<Secret>,
    pub watch_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub tls: Option<TlsPaths>,
    pub auth: AuthSettings,
    pub chain: ChainSettings,
    pub metadata_base_uri: String,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub reconcile_interval: Duration,
    pub read_retry: RetryPolicy,
    pub alert_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert_path: cert.into(),
                key_path: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let backend = match get(CHAIN_BACKEND_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: CHAIN_BACKEND_ENV,
                value: raw.clone(),
                reason,
            })?,
            None => ChainBackend::default(),
        };

        let retry_attempts: u32 = parse_or(&get, RETRY_MAX_ATTEMPTS_ENV, 3)?;
        let retry_base_ms: u64 = parse_or(&get, RETRY_BASE_MS_ENV, 200)?;
        let retry_max_ms: u64 = parse_or(&get, RETRY_MAX_MS_ENV, 2000)?;

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, PORT_ENV, 8080)?,
            data_dir: get(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string()).into(),
            log_format,
            tls,
            auth: AuthSettings {
                jwt_secret: get(AUTH_JWT_SECRET_ENV).map(Secret),
                issuer: get(AUTH_JWT_ISSUER_ENV),
                audience: get(AUTH_JWT_AUDIENCE_ENV),
            },
            chain: ChainSettings {
                backend,
                network: NetworkConfig {
                    name: get(CHAIN_NAME_ENV).unwrap_or_else(|| DEFAULT_CHAIN_NAME.to_string()),
                    chain_id: parse_opt(&get, CHAIN_ID_ENV)?,
                    rpc_url: get(CHAIN_RPC_URL_ENV),
                    explorer_url: get(CHAIN_EXPLORER_URL_ENV),
                },
                registry_address: get(REGISTRY_CONTRACT_ADDRESS_ENV)
                    .unwrap_or_else(|| DEFAULT_REGISTRY_ADDRESS.to_string()),
                private_key: get(CHAIN_PRIVATE_KEY_ENV).map(Secret),
                watch_interval: Duration::from_secs(parse_or(&get, CHAIN_WATCH_INTERVAL_ENV, 15)?),
            },
            metadata_base_uri: get(METADATA_BASE_URI_ENV)
                .unwrap_or_else(|| "urn:credential:".to_string()),
            cache_capacity: parse_or(&get, CACHE_CAPACITY_ENV, 1024)?,
            cache_ttl: Duration::from_secs(parse_or(&get, CACHE_TTL_ENV, 300)?),
            reconcile_interval: Duration::from_secs(parse_or(&get, RECONCILE_INTERVAL_ENV, 30)?),
            read_retry: RetryPolicy::new(
                retry_attempts,
                Duration::from_millis(retry_base_ms),
                Duration::from_millis(retry_max_ms),
            ),
            alert_webhook_url: get(ALERT_WEBHOOK_URL_ENV),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_opt<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get(var)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    Ok(parse_opt(get, var)?.unwrap_or(default))
}
