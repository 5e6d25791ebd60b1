// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use credential_anchor_server::{
    api::router,
    chain::{ChainGateway, ChainWatcher, InMemoryLedger, ProviderEvent, ProviderEvents, RpcGateway},
    config::{AppConfig, ChainBackend},
    logging::init_tracing,
    monitoring::Monitor,
    state::{AppState, AuthConfig},
    storage::{CredentialCache, CredentialDatabase, CredentialStore},
    workflow::{CredentialService, Reconciler, ServiceConfig},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Time given to in-flight requests once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<(), BoxError> {
    // Install the ring crypto provider for rustls before any TLS operation
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let store: Arc<dyn CredentialStore> =
        Arc::new(CredentialDatabase::open(&config.database_path())?);
    info!(path = %config.database_path().display(), "Credential database opened");

    let events = Arc::new(ProviderEvents::new());
    let gateway: Arc<dyn ChainGateway> = match config.chain.backend {
        ChainBackend::Memory => {
            warn!("Using the in-memory ledger; anchors are lost on restart");
            Arc::new(InMemoryLedger::new(events.clone()))
        }
        ChainBackend::Rpc => Arc::new(RpcGateway::new(
            config.chain.network.clone(),
            &config.chain.registry_address,
            config.chain.private_key.as_ref().map(|key| key.expose()),
            events.clone(),
        )?),
    };

    let cache = Arc::new(CredentialCache::new(config.cache_capacity, config.cache_ttl));
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        cache.clone(),
        config.read_retry,
    ));
    reconciler.restore()?;

    // Listings may reference state from the previous network
    let _chain_subscription = {
        let cache = cache.clone();
        events.subscribe(move |event| {
            if let ProviderEvent::ChainChanged(chain_id) = event {
                cache.clear();
                info!(chain_id, "Network changed, listing cache cleared");
            }
        })
    };

    let service = Arc::new(CredentialService::new(
        store.clone(),
        gateway.clone(),
        cache,
        reconciler.clone(),
        ServiceConfig {
            metadata_base_uri: config.metadata_base_uri.clone(),
            read_retry: config.read_retry,
        },
    ));

    let monitor = match &config.alert_webhook_url {
        Some(url) => Monitor::with_webhook(url.clone()),
        None => Monitor::new(),
    };
    if config.auth.jwt_secret.is_none() {
        warn!("AUTH_JWT_SECRET is not set; authenticated endpoints will reject requests");
    }

    let state = AppState::new(service, store, events.clone(), config.chain.network.clone())
        .with_auth_config(AuthConfig::from_settings(&config.auth))
        .with_monitor(monitor);
    let app = router(state);

    // Background tasks share one shutdown token
    let shutdown = CancellationToken::new();
    let watcher = ChainWatcher::new(gateway, events).with_interval(config.chain.watch_interval);
    let watcher_task = tokio::spawn(watcher.run(shutdown.clone()));
    let reconciler_task = tokio::spawn(reconciler.run(config.reconcile_interval, shutdown.clone()));

    let handle = Handle::new();
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if !shutdown_signal().await {
                return;
            }
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    let addr: SocketAddr = config.bind_address().parse()?;
    let served = match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
            info!(%addr, network = %config.chain.network.name, "Credential service listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
        None => {
            info!(%addr, network = %config.chain.network.name, "Credential service listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service_with_connect_info::<SocketAddr>())
                .await
        }
    };

    shutdown.cancel();
    for task in [watcher_task, reconciler_task] {
        if let Err(e) = task.await {
            warn!(error = %e, "Background task ended abnormally");
        }
    }

    served?;
    info!("Credential service stopped");
    Ok(())
}

/// Wait for Ctrl+C. Returns false if the signal cannot be observed.
async fn shutdown_signal() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to listen for the shutdown signal");
            false
        }
    }
}
