// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::chain::GatewayError;
use crate::models::{HealthChecks, HealthResponse, ReadyResponse};
use crate::state::AppState;

fn check_store(state: &AppState) -> String {
    match state.store.health_check() {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            "error".to_string()
        }
    }
}

/// Provider reachability. A missing provider degrades anchoring only, so it
/// is reported but does not fail readiness.
async fn check_provider(state: &AppState) -> (String, Option<u64>) {
    match state.gateway.provider_context().await {
        Ok(context) if context.accounts.is_empty() => ("no_accounts".to_string(), context.chain_id),
        Ok(context) => ("ok".to_string(), context.chain_id),
        Err(GatewayError::ProviderUnavailable) => ("unavailable".to_string(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Provider health check failed");
            ("error".to_string(), None)
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 when the store is usable, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let store = check_store(&state);
    let (provider, chain_id) = check_provider(&state).await;
    let all_ok = store == "ok";

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            store,
            provider,
            backend: state.gateway.backend().to_string(),
            network: state.network.name.clone(),
            chain_id,
            pending_reconciliations: state.service.reconciler().pending().len(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn health_reports_store_and_memory_provider() {
        let (state, _dir) = test_state();
        let (status, Json(body)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.store, "ok");
        assert_eq!(body.checks.provider, "ok");
        assert_eq!(body.checks.backend, "memory");
        assert_eq!(body.checks.chain_id, Some(crate::chain::memory::MEMORY_CHAIN_ID));
        assert_eq!(body.checks.pending_reconciliations, 0);
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }
}
