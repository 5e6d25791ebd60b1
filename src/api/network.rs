// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::chain::GatewayError;
use crate::state::AppState;

/// Network the registry lives on and the account the server signs with.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NetworkInfo {
    pub name: String,
    /// `rpc` or `memory`
    pub backend: String,
    /// Configured chain id, if pinned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_chain_id: Option<u64>,
    /// Chain id the provider currently reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    /// Signing account; absent when no provider or account is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/network",
    tag = "Network",
    responses((status = 200, body = NetworkInfo))
)]
pub async fn network_info(State(state): State<AppState>) -> Json<NetworkInfo> {
    let account = match state.gateway.connect().await {
        Ok(account) => Some(account),
        Err(GatewayError::ProviderUnavailable) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Could not resolve the signing account");
            None
        }
    };
    let chain_id = state
        .gateway
        .provider_context()
        .await
        .ok()
        .and_then(|context| context.chain_id);

    Json(NetworkInfo {
        name: state.network.name.clone(),
        backend: state.gateway.backend().to_string(),
        expected_chain_id: state.network.chain_id,
        chain_id,
        explorer_url: state.network.explorer_url.clone(),
        account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::{DEFAULT_ACCOUNT, MEMORY_CHAIN_ID};
    use crate::state::testing::test_state_with_ledger;

    #[tokio::test]
    async fn reports_the_memory_ledger_account() {
        let (state, _ledger, _dir) = test_state_with_ledger();
        let Json(info) = network_info(State(state)).await;

        assert_eq!(info.backend, "memory");
        assert_eq!(info.chain_id, Some(MEMORY_CHAIN_ID));
        assert_eq!(info.account, Some(DEFAULT_ACCOUNT.to_string()));
    }

    #[tokio::test]
    async fn follows_a_network_switch() {
        let (state, ledger, _dir) = test_state_with_ledger();
        ledger.switch_network(11155111);
        let Json(info) = network_info(State(state)).await;
        assert_eq!(info.chain_id, Some(11155111));
    }
}
