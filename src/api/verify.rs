// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public hash checks. Anyone holding a credential's fields can recompute its
//! hash and ask the ledger, so these endpoints need no token. They are rate
//! limited per client address instead.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    Json,
};

use super::reported;
use crate::chain::VerificationResult;
use crate::error::ApiError;
use crate::models::{BatchVerifyItem, BatchVerifyRequest, BatchVerifyResponse, CheckAnchorRequest};
use crate::rate_limit::{client_key, RateLimitAction};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/v1/verify",
    tag = "Verification",
    request_body = CheckAnchorRequest,
    responses(
        (status = 200, description = "What the ledger holds for this id", body = VerificationResult),
        (status = 429, description = "Too many checks from this address"),
        (status = 502, description = "Ledger unreachable after retries"),
        (status = 503, description = "No wallet provider configured"),
    )
)]
pub async fn check_anchor(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(request): Json<CheckAnchorRequest>,
) -> Result<Json<VerificationResult>, ApiError> {
    state
        .rate_limiter
        .check(&client_key(&addr), RateLimitAction::VerifyCredential)?;
    let result = state
        .service
        .check_anchor(&request.credential_id, &request.content_hash)
        .await
        .map_err(reported(&state))?;
    Ok(Json(result))
}

/// Check up to 100 `(credential id, hash)` pairs.
///
/// By default entries that could not be queried are left out of the result.
/// With `detailed: true` every entry is returned with its result or error.
#[utoipa::path(
    post,
    path = "/v1/verify/batch",
    tag = "Verification",
    request_body = BatchVerifyRequest,
    responses(
        (status = 200, body = BatchVerifyResponse),
        (status = 400, description = "Empty or oversized batch"),
        (status = 429, description = "Too many batches from this address"),
    )
)]
pub async fn verify_batch(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(request): Json<BatchVerifyRequest>,
) -> Result<Json<BatchVerifyResponse>, ApiError> {
    state
        .rate_limiter
        .check(&client_key(&addr), RateLimitAction::VerifyBatch)?;
    let response = if request.detailed {
        let outcomes = state
            .service
            .verify_batch_detailed(&request.entries)
            .await
            .map_err(reported(&state))?;
        BatchVerifyResponse::Detailed(outcomes.into_iter().map(BatchVerifyItem::from).collect())
    } else {
        let results = state
            .service
            .verify_batch(&request.entries)
            .await
            .map_err(reported(&state))?;
        BatchVerifyResponse::Results(results)
    };
    Ok(Json(response))
}
