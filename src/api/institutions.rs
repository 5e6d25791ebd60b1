// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-chain institution registry.
//!
//! Writes are signed by the server's ledger account, so registering makes
//! that account the institution.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::reported;
use crate::auth::Auth;
use crate::chain::{AnchorReceipt, Institution};
use crate::error::ApiError;
use crate::state::AppState;
use crate::workflow::RegisterInstitution;

#[utoipa::path(
    post,
    path = "/v1/institutions",
    tag = "Institutions",
    request_body = RegisterInstitution,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Registration transaction confirmed", body = AnchorReceipt),
        (status = 403, description = "Caller is not an institution"),
        (status = 422, description = "Already registered"),
    )
)]
pub async fn register_institution(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<RegisterInstitution>,
) -> Result<(StatusCode, Json<AnchorReceipt>), ApiError> {
    let receipt = state
        .service
        .register_institution(&user.user_id, request)
        .await
        .map_err(reported(&state))?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Vouch for another registered institution.
#[utoipa::path(
    post,
    path = "/v1/institutions/{address}/verify",
    params(("address" = String, Path, description = "Institution account address")),
    tag = "Institutions",
    security(("bearer" = [])),
    responses(
        (status = 200, body = AnchorReceipt),
        (status = 422, description = "Unknown institution, own institution, or already vouched"),
    )
)]
pub async fn verify_institution(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<AnchorReceipt>, ApiError> {
    let receipt = state
        .service
        .verify_institution(&user.user_id, &address)
        .await
        .map_err(reported(&state))?;
    Ok(Json(receipt))
}

#[utoipa::path(
    get,
    path = "/v1/institutions/{address}",
    params(("address" = String, Path, description = "Institution account address")),
    tag = "Institutions",
    responses(
        (status = 200, body = Institution),
        (status = 400, description = "Malformed address"),
        (status = 404, description = "Not registered"),
    )
)]
pub async fn get_institution(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Institution>, ApiError> {
    let institution = state
        .service
        .institution(&address)
        .await
        .map_err(reported(&state))?;
    Ok(Json(institution))
}
