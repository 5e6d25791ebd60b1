// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::reported;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::LinkWalletRequest;
use crate::rate_limit::RateLimitAction;
use crate::state::AppState;
use crate::storage::UserRecord;
use crate::workflow::NewUser;

/// Create the caller's profile. The user id is the token subject.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    request_body = NewUser,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Profile created", body = UserRecord),
        (status = 400, description = "Invalid email, name or wallet"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 409, description = "Id, email or wallet already registered"),
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::UpdateUser)?;
    let record = state
        .service
        .register_user(&user.user_id, request)
        .map_err(reported(&state))?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserRecord),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No profile for this subject"),
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<UserRecord>, ApiError> {
    let record = state
        .service
        .current_user(&user.user_id)
        .map_err(reported(&state))?;
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/v1/users/me/wallet",
    tag = "Users",
    request_body = LinkWalletRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Wallet linked", body = UserRecord),
        (status = 400, description = "Malformed address"),
        (status = 409, description = "Wallet belongs to another user"),
        (status = 429, description = "Too many profile updates"),
    )
)]
pub async fn link_wallet(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<LinkWalletRequest>,
) -> Result<Json<UserRecord>, ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::UpdateUser)?;
    let record = state
        .service
        .link_wallet(&user.user_id, &request.wallet_address)
        .map_err(reported(&state))?;
    Ok(Json(record))
}
