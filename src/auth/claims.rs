// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authenticated caller.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the caller's user id
    pub sub: String,

    /// Expiration timestamp
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Validated by jsonwebtoken when an audience is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,

    /// Session ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The caller of an authenticated request.
///
/// Roles are not carried in the token; they live on the stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.sid,
            email: claims.email,
            expires_at: claims.exp,
        }
    }
}
