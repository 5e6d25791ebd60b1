// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token rejections.
//!
//! Every rejection except a missing verification key is a 401 carrying a
//! `WWW-Authenticate: Bearer` challenge, so wallet front-ends can prompt for
//! a fresh session token.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("a bearer token is required")]
    MissingAuthHeader,

    #[error("authorization header must be 'Bearer <token>'")]
    InvalidAuthHeader,

    #[error("session token could not be decoded")]
    MalformedToken,

    #[error("session token signature does not match")]
    InvalidSignature,

    #[error("session token has expired")]
    TokenExpired,

    #[error("session token was issued by an unknown party")]
    InvalidIssuer,

    #[error("session token is meant for another audience")]
    InvalidAudience,

    #[error("session token is not valid yet")]
    TokenNotYetValid,

    /// Tokens must name the user they were minted for.
    #[error("session token does not name a user")]
    MissingSubject,

    #[error("session token verification is not configured")]
    NotConfigured,
}

#[derive(Serialize)]
struct Rejection {
    error: String,
    code: &'static str,
}

impl AuthError {
    /// Stable machine-readable reason, echoed as `code` in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_token",
            AuthError::InvalidAuthHeader => "invalid_auth_scheme",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "bad_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "unknown_issuer",
            AuthError::InvalidAudience => "wrong_audience",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::MissingSubject => "missing_subject",
            AuthError::NotConfigured => "auth_not_configured",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(reason = self.code(), "rejecting request: {self}");
        } else {
            tracing::debug!(reason = self.code(), "rejecting request: {self}");
        }

        let mut response = (
            status,
            Json(Rejection {
                error: self.to_string(),
                code: self.code(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
