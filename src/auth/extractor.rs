// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `Auth` extractor: resolves the calling user from a bearer token.
//!
//! ```rust,ignore
//! async fn issue(State(state): State<AppState>, Auth(caller): Auth) -> ApiResult<...> {
//!     state.service.issue_credential(&caller.user_id, ...).await
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::claims::TokenClaims;
use super::{AuthError, AuthenticatedUser};
use crate::state::{AppState, AuthConfig};

/// Tolerated clock skew between the identity provider and this server.
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Authenticated caller.
///
/// With `AUTH_JWT_SECRET` configured the token must carry a valid HS256
/// signature, an unexpired `exp`, and the configured issuer and audience.
/// Without a secret, tokens are only decoded when the `dev` feature is on;
/// otherwise every request is rejected.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Set by test harnesses and any upstream auth layer.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Auth(user.clone()));
        }

        let token = bearer_token(&parts.headers)?;
        verify_jwt(token, &state.auth_config).map(Auth)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        }
    }
}

/// Verify a bearer token and resolve the caller it names.
pub fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let claims = match auth_config.decoding_key() {
        Some(key) => decode_signed(token, key, auth_config)?,
        None => decode_unverified(token)?,
    };

    if claims.sub.trim().is_empty() {
        return Err(AuthError::MissingSubject);
    }
    Ok(AuthenticatedUser::from_claims(claims))
}

fn decode_signed(token: &str, key: &DecodingKey, auth_config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    if let Some(issuer) = &auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &auth_config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    Ok(decode::<TokenClaims>(token, key, &validation)?.claims)
}

/// Decodes claims without checking the signature. Only built with `dev`.
#[cfg(feature = "dev")]
fn decode_unverified(token: &str) -> Result<TokenClaims, AuthError> {
    let claims = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?
        .claims;

    let cutoff = chrono::Utc::now().timestamp() - CLOCK_SKEW_LEEWAY as i64;
    if claims.exp > 0 && claims.exp < cutoff {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

#[cfg(not(feature = "dev"))]
fn decode_unverified(_token: &str) -> Result<TokenClaims, AuthError> {
    tracing::error!("AUTH_JWT_SECRET is not set; rejecting bearer token");
    Err(AuthError::NotConfigured)
}
