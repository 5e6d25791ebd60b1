// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for the credential API.
//!
//! ## Auth Flow
//!
//! 1. The identity provider issues an HS256 JWT whose `sub` is the user id
//! 2. Clients send `Authorization: Bearer <JWT>`
//! 3. The server verifies signature, expiry, and optionally issuer and
//!    audience, then hands the handler an [`AuthenticatedUser`]
//!
//! What a caller may do is decided by the role on their stored profile, not
//! by token claims.
//!
//! ## Security
//!
//! - All endpoints except health, docs, and public hash checks require a token
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{verify_jwt, Auth};
