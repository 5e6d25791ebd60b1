// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential endpoints.
//!
//! Issuance responses always carry the ledger receipt. When the transaction
//! could not be recorded yet, `reconciliation` is `pending`; the caller must
//! not issue again, the server finishes the attachment in the background or
//! through `POST /v1/credentials/{credential_id}/reconcile`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::reported;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{IssueBatchRequest, ReconcileRequest, ReconcileResponse};
use crate::rate_limit::RateLimitAction;
use crate::state::AppState;
use crate::storage::{CredentialRecord, VerificationRecord};
use crate::workflow::{BatchIssued, CredentialVerification, IssuedCredential, NewCredential};

#[utoipa::path(
    post,
    path = "/v1/credentials",
    tag = "Credentials",
    request_body = NewCredential,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Credential stored and anchored", body = IssuedCredential),
        (status = 400, description = "Invalid title, description or recipient"),
        (status = 403, description = "Caller is not an institution, or the signature was rejected"),
        (status = 422, description = "No linked wallet, or the transaction reverted"),
        (status = 429, description = "Too many issuances"),
        (status = 503, description = "No wallet provider configured"),
    )
)]
pub async fn issue_credential(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<NewCredential>,
) -> Result<(StatusCode, Json<IssuedCredential>), ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::IssueCredential)?;
    let issued = state
        .service
        .issue_credential(&user.user_id, request)
        .await
        .map_err(reported(&state))?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Anchor several credentials in one ledger transaction.
///
/// Any invalid entry rejects the whole batch before anything is written.
#[utoipa::path(
    post,
    path = "/v1/credentials/batch",
    tag = "Credentials",
    request_body = IssueBatchRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Batch stored and anchored", body = BatchIssued),
        (status = 400, description = "An entry failed validation; the message names its index"),
        (status = 403, description = "Caller is not an institution"),
        (status = 429, description = "Too many issuances"),
    )
)]
pub async fn issue_batch(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<IssueBatchRequest>,
) -> Result<(StatusCode, Json<BatchIssued>), ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::IssueCredential)?;
    let issued = state
        .service
        .issue_batch(&user.user_id, request.credentials)
        .await
        .map_err(reported(&state))?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Credentials the caller issued or received, newest first.
#[utoipa::path(
    get,
    path = "/v1/credentials",
    tag = "Credentials",
    security(("bearer" = [])),
    responses((status = 200, body = [CredentialRecord]))
)]
pub async fn list_credentials(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<CredentialRecord>>, ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::Default)?;
    let credentials = state
        .service
        .list_credentials(&user.user_id)
        .map_err(reported(&state))?;
    Ok(Json(credentials))
}

#[utoipa::path(
    get,
    path = "/v1/credentials/{credential_id}",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    tag = "Credentials",
    security(("bearer" = [])),
    responses(
        (status = 200, body = CredentialRecord),
        (status = 403, description = "Caller is neither issuer nor recipient"),
        (status = 404, description = "Unknown credential"),
    )
)]
pub async fn get_credential(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<CredentialRecord>, ApiError> {
    let credential = state
        .service
        .get_credential(&user.user_id, &credential_id)
        .map_err(reported(&state))?;
    Ok(Json(credential))
}

/// Submit a stored, not yet anchored credential to the ledger.
#[utoipa::path(
    post,
    path = "/v1/credentials/{credential_id}/anchor",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    tag = "Credentials",
    security(("bearer" = [])),
    responses(
        (status = 200, body = IssuedCredential),
        (status = 409, description = "Already anchored, or a reconciliation is pending"),
    )
)]
pub async fn anchor_credential(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<IssuedCredential>, ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::IssueCredential)?;
    let issued = state
        .service
        .anchor_credential(&user.user_id, &credential_id)
        .await
        .map_err(reported(&state))?;
    Ok(Json(issued))
}

/// Verify a stored credential against the ledger (employers only).
#[utoipa::path(
    post,
    path = "/v1/credentials/{credential_id}/verify",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    tag = "Credentials",
    security(("bearer" = [])),
    responses(
        (status = 200, body = CredentialVerification),
        (status = 403, description = "Caller is not an employer"),
        (status = 404, description = "Unknown credential"),
        (status = 429, description = "Too many verifications"),
    )
)]
pub async fn verify_credential(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<CredentialVerification>, ApiError> {
    state
        .rate_limiter
        .check(&user.user_id, RateLimitAction::VerifyCredential)?;
    let verification = state
        .service
        .verify_credential(&user.user_id, &credential_id)
        .await
        .map_err(reported(&state))?;
    Ok(Json(verification))
}

#[utoipa::path(
    post,
    path = "/v1/credentials/{credential_id}/revoke",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    tag = "Credentials",
    security(("bearer" = [])),
    responses(
        (status = 200, body = CredentialRecord),
        (status = 409, description = "Not anchored, or already revoked"),
    )
)]
pub async fn revoke_credential(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<CredentialRecord>, ApiError> {
    let revoked = state
        .service
        .revoke_credential(&user.user_id, &credential_id)
        .map_err(reported(&state))?;
    Ok(Json(revoked))
}

/// Record a transaction hash the ledger already confirmed. Never writes to the ledger.
#[utoipa::path(
    post,
    path = "/v1/credentials/{credential_id}/reconcile",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    request_body = ReconcileRequest,
    tag = "Credentials",
    security(("bearer" = [])),
    responses(
        (status = 200, body = ReconcileResponse),
        (status = 400, description = "Not a 32-byte transaction hash"),
        (status = 409, description = "A different transaction is recorded, or the store is still failing"),
        (status = 422, description = "The credential is not anchored on the ledger"),
    )
)]
pub async fn reconcile_credential(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let outcome = state
        .service
        .reconcile(&user.user_id, &credential_id, &request.tx_hash)
        .await
        .map_err(reported(&state))?;
    Ok(Json(ReconcileResponse {
        credential_id,
        tx_hash: request.tx_hash.trim().to_string(),
        outcome,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/credentials/{credential_id}/verifications",
    params(("credential_id" = String, Path, description = "Credential identifier")),
    tag = "Credentials",
    security(("bearer" = [])),
    responses((status = 200, body = [VerificationRecord]))
)]
pub async fn list_verifications(
    Path(credential_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<VerificationRecord>>, ApiError> {
    let verifications = state
        .service
        .list_verifications(&user.user_id, &credential_id)
        .map_err(reported(&state))?;
    Ok(Json(verifications))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::chain::InMemoryLedger;
    use crate::state::testing::test_state_with_ledger;
    use crate::storage::{AttachOutcome, CredentialStatus, UserRole};
    use crate::workflow::{NewUser, ReconciliationState};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn caller(id: &str) -> Auth {
        Auth(AuthenticatedUser {
            user_id: id.to_string(),
            session_id: None,
            email: None,
            expires_at: 0,
        })
    }

    fn setup() -> (AppState, Arc<InMemoryLedger>, TempDir) {
        let (state, ledger, dir) = test_state_with_ledger();
        let users = [
            ("INST-1", "registrar@uni.edu", UserRole::Institution, Some("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045")),
            ("STU-1", "student@uni.edu", UserRole::Student, None),
            ("EMP-1", "hr@corp.example", UserRole::Employer, None),
        ];
        for (id, email, role, wallet) in users {
            state
                .service
                .register_user(
                    id,
                    NewUser {
                        email: email.into(),
                        full_name: format!("{id} name"),
                        user_type: role,
                        wallet_address: wallet.map(String::from),
                    },
                )
                .unwrap();
        }
        (state, ledger, dir)
    }

    fn physics() -> NewCredential {
        NewCredential {
            recipient_email: "student@uni.edu".into(),
            title: "BSc Physics".into(),
            description: Some("First class honours".into()),
        }
    }

    #[tokio::test]
    async fn issue_list_and_fetch() {
        let (state, _ledger, _dir) = setup();

        let (status, Json(issued)) =
            issue_credential(State(state.clone()), caller("INST-1"), Json(physics()))
                .await
                .expect("issuance succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(issued.reconciliation, ReconciliationState::Reconciled);
        assert_eq!(issued.credential.status, CredentialStatus::Anchored);

        let Json(listed) = list_credentials(State(state.clone()), caller("STU-1"))
            .await
            .unwrap();
        assert_eq!(listed, vec![issued.credential.clone()]);

        let err = get_credential(
            Path(issued.credential.id.clone()),
            State(state),
            caller("EMP-1"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn rejected_signature_leaves_the_credential_created() {
        let (state, ledger, _dir) = setup();
        ledger.reject_next_write("User denied transaction signature.");

        let err = issue_credential(State(state.clone()), caller("INST-1"), Json(physics()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "User denied transaction signature.");

        let Json(listed) = list_credentials(State(state.clone()), caller("INST-1"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, CredentialStatus::Created);

        let Json(anchored) = anchor_credential(
            Path(listed[0].id.clone()),
            State(state),
            caller("INST-1"),
        )
        .await
        .expect("explicit anchoring succeeds");
        assert_eq!(anchored.credential.status, CredentialStatus::Anchored);
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent_over_http() {
        let (state, ledger, _dir) = setup();
        let (_, Json(issued)) =
            issue_credential(State(state.clone()), caller("INST-1"), Json(physics()))
                .await
                .unwrap();
        let id = issued.credential.id.clone();

        let Json(response) = reconcile_credential(
            Path(id.clone()),
            State(state.clone()),
            caller("INST-1"),
            Json(ReconcileRequest {
                tx_hash: issued.receipt.tx_hash.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.outcome, AttachOutcome::AlreadyAttached);

        let err = reconcile_credential(
            Path(id.clone()),
            State(state.clone()),
            caller("INST-1"),
            Json(ReconcileRequest {
                tx_hash: "0xdeadbeef".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = reconcile_credential(
            Path(id),
            State(state),
            caller("INST-1"),
            Json(ReconcileRequest {
                tx_hash: format!("0x{}", "ab".repeat(32)),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(ledger.write_count(), 1);
    }

    #[tokio::test]
    async fn verification_is_recorded_and_listed() {
        let (state, _ledger, _dir) = setup();
        let (_, Json(issued)) =
            issue_credential(State(state.clone()), caller("INST-1"), Json(physics()))
                .await
                .unwrap();
        let id = issued.credential.id.clone();

        let Json(verification) =
            verify_credential(Path(id.clone()), State(state.clone()), caller("EMP-1"))
                .await
                .unwrap();
        assert!(verification.is_valid);

        let err = verify_credential(Path(id.clone()), State(state.clone()), caller("STU-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(revoked) = revoke_credential(Path(id.clone()), State(state.clone()), caller("INST-1"))
            .await
            .unwrap();
        assert_eq!(revoked.status, CredentialStatus::Revoked);

        let Json(after) = verify_credential(Path(id.clone()), State(state.clone()), caller("EMP-1"))
            .await
            .unwrap();
        assert!(!after.is_valid);

        let Json(history) = list_verifications(Path(id), State(state), caller("STU-1"))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn invalid_batch_entry_names_its_index() {
        let (state, ledger, _dir) = setup();
        let mut bad = physics();
        bad.title = "BS".into();

        let err = issue_batch(
            State(state),
            caller("INST-1"),
            Json(IssueBatchRequest {
                credentials: vec![physics(), bad],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("batch entry 1"));
        assert_eq!(ledger.write_count(), 0);
    }
}
