// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    chain::{
        AnchorReceipt, BatchVerifyEntry, Institution, InstitutionStatus, VerificationResult,
    },
    error::ApiError,
    models::{
        BatchVerifyItem, BatchVerifyRequest, BatchVerifyResponse, CheckAnchorRequest,
        HealthChecks, HealthResponse, IssueBatchRequest, LinkWalletRequest, ReadyResponse,
        ReconcileRequest, ReconcileResponse,
    },
    state::AppState,
    storage::{
        AttachOutcome, CredentialRecord, CredentialStatus, UserRecord, UserRole,
        VerificationRecord, VerificationStatus,
    },
    workflow::{
        BatchIssued, CredentialVerification, IssuedCredential, NewCredential, NewUser,
        ReconciliationState, RegisterInstitution,
    },
};

pub mod credentials;
pub mod health;
pub mod institutions;
pub mod network;
pub mod users;
pub mod verify;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Convert a failure into its response, counting server errors towards alerts.
pub(crate) fn reported<E: Into<ApiError>>(state: &AppState) -> impl FnOnce(E) -> ApiError + '_ {
    move |e| e.into().report(&state.monitor)
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/users", post(users::register_user))
        .route("/users/me", get(users::get_current_user))
        .route("/users/me/wallet", put(users::link_wallet))
        .route(
            "/credentials",
            get(credentials::list_credentials).post(credentials::issue_credential),
        )
        .route("/credentials/batch", post(credentials::issue_batch))
        .route("/credentials/{credential_id}", get(credentials::get_credential))
        .route(
            "/credentials/{credential_id}/anchor",
            post(credentials::anchor_credential),
        )
        .route(
            "/credentials/{credential_id}/verify",
            post(credentials::verify_credential),
        )
        .route(
            "/credentials/{credential_id}/revoke",
            post(credentials::revoke_credential),
        )
        .route(
            "/credentials/{credential_id}/reconcile",
            post(credentials::reconcile_credential),
        )
        .route(
            "/credentials/{credential_id}/verifications",
            get(credentials::list_verifications),
        )
        .route("/verify", post(verify::check_anchor))
        .route("/verify/batch", post(verify::verify_batch))
        .route("/institutions", post(institutions::register_institution))
        .route("/institutions/{address}", get(institutions::get_institution))
        .route(
            "/institutions/{address}/verify",
            post(institutions::verify_institution),
        )
        .route("/network", get(network::network_info));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::register_user,
        users::get_current_user,
        users::link_wallet,
        credentials::issue_credential,
        credentials::issue_batch,
        credentials::list_credentials,
        credentials::get_credential,
        credentials::anchor_credential,
        credentials::verify_credential,
        credentials::revoke_credential,
        credentials::reconcile_credential,
        credentials::list_verifications,
        verify::check_anchor,
        verify::verify_batch,
        institutions::register_institution,
        institutions::verify_institution,
        institutions::get_institution,
        network::network_info
    ),
    components(
        schemas(
            AuthenticatedUser,
            UserRecord,
            UserRole,
            NewUser,
            LinkWalletRequest,
            CredentialRecord,
            CredentialStatus,
            NewCredential,
            IssueBatchRequest,
            IssuedCredential,
            BatchIssued,
            ReconciliationState,
            ReconcileRequest,
            ReconcileResponse,
            AttachOutcome,
            AnchorReceipt,
            CredentialVerification,
            VerificationRecord,
            VerificationStatus,
            VerificationResult,
            CheckAnchorRequest,
            BatchVerifyEntry,
            BatchVerifyRequest,
            BatchVerifyItem,
            BatchVerifyResponse,
            RegisterInstitution,
            Institution,
            InstitutionStatus,
            network::NetworkInfo,
            HealthResponse,
            ReadyResponse,
            HealthChecks
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Profiles and wallet linking"),
        (name = "Credentials", description = "Issuance, anchoring, revocation and reconciliation"),
        (name = "Verification", description = "Public content hash checks against the ledger"),
        (name = "Institutions", description = "On-chain institution registry"),
        (name = "Network", description = "Ledger network information")
    )
)]
struct ApiDoc;
