// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::chain::GatewayError;
use crate::monitoring::Monitor;
use crate::rate_limit::RateLimited;
use crate::workflow::WorkflowError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Seconds until a rate-limited caller may retry
    pub retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }

    /// Count server-side failures towards the alert threshold.
    pub fn report(self, monitor: &Monitor) -> Self {
        if self.status.is_server_error() {
            monitor.record_error(&self.message);
        }
        self
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        let message = e.to_string();
        match e {
            GatewayError::ProviderUnavailable | GatewayError::NoAccounts => {
                Self::service_unavailable(message)
            }
            GatewayError::UserRejected(_) => Self::forbidden(message),
            GatewayError::WrongNetwork { .. } | GatewayError::ContextChanged => {
                Self::conflict(message)
            }
            GatewayError::Reverted(_)
            | GatewayError::TransactionFailed(_)
            | GatewayError::InvalidAddress(_) => Self::unprocessable(message),
            GatewayError::InvalidInput(_) => Self::bad_request(message),
            GatewayError::Rpc(_) => Self::bad_gateway(message),
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        let message = e.to_string();
        match e {
            WorkflowError::Validation(_)
            | WorkflowError::InvalidInput(_)
            | WorkflowError::InvalidBatch { .. } => Self::bad_request(message),
            WorkflowError::NotFound(_) => Self::not_found(message),
            WorkflowError::Forbidden(_) => Self::forbidden(message),
            WorkflowError::Precondition(_) => Self::unprocessable(message),
            WorkflowError::Conflict(_) | WorkflowError::ReconciliationPending { .. } => {
                Self::conflict(message)
            }
            WorkflowError::Gateway(gateway) => gateway.into(),
            WorkflowError::Encode(_) | WorkflowError::Store(_) => {
                tracing::error!(error = %message, "Request failed on an internal error");
                Self::internal(message)
            }
        }
    }
}

impl From<RateLimited> for ApiError {
    fn from(e: RateLimited) -> Self {
        Self::too_many_requests(e.to_string(), e.retry_after.as_secs().max(1))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::time::Duration;

    use crate::credential::ValidationError;
    use crate::storage::StoreError;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unp = ApiError::unprocessable("oops");
        assert_eq!(unp.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(unp.message, "oops");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn workflow_errors_map_to_statuses() {
        let cases = [
            (WorkflowError::Validation(ValidationError::TitleLength), StatusCode::BAD_REQUEST),
            (
                WorkflowError::InvalidBatch {
                    index: 2,
                    reason: "bad".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (WorkflowError::NotFound("credential c1".into()), StatusCode::NOT_FOUND),
            (WorkflowError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (WorkflowError::Precondition("wallet".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                WorkflowError::ReconciliationPending {
                    credential_id: "c1".into(),
                    tx_hash: "0xabc".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                WorkflowError::Store(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn gateway_errors_map_to_statuses() {
        let cases = [
            (GatewayError::ProviderUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::NoAccounts, StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::UserRejected("User denied".into()), StatusCode::FORBIDDEN),
            (GatewayError::ContextChanged, StatusCode::CONFLICT),
            (GatewayError::Reverted("Not verified".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (GatewayError::Rpc("timeout".into()), StatusCode::BAD_GATEWAY),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(WorkflowError::Gateway(error)).status, status);
        }
    }

    #[test]
    fn user_rejection_keeps_the_provider_message() {
        let err: ApiError = WorkflowError::Gateway(GatewayError::UserRejected(
            "MetaMask Tx Signature: User denied transaction signature.".into(),
        ))
        .into();
        assert_eq!(
            err.message,
            "MetaMask Tx Signature: User denied transaction signature."
        );
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let err: ApiError = RateLimited {
            retry_after: Duration::from_secs(42),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn only_server_errors_are_reported() {
        let monitor = Monitor::new();
        let _ = ApiError::not_found("x").report(&monitor);
        assert_eq!(monitor.error_count("x"), 0);
        let _ = ApiError::internal("boom").report(&monitor);
        assert_eq!(monitor.error_count("boom"), 1);
    }
}
