mod integrations;
mod pipelines;
mod sync;
mod unresolved;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use leadflow_campaigns::CampaignsClient;
use leadflow_db::DbError;
use leadflow_sync::SyncEngine;
use leadflow_webhook::WebhookClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};
use crate::watchers::DetailWatchers;

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<SyncEngine<PgPool>>,
    pub watchers: DetailWatchers,
    pub webhook: WebhookClient,
    /// `None` when no campaign platform API key is configured.
    pub campaigns: Option<Arc<CampaignsClient>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    if matches!(error, DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Permissive unless an origin is given; the origin applies in production.
fn build_cors(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(CORS_MAX_AGE);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(error)) => {
            tracing::warn!(error = %error, "invalid CORS origin, allowing any origin");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/pipelines",
            get(pipelines::list_pipelines).post(pipelines::create_pipeline),
        )
        .route("/api/v1/pipelines/stats", get(pipelines::pipeline_stats))
        .route(
            "/api/v1/pipelines/{id}",
            get(pipelines::get_pipeline).delete(pipelines::delete_pipeline),
        )
        .route(
            "/api/v1/pipelines/{id}/launch",
            post(pipelines::launch_pipeline),
        )
        .route(
            "/api/v1/pipelines/{id}/contacts",
            get(pipelines::list_contacts),
        )
        .route(
            "/api/v1/pipelines/{id}/icebreakers",
            get(pipelines::icebreaker_stats),
        )
        .route("/api/v1/sync", get(sync::sync_status))
        .route(
            "/api/v1/unresolved-leads",
            get(unresolved::list_unresolved_leads),
        )
        .route(
            "/api/v1/unresolved-leads/{id}",
            delete(unresolved::delete_unresolved_lead),
        )
}

/// Routes the dashboard calls directly; bodies keep their original shapes.
fn integration_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/instantly/campaigns",
            get(integrations::list_platform_campaigns),
        )
        .route("/api/webhook", post(integrations::forward_webhook))
}

pub fn build_app(state: AppState, cors_origin: Option<&str>) -> Router {
    Router::new()
        .merge(api_router())
        .merge(integration_router())
        .layer(
            ServiceBuilder::new()
                .layer(build_cors(cors_origin))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match leadflow_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::test_support::{body_json, get, offline_state};
    use super::*;

    #[test]
    fn api_error_codes_map_to_statuses() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("not_found", StatusCode::NOT_FOUND),
            ("conflict", StatusCode::CONFLICT),
            ("upstream_error", StatusCode::BAD_GATEWAY),
            ("configuration_error", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            let response = ApiError::new("req-1", code, "message").into_response();
            assert_eq!(response.status(), status, "code {code}");
        }
    }

    #[test]
    fn map_db_error_distinguishes_missing_rows() {
        let not_found = map_db_error("req-1".to_string(), &DbError::NotFound);
        assert_eq!(not_found.error.code, "not_found");

        let failed = map_db_error("req-2".to_string(), &DbError::MissingDatabaseUrl);
        assert_eq!(failed.error.code, "internal_error");
        assert_eq!(failed.error.message, "database query failed");
    }

    #[test]
    fn error_details_are_omitted_when_absent() {
        let json = serde_json::to_value(ApiError::new("req-1", "not_found", "gone")).unwrap();
        assert!(json["error"].get("details").is_none());
        assert_eq!(json["meta"]["request_id"], "req-1");
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let app = build_app(offline_state(None, None), None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "req-abc"
        );
        let json = body_json(response).await;
        assert_eq!(json["meta"]["request_id"], "req-abc");
    }

    #[tokio::test]
    async fn preflight_is_answered_with_permissive_cors() {
        let app = build_app(offline_state(None, None), None);
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/webhook")
                    .header("origin", "https://dashboard.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
    }

    #[tokio::test]
    async fn production_origin_restricts_cors() {
        let app = build_app(
            offline_state(None, None),
            Some("https://leads.example.com"),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync")
                    .header("origin", "https://leads.example.com")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "https://leads.example.com"
        );
    }

    #[tokio::test]
    async fn malformed_pipeline_id_is_rejected() {
        let app = build_app(offline_state(None, None), None);
        let response = app
            .oneshot(get("/api/v1/pipelines/not-a-uuid"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
