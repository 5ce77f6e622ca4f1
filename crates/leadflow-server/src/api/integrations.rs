//! The two endpoints the dashboard calls directly.
//!
//! - `GET /api/instantly/campaigns`: campaign directory of the cold-email
//!   platform, `{ "campaigns": [...] }`
//! - `POST /api/webhook`: forwards a launch body to the
//!   workflow engine, `{ "success": true, "data": "..." }`
//!
//! Both keep their flat `{ "error": ... }` bodies instead of the `/api/v1`
//! envelope.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadflow_webhook::{has_required_fields, WebhookError};
use serde_json::{json, Value};

use super::AppState;

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// GET /api/instantly/campaigns
pub(super) async fn list_platform_campaigns(State(state): State<AppState>) -> Response {
    let Some(client) = state.campaigns.as_deref() else {
        tracing::error!("INSTANTLY_API_KEY is not set");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "campaign platform API key is not configured" }),
        );
    };

    match client.list_campaigns().await {
        Ok(campaigns) => {
            tracing::debug!(count = campaigns.len(), "campaign directory served");
            Json(json!({ "campaigns": campaigns })).into_response()
        }
        Err(error) => {
            tracing::error!(error = %error, "campaign listing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "failed to fetch campaigns",
                    "details": error.to_string(),
                }),
            )
        }
    }
}

/// POST /api/webhook
pub(super) async fn forward_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!(error = %error, "webhook body is not JSON");
            return send_failed();
        }
    };

    if !has_required_fields(&payload) {
        return error_response(StatusCode::BAD_REQUEST, json!({ "error": "missing data" }));
    }

    tracing::info!(
        id = %payload["id"],
        nom = %payload["nom"],
        "forwarding webhook to workflow engine"
    );

    match state.webhook.dispatch(&payload).await {
        Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
        Err(WebhookError::NotConfigured) => {
            tracing::error!("N8N_WEBHOOK_URL is not set");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "webhook configuration missing" }),
            )
        }
        Err(error) => {
            tracing::error!(error = %error, "webhook forwarding failed");
            send_failed()
        }
    }
}

fn send_failed() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "failed to send webhook" }),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json as body_json_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::build_app;
    use super::super::test_support::{body_json, get, json_request, offline_state};

    fn launch_body() -> serde_json::Value {
        json!({
            "id": "5b0c7a0e-3c1d-4e55-9f8a-2f5e1d9c4b21",
            "nom": "Bordeaux retail",
            "url": "{\"totalResults\":25}",
            "consigne": "",
            "type_de_campagne": "linkedin",
            "id_campagne": "",
            "timestamp": "2025-03-01T10:30:00.000Z",
            "action": "process_pipeline_criteria"
        })
    }

    #[tokio::test]
    async fn campaigns_without_api_key_is_a_500() {
        let app = build_app(offline_state(None, None), None);
        let response = app
            .oneshot(get("/api/instantly/campaigns"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "campaign platform API key is not configured");
    }

    #[tokio::test]
    async fn campaigns_are_reduced_to_id_name_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/campaigns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "c-1", "name": "Founders", "status": 1, "daily_limit": 30 }],
                "next_starting_after": "c-1"
            })))
            .mount(&server)
            .await;

        let app = build_app(offline_state(None, Some(&server.uri())), None);
        let response = app
            .oneshot(get("/api/instantly/campaigns"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({ "campaigns": [{ "id": "c-1", "name": "Founders", "status": 1 }] })
        );
    }

    #[tokio::test]
    async fn campaigns_upstream_failure_carries_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let app = build_app(offline_state(None, Some(&server.uri())), None);
        let response = app
            .oneshot(get("/api/instantly/campaigns"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "failed to fetch campaigns");
        assert!(json["details"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn webhook_rejects_missing_fields() {
        let app = build_app(offline_state(None, None), None);
        let mut body = launch_body();
        body["nom"] = json!("");

        let response = app
            .oneshot(json_request("POST", "/api/webhook", &body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({ "error": "missing data" }));
    }

    #[tokio::test]
    async fn webhook_without_url_is_a_configuration_error() {
        let app = build_app(offline_state(None, None), None);
        let response = app
            .oneshot(json_request("POST", "/api/webhook", &launch_body()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "webhook configuration missing");
    }

    #[tokio::test]
    async fn webhook_forwards_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/leads"))
            .and(body_json_matcher(launch_body()))
            .respond_with(ResponseTemplate::new(200).set_body_string("Workflow was started"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/webhook/leads", server.uri());
        let app = build_app(offline_state(Some(&url), None), None);
        let response = app
            .oneshot(json_request("POST", "/api/webhook", &launch_body()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "data": "Workflow was started" })
        );
    }

    #[tokio::test]
    async fn webhook_upstream_error_is_a_generic_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let app = build_app(offline_state(Some(&server.uri()), None), None);
        let response = app
            .oneshot(json_request("POST", "/api/webhook", &launch_body()))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "failed to send webhook" })
        );
    }
}
