//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::health::HealthResponse;
use crate::service::BrokerService;

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::alive())
}

/// `POST /predict`: body is `{"fields": [...], "values": [...]}`.
///
/// The body is taken as raw bytes so malformed JSON gets the same error
/// envelope as any other validation failure.
async fn predict(State(service): State<Arc<BrokerService>>, body: Bytes) -> Response {
    match service.proxy().predict(&body).await {
        Ok(prediction) => (StatusCode::OK, Json(prediction)).into_response(),
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(error = %e, "Rejected prediction request");
            } else {
                tracing::error!(error = %e, "Prediction failed");
            }
            e.into_response()
        }
    }
}

pub fn routes(service: Arc<BrokerService>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/predict", post(predict))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::scheduler::ScheduledTask;
    use crate::self_ping::SelfPingJob;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn response_json(response: Response) -> serde_json::Value {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn predict_request(body: &'static str) -> Request<Body> {
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn config_for(server: &MockServer) -> BrokerConfig {
        BrokerConfig::default()
            .with_credential("route-key")
            .with_iam_url(format!("{}/identity/token", server.uri()))
            .with_deployment_url(format!("{}/predictions", server.uri()))
    }

    fn app(config: BrokerConfig) -> Router {
        routes(Arc::new(BrokerService::new(config).unwrap()))
    }

    async fn mount_identity(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "route-token"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn health_check_returns_status_and_time() {
        let response = app(BrokerConfig::default())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "Backend is alive");
        assert!(json["time"].is_string());
    }

    #[tokio::test]
    async fn predict_success_passes_body_through() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        let upstream = serde_json::json!({"predictions": [{"values": [[1, 0.13, 0.87]]}]});
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let response = app(config_for(&server))
            .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, upstream);
    }

    #[tokio::test]
    async fn predict_non_numeric_is_400_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app(config_for(&server))
            .oneshot(predict_request(r#"{"fields":["a","b"],"values":[1,"x"]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid input");
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn predict_malformed_json_is_400() {
        let response = app(BrokerConfig::default())
            .oneshot(predict_request("{\"fields\": ["))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid input");
    }

    #[tokio::test]
    async fn predict_without_deployment_is_500_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = BrokerConfig::default()
            .with_credential("k")
            .with_iam_url(format!("{}/identity/token", server.uri()));
        let response = app(config)
            .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Server misconfigured");
    }

    #[tokio::test]
    async fn predict_without_access_token_is_500_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"errorMessage": "Provided API key could not be found"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = app(config_for(&server))
            .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Authentication failed");
        assert!(!json.to_string().contains("could not be found"));
    }

    #[tokio::test]
    async fn predict_upstream_status_and_body_pass_through() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(422).set_body_string("wrong field count"))
            .mount(&server)
            .await;

        let response = app(config_for(&server))
            .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Model API call failed");
        assert_eq!(json["details"], "wrong field count");
    }

    #[tokio::test]
    async fn predict_slow_upstream_is_504() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = config_for(&server).with_predict_timeout(Duration::from_millis(100));
        let response = app(config)
            .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = response_json(response).await;
        assert_eq!(json["details"], "Request to model timed out.");
    }

    #[tokio::test]
    async fn failing_schedule_does_not_disturb_predictions() {
        let server = MockServer::start().await;
        mount_identity(&server).await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"predictions": []})),
            )
            .mount(&server)
            .await;

        // Pings an address nothing listens on, so every firing fails.
        let failing = ScheduledTask::spawn(
            Arc::new(SelfPingJob::new(reqwest::Client::new(), "http://127.0.0.1:1/")),
            Duration::from_millis(5),
        );

        let router = app(config_for(&server));
        let mut in_flight = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let router = router.clone();
            in_flight.spawn(async move {
                router
                    .oneshot(predict_request(r#"{"fields":["a"],"values":[1]}"#))
                    .await
            });
        }
        while let Some(result) = in_flight.join_next().await {
            assert_eq!(result.unwrap().unwrap().status(), StatusCode::OK);
        }

        assert!(!failing.is_finished());
        failing.shutdown().await;
    }
}
