//! tower-http layers applied to the whole axum router.

use axum::http::header::HeaderName;
use axum::http::Method;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<
            CompressionLayer,
            tower::layer::util::Stack<
                TraceLayer<
                    tower_http::classify::SharedClassifier<
                        tower_http::classify::ServerErrorsAsFailures,
                    >,
                >,
                tower::layer::util::Stack<
                    SetRequestIdLayer<MakeRequestUuid>,
                    tower::layer::util::Identity,
                >,
            >,
        >,
    >,
>;

/// HTTP layers wrapped around every route, outermost first: request id
/// assignment, request tracing, gzip, CORS, then request id echo on the
/// response.
///
/// There is no HTTP-level timeout. Outbound calls carry their own and every
/// flow ends in an envelope.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(config))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Origins that fail to parse as header values are skipped.
fn build_cors_layer(config: &NetworkConfig) -> CorsLayer {
    let allow_origin = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| origin.trim().parse().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn preflight_from_listed_origin_is_allowed() {
        let config = NetworkConfig {
            cors_origins: vec!["https://console.example.com".to_string(), "not a header\n".to_string()],
            ..NetworkConfig::default()
        };
        let app = Router::new()
            .route("/job", get(|| async { "ok" }))
            .layer(build_http_layers(&config));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/job")
                    .header("origin", "https://console.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://console.example.com"
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(build_http_layers(&NetworkConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn caller_request_id_is_preserved() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(build_http_layers(&NetworkConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }
}
