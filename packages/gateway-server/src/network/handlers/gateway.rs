//! Gateway routes: job submission, data and service registries, and job
//! status pass-through.
//!
//! | Method | Path | Call |
//! |---|---|---|
//! | POST | `/job` | tagged job body |
//! | GET/PUT/DELETE | `/job/{id}` | job status, repeat, abort |
//! | POST | `/v2/job` | service execution |
//! | GET/POST | `/data` | listing / ingest |
//! | POST | `/data/query` | data search |
//! | GET/PUT/DELETE | `/data/{id}` | data metadata |
//! | GET | `/file/{id}` | data file bytes |
//! | GET/POST | `/service` | listing / registration |
//! | POST | `/service/query` | service search |
//! | GET/PUT/DELETE | `/service/{id}` | service metadata |
//!
//! Extractor rejections are rendered as error envelopes too, through
//! [`Payload`] and [`ItemId`].

use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, RawQuery, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use jobgate_core::ErrorEnvelope;
use tracing::debug;

use super::AppState;
use crate::service::{Component, GatewayError, InboundCall, ProxyRequest, Resource};

/// Request body bytes. Rejections become error envelopes, 413 for bodies
/// over the configured limit.
pub struct Payload(pub Bytes);

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Bytes::from_request(req, state)
            .await
            .map(Self)
            .map_err(|rejection| body_rejection(&rejection).into_response())
    }
}

fn body_rejection(rejection: &BytesRejection) -> GatewayError {
    debug!(status = %rejection.status(), "request body rejected");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge
    } else {
        GatewayError::MalformedRequest(rejection.body_text())
    }
}

/// The `{id}` path segment, percent-decoded.
pub struct ItemId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ItemId {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<String>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|rejection: PathRejection| {
                GatewayError::MalformedRequest(rejection.body_text()).into_response()
            })
    }
}

/// Routes served by the gateway pipeline, plus the envelope-shaped fallback.
pub fn gateway_routes() -> Router<AppState> {
    Router::new()
        .route("/job", post(submit_job))
        .route("/job/{id}", get(job::fetch).put(job::update).delete(job::delete))
        .route("/v2/job", post(execute_service))
        .route("/data", get(data::list).post(ingest_data))
        .route("/data/query", post(data::search))
        .route(
            "/data/{id}",
            get(data::fetch).put(data::update).delete(data::delete),
        )
        .route("/file/{id}", get(download_file))
        .route("/service", get(service::list).post(register_service))
        .route("/service/query", post(service::search))
        .route(
            "/service/{id}",
            get(service::fetch).put(service::update).delete(service::delete),
        )
        .fallback(not_found)
}

async fn submit_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(body): Payload,
) -> Response {
    state.dispatch(&headers, InboundCall::SubmitJob(body)).await
}

async fn ingest_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(body): Payload,
) -> Response {
    state.dispatch(&headers, InboundCall::IngestData(body)).await
}

async fn register_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(body): Payload,
) -> Response {
    state.dispatch(&headers, InboundCall::RegisterService(body)).await
}

async fn execute_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Payload(body): Payload,
) -> Response {
    state.dispatch(&headers, InboundCall::ExecuteService(body)).await
}

/// Pass-through handlers for one backend resource family.
macro_rules! resource_handlers {
    ($module:ident, $resource:expr) => {
        mod $module {
            use super::*;

            #[allow(dead_code)]
            pub(super) async fn list(
                State(state): State<AppState>,
                headers: HeaderMap,
                RawQuery(query): RawQuery,
            ) -> Response {
                let request = ProxyRequest::List {
                    resource: $resource,
                    query,
                };
                state.dispatch(&headers, InboundCall::Proxy(request)).await
            }

            pub(super) async fn fetch(
                State(state): State<AppState>,
                headers: HeaderMap,
                ItemId(id): ItemId,
            ) -> Response {
                let request = ProxyRequest::Fetch {
                    resource: $resource,
                    id,
                };
                state.dispatch(&headers, InboundCall::Proxy(request)).await
            }

            pub(super) async fn update(
                State(state): State<AppState>,
                headers: HeaderMap,
                ItemId(id): ItemId,
                Payload(body): Payload,
            ) -> Response {
                let request = ProxyRequest::Update {
                    resource: $resource,
                    id,
                    body,
                };
                state.dispatch(&headers, InboundCall::Proxy(request)).await
            }

            #[allow(dead_code)]
            pub(super) async fn search(
                State(state): State<AppState>,
                headers: HeaderMap,
                Payload(body): Payload,
            ) -> Response {
                let request = ProxyRequest::Search {
                    resource: $resource,
                    body,
                };
                state.dispatch(&headers, InboundCall::Proxy(request)).await
            }

            pub(super) async fn delete(
                State(state): State<AppState>,
                headers: HeaderMap,
                ItemId(id): ItemId,
                RawQuery(query): RawQuery,
            ) -> Response {
                let request = ProxyRequest::Delete {
                    resource: $resource,
                    id,
                    query,
                };
                state.dispatch(&headers, InboundCall::Proxy(request)).await
            }
        }
    };
}

resource_handlers!(job, Resource::Job);
resource_handlers!(data, Resource::Data);
resource_handlers!(service, Resource::Service);

async fn download_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    ItemId(id): ItemId,
    RawQuery(query): RawQuery,
) -> Response {
    let request = ProxyRequest::Download { id, query };
    state.dispatch(&headers, InboundCall::Proxy(request)).await
}

/// Fallback for a known path with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    let envelope = ErrorEnvelope::new(
        format!("method {method} not allowed on {}", uri.path()),
        Component::Gateway.as_str(),
        None,
    );
    (StatusCode::METHOD_NOT_ALLOWED, Json(envelope)).into_response()
}

async fn not_found(method: Method, uri: Uri) -> Response {
    let envelope = ErrorEnvelope::new(
        format!("no route for {method} {}", uri.path()),
        Component::Gateway.as_str(),
        None,
    );
    (StatusCode::NOT_FOUND, Json(envelope)).into_response()
}
