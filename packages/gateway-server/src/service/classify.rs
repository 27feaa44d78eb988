//! Request classification: turns an untyped [`InboundCall`] into a typed
//! [`Route`].

use jobgate_core::{ExecuteServiceJob, IngestJob, JobType, RegisterServiceJob};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use super::operation::{GatewayError, InboundCall, ProxyRequest, Resource, Route};

// ---------------------------------------------------------------------------
// RequestClassifier
// ---------------------------------------------------------------------------

/// Parses inbound payloads into job kinds and picks their transport.
///
/// Status lookups go to the sync proxy; every other job kind is submitted
/// asynchronously. Pass-through calls are checked for a usable id and body.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestClassifier;

impl RequestClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify one call.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MalformedRequest`] if the body is not a JSON object
    ///   of a known job kind
    /// - [`GatewayError::MissingRequiredField`] if a mandatory field or path
    ///   id is absent or blank
    pub fn classify(&self, call: InboundCall) -> Result<Route, GatewayError> {
        match call {
            InboundCall::SubmitJob(body) => {
                let object = parse_object(&body)?;
                match object.get("jobType") {
                    Some(Value::String(_)) => {}
                    Some(_) => {
                        return Err(GatewayError::MalformedRequest(
                            "jobType must be a string".to_string(),
                        ))
                    }
                    None => {
                        return Err(GatewayError::MalformedRequest(
                            "request does not name a jobType".to_string(),
                        ))
                    }
                }
                route_job(from_object::<JobType>(object)?)
            }
            InboundCall::IngestData(body) => {
                route_job(JobType::Ingest(from_object::<IngestJob>(parse_object(&body)?)?))
            }
            InboundCall::RegisterService(body) => route_job(JobType::RegisterService(
                from_object::<RegisterServiceJob>(parse_object(&body)?)?,
            )),
            InboundCall::ExecuteService(body) => route_job(JobType::ExecuteService(
                from_object::<ExecuteServiceJob>(parse_object(&body)?)?,
            )),
            InboundCall::Proxy(request) => check_proxy(request).map(Route::Sync),
        }
    }
}

/// Validates a job and picks its transport.
fn route_job(job: JobType) -> Result<Route, GatewayError> {
    if let Some(field) = job.missing_field() {
        return Err(GatewayError::MissingRequiredField { field });
    }
    debug!(
        category = job.category(),
        query = job.is_query(),
        target_job = job.referenced_job_id(),
        "job classified"
    );

    match job {
        JobType::Get(get) => check_proxy(ProxyRequest::Fetch {
            resource: Resource::Job,
            id: get.job_id,
        })
        .map(Route::Sync),
        job @ (JobType::Ingest(_)
        | JobType::RegisterService(_)
        | JobType::ExecuteService(_)
        | JobType::Repeat(_)
        | JobType::Abort(_)) => Ok(Route::Async(job)),
    }
}

fn check_proxy(request: ProxyRequest) -> Result<ProxyRequest, GatewayError> {
    if let Some(id) = request.id() {
        if id.trim().is_empty() {
            return Err(GatewayError::MissingRequiredField {
                field: request.resource().id_field(),
            });
        }
        if !is_single_segment(id) {
            return Err(GatewayError::MalformedRequest(format!(
                "{} must be a single path segment",
                request.resource().id_field()
            )));
        }
    }

    match &request {
        ProxyRequest::Update { body, .. } => require_json(body, "update")?,
        ProxyRequest::Search { body, .. } => require_json(body, "search")?,
        _ => {}
    }

    Ok(request)
}

/// An id is appended to a backend URL as one segment; `.` and `..` would be
/// resolved away and separators would address a different item.
fn is_single_segment(id: &str) -> bool {
    id != "." && id != ".." && !id.contains(['/', '\\'])
}

fn require_json(body: &[u8], what: &str) -> Result<(), GatewayError> {
    if body.is_empty() || serde_json::from_slice::<Value>(body).is_ok() {
        Ok(())
    } else {
        Err(GatewayError::MalformedRequest(format!(
            "{what} body is not valid JSON"
        )))
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(GatewayError::MalformedRequest(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(GatewayError::MalformedRequest(e.to_string())),
    }
}

fn from_object<T: DeserializeOwned>(object: Map<String, Value>) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| GatewayError::MalformedRequest(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn submit(body: &Value) -> Result<Route, GatewayError> {
        RequestClassifier::new().classify(InboundCall::SubmitJob(Bytes::from(body.to_string())))
    }

    fn missing(result: Result<Route, GatewayError>) -> &'static str {
        match result {
            Err(GatewayError::MissingRequiredField { field }) => field,
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    // ----- POST /job -----

    #[test]
    fn get_with_id_is_sync_fetch() {
        let route = submit(&json!({"jobType": "get", "jobId": "j-1"})).unwrap();
        assert_eq!(
            route,
            Route::Sync(ProxyRequest::Fetch {
                resource: Resource::Job,
                id: "j-1".to_string(),
            })
        );
    }

    #[test]
    fn get_with_empty_id_is_missing_field() {
        assert_eq!(missing(submit(&json!({"jobType": "get", "jobId": ""}))), "jobId");
        assert_eq!(missing(submit(&json!({"jobType": "get"}))), "jobId");
    }

    #[test]
    fn non_query_kinds_are_async() {
        let bodies = [
            json!({"jobType": "ingest", "data": {"name": "soil"}}),
            json!({"jobType": "register-service", "url": "http://svc"}),
            json!({"jobType": "execute-service", "data": {"serviceId": "s-1"}}),
            json!({"jobType": "repeat", "jobId": "j-1"}),
            json!({"jobType": "abort", "jobId": "j-1", "reason": "stale"}),
        ];
        for body in &bodies {
            let route = submit(body).unwrap();
            assert!(matches!(route, Route::Async(_)), "{body}");
        }
    }

    #[test]
    fn async_kinds_check_mandatory_fields() {
        assert_eq!(missing(submit(&json!({"jobType": "ingest"}))), "data");
        assert_eq!(
            missing(submit(&json!({"jobType": "register-service", "url": " "}))),
            "url"
        );
        assert_eq!(
            missing(submit(&json!({"jobType": "execute-service", "data": {}}))),
            "serviceId"
        );
        assert_eq!(missing(submit(&json!({"jobType": "abort"}))), "jobId");
    }

    #[test]
    fn unknown_or_absent_job_type_is_malformed() {
        for body in [
            json!({"jobType": "launch", "jobId": "j-1"}),
            json!({"jobId": "j-1"}),
            json!({"jobType": 7}),
            json!(["get"]),
        ] {
            assert!(
                matches!(submit(&body), Err(GatewayError::MalformedRequest(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let result = submit(&json!({"jobType": "get", "jobId": 42}));
        assert!(matches!(result, Err(GatewayError::MalformedRequest(_))));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let result = RequestClassifier::new()
            .classify(InboundCall::SubmitJob(Bytes::from_static(b"{not json")));
        assert!(matches!(result, Err(GatewayError::MalformedRequest(_))));
    }

    // ----- untagged POST routes -----

    #[test]
    fn untagged_bodies_select_their_kind() {
        let classifier = RequestClassifier::new();

        let ingest = classifier
            .classify(InboundCall::IngestData(Bytes::from_static(
                br#"{"data": {"name": "x"}, "host": true}"#,
            )))
            .unwrap();
        assert!(matches!(ingest, Route::Async(JobType::Ingest(ref job)) if job.host));

        let register = classifier
            .classify(InboundCall::RegisterService(Bytes::from_static(
                br#"{"url": "http://svc", "method": "POST"}"#,
            )))
            .unwrap();
        assert!(matches!(register, Route::Async(JobType::RegisterService(_))));

        let execute = classifier
            .classify(InboundCall::ExecuteService(Bytes::from_static(
                br#"{"data": {"serviceId": "s-1", "dataInputs": {"a": 1}}}"#,
            )))
            .unwrap();
        assert!(matches!(execute, Route::Async(JobType::ExecuteService(_))));
    }

    #[test]
    fn untagged_missing_field() {
        let result = RequestClassifier::new()
            .classify(InboundCall::IngestData(Bytes::from_static(b"{}")));
        assert_eq!(missing(result), "data");
    }

    // ----- pass-through -----

    #[test]
    fn blank_path_id_is_missing_field() {
        let result = RequestClassifier::new().classify(InboundCall::Proxy(ProxyRequest::Delete {
            resource: Resource::Service,
            id: "  ".to_string(),
            query: None,
        }));
        assert_eq!(missing(result), "serviceId");
    }

    #[test]
    fn dot_segment_ids_are_malformed() {
        let classifier = RequestClassifier::new();
        for id in [".", "..", "a/b", "..\\x", "../job"] {
            let delete = classifier.classify(InboundCall::Proxy(ProxyRequest::Delete {
                resource: Resource::Service,
                id: id.to_string(),
                query: None,
            }));
            assert!(
                matches!(delete, Err(GatewayError::MalformedRequest(_))),
                "{id}"
            );

            let download = classifier.classify(InboundCall::Proxy(ProxyRequest::Download {
                id: id.to_string(),
                query: None,
            }));
            assert!(
                matches!(download, Err(GatewayError::MalformedRequest(_))),
                "{id}"
            );
        }

        let get = submit(&json!({"jobType": "get", "jobId": ".."}));
        assert!(matches!(get, Err(GatewayError::MalformedRequest(_))));
    }

    #[test]
    fn dotted_ids_that_are_not_dot_segments_pass() {
        for id in ["...", ".hidden", "v1.2", "a%2Fb"] {
            let route = RequestClassifier::new().classify(InboundCall::Proxy(ProxyRequest::Fetch {
                resource: Resource::Data,
                id: id.to_string(),
            }));
            assert!(matches!(route, Ok(Route::Sync(_))), "{id}");
        }
    }

    #[test]
    fn search_body_must_be_json() {
        let classifier = RequestClassifier::new();
        let search = |body: &'static [u8]| {
            classifier.classify(InboundCall::Proxy(ProxyRequest::Search {
                resource: Resource::Service,
                body: Bytes::from_static(body),
            }))
        };

        assert!(matches!(search(b"name=x"), Err(GatewayError::MalformedRequest(_))));
        assert!(matches!(search(br#"{"keyword": "soil"}"#), Ok(Route::Sync(_))));
        assert!(matches!(search(b""), Ok(Route::Sync(_))));
    }

    #[test]
    fn update_body_must_be_json() {
        let classifier = RequestClassifier::new();
        let update = |body: &'static [u8]| {
            classifier.classify(InboundCall::Proxy(ProxyRequest::Update {
                resource: Resource::Data,
                id: "d-1".to_string(),
                body: Bytes::from_static(body),
            }))
        };

        assert!(matches!(
            update(b"<xml/>"),
            Err(GatewayError::MalformedRequest(_))
        ));
        assert!(matches!(update(br#"{"name": "x"}"#), Ok(Route::Sync(_))));
        assert!(matches!(update(b""), Ok(Route::Sync(_))));
    }

    #[test]
    fn listing_passes_through() {
        let request = ProxyRequest::List {
            resource: Resource::Data,
            query: Some("page=2".to_string()),
        };
        let route = RequestClassifier::new()
            .classify(InboundCall::Proxy(request.clone()))
            .unwrap();
        assert_eq!(route, Route::Sync(request));
    }

    // ----- properties -----

    proptest! {
        #[test]
        fn query_with_id_is_never_async(id in "[A-Za-z0-9-]{1,36}") {
            let route = submit(&json!({"jobType": "get", "jobId": id})).unwrap();
            prop_assert!(matches!(route, Route::Sync(_)));
        }

        #[test]
        fn arbitrary_bytes_never_panic(body in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = RequestClassifier::new().classify(InboundCall::SubmitJob(Bytes::from(body)));
        }

        #[test]
        fn job_references_are_always_async(
            kind in prop_oneof![Just("repeat"), Just("abort")],
            id in "[a-z0-9]{1,16}",
        ) {
            let route = submit(&json!({"jobType": kind, "jobId": id})).unwrap();
            prop_assert!(matches!(route, Route::Async(_)));
        }
    }
}
