//! Facade behavior against in-memory engines.
//!
//! # Design
//! `Recorder` is a transport that stores every `HttpRequest` it receives and
//! answers with a canned response, so tests can assert on exactly what
//! reached the wire. `StubEngine` replaces the bundled engine entirely to
//! show the facade forwards calls without adding behavior.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use api_client::{
    ApiClient, Body, Client, ClientError, ClientInstance, Engine, HttpEngine, HttpMethod,
    HttpRequest, HttpResponse, Interceptor, Interceptors, RequestConfig, Response, ResponseData,
    Transport, FORM_URLENCODED,
};

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl Recorder {
    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn last(&self) -> HttpRequest {
        self.requests().pop().expect("no request reached the transport")
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.seen.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: r#"{"ok":true}"#.to_string(),
        })
    }
}

fn api() -> (ApiClient<Client<Recorder>>, Recorder) {
    let recorder = Recorder::default();
    let engine = Engine::new(recorder.clone());
    let api = ApiClient::new(
        &engine,
        RequestConfig::default().with_base_url("https://example.com"),
    )
    .unwrap();
    (api, recorder)
}

// ---------------------------------------------------------------------------
// Construction and defaults
// ---------------------------------------------------------------------------

#[test]
fn construction_failure_propagates_from_engine() {
    let engine = Engine::new(Recorder::default());
    let err = ApiClient::new(&engine, RequestConfig::default().with_base_url("relative/path"))
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfig(_)));
}

#[test]
fn set_defaults_round_trips() {
    let (mut api, _) = api();
    let replacement = RequestConfig::default()
        .with_base_url("https://other.test")
        .with_timeout_ms(100)
        .with_header("X-Env", "staging");
    api.set_defaults(replacement.clone());
    assert_eq!(api.defaults(), &replacement);
}

#[tokio::test]
async fn defaults_mut_edits_live_state() {
    let (mut api, recorder) = api();
    api.defaults_mut()
        .headers
        .common
        .insert("X-Test".to_string(), "test".to_string());
    api.defaults_mut().timeout_ms = Some(1_000);

    assert_eq!(api.defaults().headers.get("x-test"), Some("test"));
    api.get("/items", RequestConfig::default()).await.unwrap();
    assert_eq!(recorder.last().header("X-Test"), Some("test"));
}

#[test]
fn get_uri_resolves_against_defaults() {
    let (api, _) = api();
    let uri = api
        .get_uri(RequestConfig::default().with_url("/x"))
        .unwrap();
    assert_eq!(uri, "https://example.com/x");

    let uri = api
        .get_uri(RequestConfig::default().with_url("/search").with_param("q", "rust"))
        .unwrap();
    assert_eq!(uri, "https://example.com/search?q=rust");
}

// ---------------------------------------------------------------------------
// Interceptor registration
// ---------------------------------------------------------------------------

#[test]
fn interceptor_ids_are_distinct() {
    let (mut api, _) = api();
    let first = api.add_request_interceptor(Interceptor::new(|c| async move { Ok(c) }));
    let second = api.add_request_interceptor(Interceptor::new(|c| async move { Ok(c) }));
    assert_ne!(first, second);
    assert_eq!(api.interceptors().request.len(), 2);
}

#[test]
fn remove_interceptor_twice_is_safe() {
    let (mut api, _) = api();
    let id = api.add_request_interceptor(Interceptor::new(|c| async move { Ok(c) }));
    api.remove_request_interceptor(id);
    api.remove_request_interceptor(id);
    assert!(api.interceptors().request.is_empty());

    let id = api.add_response_interceptor(Interceptor::new(|r| async move { Ok(r) }));
    api.remove_response_interceptor(id);
    api.remove_response_interceptor(id);
    assert!(api.interceptors().response.is_empty());
}

#[tokio::test]
async fn foreign_id_ejects_same_slot_of_other_instance() {
    let (mut first, _) = api();
    let (mut second, recorder) = api();

    let first_a = first.add_request_interceptor(Interceptor::new(|c| async move { Ok(c) }));
    let first_b = first.add_request_interceptor(Interceptor::new(|c| async move { Ok(c) }));
    second.add_request_interceptor(Interceptor::new(|config: RequestConfig| async move {
        Ok(config.with_header("X-Second", "1"))
    }));

    // Slot 1 does not exist on `second`.
    second.remove_request_interceptor(first_b);
    assert_eq!(second.interceptors().request.len(), 1);

    // Slot 0 does, so it is ejected there.
    second.remove_request_interceptor(first_a);
    assert!(second.interceptors().request.is_empty());
    assert_eq!(first.interceptors().request.len(), 2);

    second.get("/items", RequestConfig::default()).await.unwrap();
    assert_eq!(recorder.last().header("X-Second"), None);
}

#[tokio::test]
async fn removed_interceptor_no_longer_runs() {
    let (mut api, recorder) = api();
    let id = api.add_request_interceptor(Interceptor::new(|config: RequestConfig| async move {
        Ok(config.with_header("X-Removed", "1"))
    }));
    api.remove_request_interceptor(id);

    api.get("/items", RequestConfig::default()).await.unwrap();
    assert_eq!(recorder.last().header("X-Removed"), None);
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_reaches_transport_with_method_url_and_body() {
    let (api, recorder) = api();
    let response = api
        .post("/items", json!({"a": 1}), RequestConfig::default())
        .await
        .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.url, "https://example.com/items");
    let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"a": 1}));
    assert_eq!(sent.header("content-type"), Some("application/json"));

    assert_eq!(response.status, 200);
    assert_eq!(response.data, ResponseData::Json(json!({"ok": true})));
    assert_eq!(response.config.url.as_deref(), Some("/items"));
}

#[tokio::test]
async fn every_verb_maps_to_its_method() {
    let (api, recorder) = api();
    let none = RequestConfig::default;
    api.get("/a", none()).await.unwrap();
    api.delete("/a", none()).await.unwrap();
    api.head("/a", none()).await.unwrap();
    api.options("/a", none()).await.unwrap();
    api.post("/a", Body::Empty, none()).await.unwrap();
    api.put("/a", Body::Empty, none()).await.unwrap();
    api.patch("/a", Body::Empty, none()).await.unwrap();
    api.post_form("/a", Body::Empty, none()).await.unwrap();
    api.put_form("/a", Body::Empty, none()).await.unwrap();
    api.patch_form("/a", Body::Empty, none()).await.unwrap();
    api.request(none().with_url("/a")).await.unwrap();

    let methods: Vec<HttpMethod> = recorder.requests().iter().map(|r| r.method).collect();
    assert_eq!(
        methods,
        vec![
            HttpMethod::Get,
            HttpMethod::Delete,
            HttpMethod::Head,
            HttpMethod::Options,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Get,
        ]
    );
}

#[tokio::test]
async fn per_call_config_wins_except_for_verb_method() {
    let (mut api, recorder) = api();
    api.defaults_mut().params.insert("lang".into(), "en".into());
    api.get(
        "/items",
        RequestConfig::default()
            .with_method(HttpMethod::Delete)
            .with_base_url("https://override.test")
            .with_param("page", "2"),
    )
    .await
    .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.method, HttpMethod::Get);
    assert_eq!(sent.url, "https://override.test/items?lang=en&page=2");
}

#[tokio::test]
async fn post_form_url_encodes_body() {
    let (api, recorder) = api();
    api.post_form(
        "/login",
        json!({"user": "ann", "remember": true}),
        RequestConfig::default(),
    )
    .await
    .unwrap();

    let sent = recorder.last();
    assert_eq!(sent.header("content-type"), Some(FORM_URLENCODED));
    assert_eq!(sent.body.as_deref(), Some("remember=true&user=ann"));
}

#[tokio::test]
async fn post_form_rejects_non_object_data() {
    let (api, recorder) = api();
    for data in [json!(["x", "y"]), json!(42)] {
        let err = api
            .post_form("/f", data, RequestConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn request_interceptor_header_reaches_transport() {
    let (mut api, recorder) = api();
    api.add_request_interceptor(Interceptor::new(|config: RequestConfig| async move {
        Ok(config.with_header("X-Test", "1"))
    }));

    api.get("/anything", RequestConfig::default()).await.unwrap();
    assert_eq!(recorder.last().header("x-test"), Some("1"));
}

#[tokio::test]
async fn request_interceptors_run_in_registration_order() {
    let (mut api, recorder) = api();
    for step in ["first", "second"] {
        api.add_request_interceptor(Interceptor::new(move |config: RequestConfig| async move {
            let trail = match config.headers.get("X-Trail") {
                Some(prev) => format!("{prev},{step}"),
                None => step.to_string(),
            };
            Ok(config.with_header("X-Trail", trail))
        }));
    }

    api.get("/", RequestConfig::default()).await.unwrap();
    assert_eq!(recorder.last().header("X-Trail"), Some("first,second"));
}

#[tokio::test]
async fn rejecting_request_interceptor_skips_transport() {
    let (mut api, recorder) = api();
    api.add_request_interceptor(Interceptor::new(|_config: RequestConfig| async move {
        Err(ClientError::rejected("no token"))
    }));

    let err = api.get("/secure", RequestConfig::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(reason) if reason == "no token"));
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn rejecting_response_interceptor_fails_dispatch() {
    let (mut api, recorder) = api();
    api.add_response_interceptor(Interceptor::new(|_response: Response| async move {
        Err(ClientError::rejected("bad payload"))
    }));

    let err = api.get("/items", RequestConfig::default()).await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(reason) if reason == "bad payload"));
    assert_eq!(recorder.requests().len(), 1);
}

#[tokio::test]
async fn response_interceptor_can_recover_from_rejection() {
    let (mut api, _) = api();
    api.add_request_interceptor(Interceptor::new(|_config: RequestConfig| async move {
        Err(ClientError::rejected("offline"))
    }));
    api.add_response_interceptor(Interceptor::<Response>::default().on_rejected(
        |error: ClientError| async move {
            Ok(Response {
                status: 299,
                headers: Vec::new(),
                data: ResponseData::Text(error.to_string()),
                config: RequestConfig::default(),
            })
        },
    ));

    let response = api.get("/items", RequestConfig::default()).await.unwrap();
    assert_eq!(response.status, 299);
    assert_eq!(response.data, ResponseData::Text("rejected: offline".to_string()));
}

#[tokio::test]
async fn response_interceptor_can_recover_from_status_failure() {
    let (mut api, _) = api();
    api.defaults_mut().valid_status = Some(300..=399);
    api.add_response_interceptor(Interceptor::<Response>::default().on_rejected(
        |error: ClientError| async move {
            match error {
                ClientError::Status { response, .. } => Ok(*response),
                other => Err(other),
            }
        },
    ));

    let response = api.get("/items", RequestConfig::default()).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.data, ResponseData::Json(json!({"ok": true})));
}

#[tokio::test]
async fn status_failure_without_recovery_reaches_caller() {
    let (mut api, _) = api();
    api.defaults_mut().valid_status = Some(300..=399);

    let err = api.get("/items", RequestConfig::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn concurrent_requests_share_one_instance() {
    let (api, recorder) = api();
    let (a, b) = tokio::join!(
        api.get("/a", RequestConfig::default()),
        api.get("/b", RequestConfig::default())
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(recorder.requests().len(), 2);
}

// ---------------------------------------------------------------------------
// Stub engine: the facade only forwards
// ---------------------------------------------------------------------------

#[derive(Default, Debug)]
struct StubInstance {
    defaults: RequestConfig,
    interceptors: Interceptors,
    dispatched: Mutex<Vec<RequestConfig>>,
}

#[async_trait]
impl ClientInstance for StubInstance {
    fn defaults(&self) -> &RequestConfig {
        &self.defaults
    }

    fn defaults_mut(&mut self) -> &mut RequestConfig {
        &mut self.defaults
    }

    fn set_defaults(&mut self, value: RequestConfig) {
        self.defaults = value;
    }

    fn interceptors(&self) -> &Interceptors {
        &self.interceptors
    }

    fn interceptors_mut(&mut self) -> &mut Interceptors {
        &mut self.interceptors
    }

    fn get_uri(&self, config: RequestConfig) -> Result<String, ClientError> {
        Ok(format!("stub:{}", config.url.unwrap_or_default()))
    }

    async fn request(&self, config: RequestConfig) -> Result<Response, ClientError> {
        self.dispatched.lock().unwrap().push(config.clone());
        Ok(Response {
            status: 204,
            headers: Vec::new(),
            data: ResponseData::Empty,
            config,
        })
    }
}

struct StubEngine {
    fail: bool,
}

impl HttpEngine for StubEngine {
    type Instance = StubInstance;

    fn create(&self, config: RequestConfig) -> Result<StubInstance, ClientError> {
        if self.fail {
            return Err(ClientError::InvalidConfig("stub refused".to_string()));
        }
        Ok(StubInstance {
            defaults: config,
            ..StubInstance::default()
        })
    }
}

#[test]
fn stub_engine_failure_is_returned_unchanged() {
    let err = ApiClient::new(&StubEngine { fail: true }, RequestConfig::default()).unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfig(reason) if reason == "stub refused"));
}

#[tokio::test]
async fn stub_engine_sees_shaped_post() {
    let api = ApiClient::new(
        &StubEngine { fail: false },
        RequestConfig::default().with_timeout_ms(7),
    )
    .unwrap();
    assert_eq!(api.defaults().timeout_ms, Some(7));
    assert_eq!(
        api.get_uri(RequestConfig::default().with_url("/x")).unwrap(),
        "stub:/x"
    );

    let response = api
        .post("/items", json!({"a": 1}), RequestConfig::default())
        .await
        .unwrap();
    assert_eq!(response.status, 204);
    assert_eq!(response.config.method, Some(HttpMethod::Post));
    assert_eq!(response.config.url.as_deref(), Some("/items"));
    assert_eq!(response.config.data, Some(Body::Json(json!({"a": 1}))));
}
