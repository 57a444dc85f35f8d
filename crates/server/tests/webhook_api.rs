//! HTTP-level tests for the webhook receiver and operational endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use intake::NewLead;
use leadflow::{LeadPipeline, PipelineConfig};
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState, StoreBackend};
use store::{InMemoryStore, LeadRef, LeadStore, StoreError, StoredLead, TenantProfile};
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        store_backend: StoreBackend::Memory,
        ..Default::default()
    }
}

fn app_with(store: Arc<dyn LeadStore>, config: ServerConfig) -> Router {
    let pipeline = LeadPipeline::with_store(store, PipelineConfig::default());
    build_router(Arc::new(ServerState::new(config, pipeline)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Option<Value>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).expect("response body should be JSON"))
    };
    (status, json)
}

async fn post_json(app: &Router, body: Value) -> (StatusCode, Option<Value>) {
    send(app, Method::POST, "/webhook", Body::from(body.to_string())).await
}

struct FailingInsertStore;

#[async_trait]
impl LeadStore for FailingInsertStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn insert_lead(&self, _lead: NewLead) -> Result<StoredLead, StoreError> {
        Err(StoreError::Rejected {
            status: 400,
            message: "new row violates check constraint \"leads_phone_check\"".into(),
        })
    }

    async fn find_lead_by_transcript(
        &self,
        _transcript: &str,
    ) -> Result<Option<LeadRef>, StoreError> {
        Ok(None)
    }

    async fn find_tenants_by_agent_phone(
        &self,
        _agent_phone: &str,
    ) -> Result<Vec<TenantProfile>, StoreError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn analyzed_call_creates_lead_and_returns_no_content() {
    let store = Arc::new(InMemoryStore::with_tenants([TenantProfile::new(
        "tenant-a",
        "+15550001111",
    )]));
    let app = app_with(store.clone(), test_config());

    let (status, body) = post_json(
        &app,
        json!({
            "event": "call_analyzed",
            "call": {
                "call_id": "c1",
                "from_number": "555-123-4567",
                "to_number": "+15550001111",
                "call_analysis": {"custom_analysis_data": {"type": "SELLER", "lead_quality": "HOT"}}
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_none());

    let leads = store.leads();
    assert_eq!(leads.len(), 1);
    let stored = serde_json::to_value(&leads[0]).unwrap();
    assert_eq!(stored["phone"], "555-123-4567");
    assert_eq!(stored["type"], "seller");
    assert_eq!(stored["lead_quality"], "hot");
    assert_eq!(stored["status"], "new");
    assert_eq!(stored["user_id"], "tenant-a");
}

#[tokio::test]
async fn invalid_phone_returns_bad_request() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), test_config());

    let (status, body) = post_json(
        &app,
        json!({"event": "call_analyzed", "call": {"call_id": "c2", "from_number": "123"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Some(json!({"error": "Invalid phone number format"})));
    assert_eq!(store.lead_count(), 0);
}

#[tokio::test]
async fn redelivery_is_reported_as_already_processed() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), test_config());
    let event = json!({
        "event": "call_analyzed",
        "call": {"call_id": "c1", "from_number": "555-123-4567", "transcript": "hello"}
    });

    let (first, _) = post_json(&app, event.clone()).await;
    let (status, body) = post_json(&app, event).await;

    assert_eq!(first, StatusCode::NO_CONTENT);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({"message": "Already processed", "callId": "c1"}))
    );
    assert_eq!(store.lead_count(), 1);
}

#[tokio::test]
async fn duplicate_transcript_is_reported_as_existing_lead() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), test_config());

    for call_id in ["a", "b"] {
        post_json(
            &app,
            json!({
                "event": "call_analyzed",
                "call": {"call_id": call_id, "from_number": "555-123-4567", "transcript": "same"}
            }),
        )
        .await;
    }
    let (status, body) = post_json(
        &app,
        json!({
            "event": "call_analyzed",
            "call": {"call_id": "c", "from_number": "555-123-4567", "transcript": "same"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({"message": "Lead already exists", "callId": "c"}))
    );
    assert_eq!(store.lead_count(), 1);
}

#[tokio::test]
async fn lifecycle_and_unknown_events_are_acknowledged() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), test_config());

    for event in ["call_started", "call_ended", "something_new"] {
        let (status, body) =
            post_json(&app, json!({"event": event, "call": {"call_id": "c3"}})).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{event}");
        assert!(body.is_none());
    }
    assert_eq!(store.lead_count(), 0);
}

#[tokio::test]
async fn store_failure_returns_details() {
    let app = app_with(Arc::new(FailingInsertStore), test_config());

    let (status, body) = post_json(
        &app,
        json!({"event": "call_analyzed", "call": {"call_id": "c5", "from_number": "555-123-4567"}}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        Some(json!({
            "error": "Failed to save lead",
            "details": "new row violates check constraint \"leads_phone_check\""
        }))
    );
}

#[tokio::test]
async fn malformed_bodies_return_invalid_payload() {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), test_config());
    let expected = Some(json!({"error": "Invalid payload structure"}));

    let (status, body) = send(&app, Method::POST, "/webhook", Body::from("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    for payload in [
        json!({"call": {"call_id": "x"}}),
        json!({"event": "call_analyzed"}),
        json!({"event": "call_analyzed", "call": [1, 2]}),
        json!([]),
        json!(["call_analyzed", {"call_id": "x", "from_number": "555-123-4567"}]),
    ] {
        let (status, body) = post_json(&app, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, expected);
    }
    assert_eq!(store.lead_count(), 0);
}

#[tokio::test]
async fn missing_call_id_is_rejected() {
    let app = app_with(Arc::new(InMemoryStore::new()), test_config());

    let (status, body) = post_json(
        &app,
        json!({"event": "call_analyzed", "call": {"from_number": "555-123-4567"}}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, Some(json!({"error": "Missing call_id"})));
}

#[tokio::test]
async fn non_post_methods_are_rejected_with_json() {
    let app = app_with(Arc::new(InMemoryStore::new()), test_config());

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let (status, body) = send(&app, method, "/webhook", Body::empty()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, Some(json!({"error": "Method not allowed"})));
    }
}

#[tokio::test]
async fn webhook_path_is_configurable() {
    let config = ServerConfig {
        webhook_path: "/hooks/retell".into(),
        ..test_config()
    };
    let app = app_with(Arc::new(InMemoryStore::new()), config);

    let payload = json!({"event": "call_started", "call": {"call_id": "c"}}).to_string();
    let (status, _) = send(&app, Method::POST, "/hooks/retell", Body::from(payload.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, Method::POST, "/webhook", Body::from(payload)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, Some(json!({"error": "Not found"})));
}

#[tokio::test]
async fn health_and_readiness() {
    let app = app_with(Arc::new(InMemoryStore::new()), test_config());

    let (status, body) = send(&app, Method::GET, "/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["components"]["store"], "memory");
    assert_eq!(body["components"]["idempotency_entries"], 0);
    assert_eq!(body["components"]["tenant_lookup_failure"], "route_unowned");

    let (status, body) = send(&app, Method::GET, "/", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["webhook"], "/webhook");
}

#[tokio::test]
async fn metrics_route_is_absent_without_recorder() {
    let app = app_with(Arc::new(InMemoryStore::new()), test_config());
    let (status, body) = send(&app, Method::GET, "/metrics", Body::empty()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, Some(json!({"error": "Not found"})));
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = app_with(Arc::new(InMemoryStore::new()), test_config());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "delivery-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "delivery-42");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}
