//! Shared fixtures for unit and route tests.
//!
//! The identity vendor's admin API and the analytics backend are played by
//! small axum servers bound to ephemeral local ports.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use http_body_util::BodyExt;
use mib_core::identity::{SessionUser, VendorEnv};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::{BackendConfig, Environment, MemberstackConfig, WebConfig};
use crate::session::{MemorySessionStore, SESSION_COOKIE, SESSION_TTL_SECONDS, SessionRecord};
use crate::state::AppState;

pub const MEMBER_ID: &str = "mem_sb_advanced01";
pub const MEMBER_EMAIL: &str = "jane@example.com";
pub const ADVANCED_PLAN_ID: &str = "pln_advanced-ni690fz3";

const BACKEND_KEY: &str = "backend-test-key-7Hq2Lm9X";
const VENDOR_KEY: &str = "sk_test_vendor_4Kp8Qz2W";
const VENDOR_STAGING_KEY: &str = "sk_test_staging_9Rt3Yb6N";

// =============================================================================
// Fixtures
// =============================================================================

/// Development config pointing at the given backend and vendor URLs.
pub fn config(backend_url: &str, admin_url: &str) -> WebConfig {
    WebConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        environment: Environment::Development,
        log_json: false,
        backend: BackendConfig {
            base_url: backend_url.to_string(),
            api_key: SecretString::from(BACKEND_KEY),
            timeout: Duration::from_secs(5),
            address_sample_fallback: false,
        },
        memberstack: MemberstackConfig {
            admin_url: admin_url.to_string(),
            app_id: Some("app_test".to_string()),
            production_key: SecretString::from(VENDOR_KEY),
            staging_key: Some(SecretString::from(VENDOR_STAGING_KEY)),
            default_env: VendorEnv::Production,
            timeout: Duration::from_secs(5),
        },
        session_store_url: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A confirmed user with no plans.
pub fn user() -> SessionUser {
    SessionUser {
        id: MEMBER_ID.to_string(),
        email: MEMBER_EMAIL.to_string(),
        first_name: "Jane".to_string(),
        last_name: "Citizen".to_string(),
        memberstack_id: Some(MEMBER_ID.to_string()),
        plan_ids: Vec::new(),
        best_plan: None,
        provisional: false,
    }
}

/// A record expiring `valid_for` from now (negative for already expired).
pub fn record(id: &str, valid_for: chrono::Duration) -> SessionRecord {
    let expires_at = Utc::now() + valid_for;
    let created_at = expires_at - chrono::Duration::seconds(SESSION_TTL_SECONDS);
    SessionRecord {
        session_id: id.to_string(),
        user: user(),
        created_at,
        last_accessed: created_at,
        expires_at,
        active: true,
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// =============================================================================
// Fake identity vendor
// =============================================================================

pub struct FakeVendor {
    pub url: String,
}

impl FakeVendor {
    pub async fn start() -> Self {
        let router = Router::new().route("/members/{id}", get(vendor_member));
        Self {
            url: serve(router).await,
        }
    }
}

async fn vendor_member(headers: HeaderMap, Path(id): Path<String>) -> Response {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if !matches!(key, Some(VENDOR_KEY | VENDOR_STAGING_KEY)) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"}))).into_response();
    }

    if id != MEMBER_ID && id != MEMBER_EMAIL {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response();
    }

    Json(json!({
        "data": {
            "id": MEMBER_ID,
            "auth": {"email": MEMBER_EMAIL},
            "customFields": {"first-name": "Jane", "last-name": "Citizen"},
            "planConnections": [
                {"planId": ADVANCED_PLAN_ID, "status": "ACTIVE"},
                {"planId": "pln_essentials-old", "status": "CANCELED"}
            ]
        }
    }))
    .into_response()
}

// =============================================================================
// Fake analytics backend
// =============================================================================

pub struct FakeBackend {
    pub url: String,
    graph_hits: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let graph_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .fallback(backend_handler)
            .with_state(Arc::clone(&graph_hits));
        Self {
            url: serve(router).await,
            graph_hits,
        }
    }

    /// Report section requests served so far.
    pub fn hits(&self) -> usize {
        self.graph_hits.load(Ordering::SeqCst)
    }
}

async fn backend_handler(
    State(graph_hits): State<Arc<AtomicUsize>>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let segments: Vec<String> = uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .map(|s| urlencoding::decode(s).unwrap().into_owned())
        .collect();
    let token_ok = params.get("token").map(String::as_str) == Some(BACKEND_KEY);

    match segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [report, "graphs", section, name] => {
            if !token_ok {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            graph_hits.fetch_add(1, Ordering::SeqCst);
            match *section {
                "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                "html" => "<div class=\"chart\">median price</div>".into_response(),
                _ => Json(json!({
                    "report": report,
                    "section": section,
                    "name": name,
                    "blur": params.get("blur").cloned().unwrap_or_default(),
                }))
                .into_response(),
            }
        }
        ["user_orders", email] => {
            if !token_ok {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            if *email != MEMBER_EMAIL {
                return Json(json!([])).into_response();
            }
            let today = Utc::now().format("%d/%m/%Y").to_string();
            Json(json!([
                {"type": "Property", "date": format!("{today} 10:30")},
                {"report_type": "suburb", "date": today},
                {"type": "Property", "date": "15/01/2020"}
            ]))
            .into_response()
        }
        ["suburb_report", "schools", sector, suburb] => Json(json!([
            {"name": format!("{suburb} {sector} school"), "sector": sector}
        ]))
        .into_response(),
        ["address_search"] => Json(json!([
            {"address": "1 George St, Sydney NSW 2000", "lat": -33.86, "lng": 151.21}
        ]))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

// =============================================================================
// Router driver
// =============================================================================

/// Decoded response of a routed request.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookie: Option<String>,
}

/// The full router wired to fake upstreams and an in-memory session store.
pub struct TestApp {
    router: Router,
    /// Shares its map with the store behind the router.
    pub store: MemorySessionStore,
    _vendor: FakeVendor,
    _backend: FakeBackend,
}

impl TestApp {
    pub async fn start() -> Self {
        Self::start_with(false).await
    }

    /// Same as [`TestApp::start`] with the production rate limiters on.
    pub async fn start_rate_limited() -> Self {
        Self::start_with(true).await
    }

    async fn start_with(rate_limit: bool) -> Self {
        let vendor = FakeVendor::start().await;
        let backend = FakeBackend::start().await;
        let store = MemorySessionStore::new();
        let state = AppState::new(
            config(&backend.url, &vendor.url),
            Arc::new(store.clone()),
        )
        .unwrap();

        Self {
            router: crate::app(state, rate_limit),
            store,
            _vendor: vendor,
            _backend: backend,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            set_cookie,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, body: &Value, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log the advanced member in and return the `name=value` cookie pair.
    pub async fn login(&self) -> String {
        let response = self
            .post_json(
                "/api/auth/login",
                &json!({
                    "email": MEMBER_EMAIL,
                    "memberstackToken": "tok_test",
                    "memberstackId": MEMBER_ID,
                }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);

        let cookie = response.set_cookie.unwrap();
        let pair = cookie.split(';').next().unwrap().to_string();
        assert!(pair.starts_with(SESSION_COOKIE));
        pair
    }
}
