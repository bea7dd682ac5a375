#![allow(dead_code)]

pub mod pg;

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use volunteer_hub::{app, AppConfig, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The real binary on a free port, backed by in-memory storage.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_volunteer-hub"));
        cmd.arg("serve")
            .env("PORT", port.to_string())
            .env("SERVER_HOST", "127.0.0.1")
            .env("STORAGE_BACKEND", "memory")
            .env("JWT_SECRET", "integration-secret")
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// The router over fresh in-memory stores, driven without a socket.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(AppConfig::for_tests()).expect("test state");
        Self {
            router: app(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, cookie, Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, cookie, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None, None).await
    }

    /// Calls `/jwt` and returns the `token=...` pair to send back as a cookie.
    pub async fn login(&self, email: &str) -> String {
        let res = self.post("/jwt", None, json!({ "email": email })).await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {}", res.body);
        set_cookie_pair(&res.headers).expect("set-cookie header")
    }

    /// Creates a listing through the API and returns its id.
    pub async fn create_listing(&self, cookie: &str, listing: Value) -> String {
        let res = self.post("/add-volunteer", Some(cookie), listing).await;
        assert_eq!(res.status, StatusCode::OK, "create failed: {}", res.body);
        res.body["insertedId"].as_str().expect("insertedId").to_string()
    }
}

/// The `name=value` part of the first `Set-Cookie` header.
pub fn set_cookie_pair(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(|pair| pair.trim().to_string())
}

pub fn listing(title: &str, organizer: &str, deadline_ms: i64) -> Value {
    json!({
        "title": title,
        "OrganizerEmail": organizer,
        "noOfVolunteerNeed": 5,
        "postDeadline": deadline_ms,
        "category": "social service",
        "location": "Dhaka"
    })
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
