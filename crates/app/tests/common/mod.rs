#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use edu_core::LocalCalendar;
use http_body_util::BodyExt;
use serde_json::Value;
use services::{AppServices, ServicesConfig, parse_admin_emails};
use storage::demo::seed_demo_catalog;
use storage::repository::Storage;
use tower::ServiceExt;

use app::state::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";

fn config() -> ServicesConfig {
    ServicesConfig {
        calendar: LocalCalendar::utc(),
        admin_emails: parse_admin_emails(ADMIN_EMAIL),
        ..ServicesConfig::default()
    }
}

/// The app over the read-only demo catalog, as served without a database.
pub fn mock_app() -> Router {
    app::build_app(AppState::new(AppServices::mock(config())))
}

/// The app over writable in-memory storage holding the demo catalog.
pub async fn seeded_app() -> Router {
    let storage = Storage::in_memory();
    seed_demo_catalog(&storage).await.unwrap();
    app::build_app(AppState::new(AppServices::from_storage(&storage, config())))
}

/// A caller as forwarded by the auth proxy: `(user id, email)`.
pub type Caller<'a> = Option<(&'a str, &'a str)>;

pub const KID: Caller<'static> = Some(("u-kid", "kid@example.com"));
pub const ADMIN: Caller<'static> = Some(("u-admin", ADMIN_EMAIL));

pub fn request(method: Method, uri: &str, caller: Caller<'_>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, email)) = caller {
        builder = builder.header("x-user-id", id);
        if !email.is_empty() {
            builder = builder.header("x-user-email", email);
        }
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and parse the JSON response body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str, caller: Caller<'_>) -> (StatusCode, Value) {
    send(app, request(Method::GET, uri, caller, None)).await
}

pub async fn post(app: &Router, uri: &str, caller: Caller<'_>, body: Value) -> (StatusCode, Value) {
    send(app, request(Method::POST, uri, caller, Some(body))).await
}

pub async fn patch(app: &Router, uri: &str, caller: Caller<'_>, body: Value) -> (StatusCode, Value) {
    send(app, request(Method::PATCH, uri, caller, Some(body))).await
}

pub async fn delete(app: &Router, uri: &str, caller: Caller<'_>) -> (StatusCode, Value) {
    send(app, request(Method::DELETE, uri, caller, None)).await
}
