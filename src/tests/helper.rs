use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::LOCATION;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tower::Service;

use crate::aliases::LocationId;
use crate::aliases::UrlAlias;
use crate::config::Config;
use crate::config::ConflictPolicy;
use crate::handler::Disambiguation;
use crate::handler::NumericSuffix;
use crate::handler::UrlAliasHandler;
use crate::languages::Languages;
use crate::setup_app;
use crate::storage::Memory;
use crate::storage::Postgres;

/// Location of the root entry in all tests
pub const ROOT: LocationId = 2;

/// Test helper version of the alias response
#[derive(Debug, PartialEq, Eq)]
pub struct Alias {
    pub id: String,
    pub path: String,
    pub location_id: Option<LocationId>,
    pub resource: Option<String>,
    pub language_codes: Vec<String>,
    pub is_history: bool,
    pub is_custom: bool,
    pub forward: bool,
}

pub fn languages() -> Languages {
    Languages::new(["eng-GB", "ger-DE", "nor-NO"]).unwrap()
}

pub fn eng() -> Vec<String> {
    vec!["eng-GB".to_string()]
}

pub fn ger() -> Vec<String> {
    vec!["ger-DE".to_string()]
}

/// Setup a handler on an empty memory storage
pub async fn setup_handler() -> UrlAliasHandler<Memory> {
    setup_handler_with(Arc::new(NumericSuffix)).await
}

/// Setup a handler with a specific disambiguation strategy
pub async fn setup_handler_with(
    disambiguation: Arc<dyn Disambiguation>,
) -> UrlAliasHandler<Memory> {
    let handler = UrlAliasHandler::new(Memory::new(), languages(), ROOT, disambiguation);

    handler.ensure_root().await.unwrap();

    handler
}

/// Create a location and publish its name in English
pub async fn publish_location(
    handler: &UrlAliasHandler<Memory>,
    location_id: LocationId,
    parent_id: LocationId,
    name: &str,
) -> UrlAlias {
    handler.create_location(location_id, parent_id).await.unwrap();

    handler
        .publish_url_alias_for_location(location_id, name, "eng-GB", false)
        .await
        .unwrap()
}

/// Setup a handler on a fresh Postgres database
pub async fn setup_postgres_handler(pool: sqlx::PgPool) -> UrlAliasHandler<Postgres> {
    let storage = Postgres::new_with_pool(pool).await.unwrap();
    let handler = UrlAliasHandler::new(storage, languages(), ROOT, Arc::new(NumericSuffix));

    handler.ensure_root().await.unwrap();

    handler
}

fn test_config() -> Config {
    Config {
        address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        languages: languages(),
        prioritized_languages: eng(),
        root_location_id: ROOT,
        conflict_policy: ConflictPolicy::Suffix,
    }
}

/// Setup the alias service on an empty memory storage
pub async fn setup_test_app() -> Router {
    setup_app(Memory::new(), &test_config()).await.unwrap()
}

/// Setup the alias service on a fresh Postgres database
pub async fn setup_test_app_with_pool(pool: sqlx::PgPool) -> Router {
    let storage = Postgres::new_with_pool(pool).await.unwrap();

    setup_app(storage, &test_config()).await.unwrap()
}

pub async fn root(app: &mut Router, path: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();

    let status_code = response.status();
    let headers = response.headers();

    let location = headers.get(LOCATION);
    let location = location.map(|header| header.to_str().unwrap().to_string());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, location, body)
}

async fn send(
    app: &mut Router,
    method: Method,
    uri: &str,
    payload: Option<Value>,
) -> (StatusCode, Bytes) {
    let request = Request::builder().method(method).uri(uri);

    let request = match payload {
        Some(payload) => request
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, body)
}

fn alias_result(
    status_code: StatusCode,
    body: &Bytes,
) -> (StatusCode, Option<Alias>, Option<String>) {
    (
        status_code,
        if status_code.is_success() {
            Some(get_alias(body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_location(
    app: &mut Router,
    location_id: LocationId,
    parent_id: LocationId,
) -> (StatusCode, Option<String>) {
    let payload = json!({ "id": location_id, "parentId": parent_id });

    let (status_code, body) = send(app, Method::POST, "/api/locations", Some(payload)).await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_publish(
    app: &mut Router,
    location_id: LocationId,
    name: &str,
    language_code: &str,
) -> (StatusCode, Option<Alias>, Option<String>) {
    let payload = json!({ "name": name, "languageCode": language_code });

    let (status_code, body) = send(
        app,
        Method::POST,
        &format!("/api/locations/{location_id}/publish"),
        Some(payload),
    )
    .await;

    alias_result(status_code, &body)
}

pub async fn maybe_publish_with_raw_body(
    app: &mut Router,
    location_id: LocationId,
    body: &str,
) -> (StatusCode, Option<String>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/locations/{location_id}/publish"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, Some(get_error_message(&body)))
}

pub async fn maybe_create_custom_alias(
    app: &mut Router,
    location_id: LocationId,
    path: &str,
    forwarding: bool,
) -> (StatusCode, Option<Alias>, Option<String>) {
    let payload = json!({ "path": path, "forwarding": forwarding });

    let (status_code, body) = send(
        app,
        Method::POST,
        &format!("/api/locations/{location_id}/aliases"),
        Some(payload),
    )
    .await;

    alias_result(status_code, &body)
}

pub async fn maybe_create_global_alias(
    app: &mut Router,
    resource: &str,
    path: &str,
    forwarding: bool,
) -> (StatusCode, Option<Alias>, Option<String>) {
    let payload = json!({
        "resource": resource,
        "path": path,
        "forwarding": forwarding,
        "alwaysAvailable": true,
    });

    let (status_code, body) =
        send(app, Method::POST, "/api/aliases/global", Some(payload)).await;

    alias_result(status_code, &body)
}

pub async fn list_global_aliases(app: &mut Router) -> (StatusCode, Option<Vec<Alias>>) {
    let (status_code, body) = send(app, Method::GET, "/api/aliases/global", None).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_aliases(&body))
        } else {
            None
        },
    )
}

pub async fn list_aliases(
    app: &mut Router,
    location_id: LocationId,
    custom: bool,
) -> (StatusCode, Option<Vec<Alias>>) {
    let (status_code, body) = send(
        app,
        Method::GET,
        &format!("/api/locations/{location_id}/aliases?custom={custom}"),
        None,
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_aliases(&body))
        } else {
            None
        },
    )
}

pub async fn reverse(
    app: &mut Router,
    location_id: LocationId,
    languages: &str,
) -> (StatusCode, Option<Vec<Alias>>) {
    let (status_code, body) = send(
        app,
        Method::GET,
        &format!("/api/locations/{location_id}/reverse?languages={languages}"),
        None,
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_aliases(&body))
        } else {
            None
        },
    )
}

pub async fn lookup(
    app: &mut Router,
    url: &str,
    languages: &str,
) -> (StatusCode, Option<Alias>, Option<String>) {
    let (status_code, body) = send(
        app,
        Method::GET,
        &format!("/api/lookup?url={url}&languages={languages}"),
        None,
    )
    .await;

    alias_result(status_code, &body)
}

pub async fn single_alias(
    app: &mut Router,
    alias_id: &str,
) -> (StatusCode, Option<Alias>, Option<String>) {
    let (status_code, body) =
        send(app, Method::GET, &format!("/api/aliases/{alias_id}"), None).await;

    alias_result(status_code, &body)
}

pub async fn maybe_delete_alias(app: &mut Router, alias_id: &str) -> (StatusCode, Option<String>) {
    let (status_code, body) =
        send(app, Method::DELETE, &format!("/api/aliases/{alias_id}"), None).await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_move_location(
    app: &mut Router,
    location_id: LocationId,
    parent_id: LocationId,
) -> (StatusCode, Option<String>) {
    let payload = json!({ "parentId": parent_id });

    let (status_code, body) = send(
        app,
        Method::POST,
        &format!("/api/locations/{location_id}/move"),
        Some(payload),
    )
    .await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_copy_location(
    app: &mut Router,
    location_id: LocationId,
    parent_id: LocationId,
) -> (StatusCode, Option<LocationId>) {
    let payload = json!({ "parentId": parent_id });

    let (status_code, body) = send(
        app,
        Method::POST,
        &format!("/api/locations/{location_id}/copy"),
        Some(payload),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]["locationId"].as_i64()
        } else {
            None
        },
    )
}

pub async fn maybe_delete_location(
    app: &mut Router,
    location_id: LocationId,
) -> (StatusCode, Option<String>) {
    let (status_code, body) = send(
        app,
        Method::DELETE,
        &format!("/api/locations/{location_id}"),
        None,
    )
    .await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

fn value_to_alias(alias: &Map<String, Value>) -> Alias {
    let destination = alias["destination"].as_object().unwrap();

    Alias {
        id: alias["id"].as_str().map(ToString::to_string).unwrap(),
        path: alias["path"].as_str().map(ToString::to_string).unwrap(),
        location_id: (destination["type"] == "location")
            .then(|| destination["target"].as_i64().unwrap()),
        resource: (destination["type"] == "resource")
            .then(|| destination["target"].as_str().map(ToString::to_string).unwrap()),
        language_codes: alias["languageCodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|code| code.as_str().map(ToString::to_string).unwrap())
            .collect(),
        is_history: alias["isHistory"].as_bool().unwrap(),
        is_custom: alias["isCustom"].as_bool().unwrap(),
        forward: alias["forward"].as_bool().unwrap(),
    }
}

pub fn get_alias(body: &[u8]) -> Alias {
    serde_json::from_slice::<Value>(body).unwrap()["data"]
        .as_object()
        .map(value_to_alias)
        .unwrap()
}

fn get_aliases(body: &Bytes) -> Vec<Alias> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_alias)
        .collect()
}

fn get_error_message(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["error"]
        .as_str()
        .map(ToString::to_string)
        .unwrap()
}
