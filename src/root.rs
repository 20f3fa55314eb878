//! The root!
//!
//! Resolves all requests outside the API into their alias

use std::str::Utf8Error;

use axum::Extension;
use axum::Json;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::LOCATION;
use axum::response::IntoResponse;
use axum::response::Response;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;

use crate::aliases::UrlAlias;
use crate::config::PrioritizedLanguages;
use crate::handler;
use crate::handler::UrlAliasHandler;
use crate::storage::Storage;

/// Characters encoded in the `Location` header
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Serialize)]
struct DataWrapper {
    data: UrlAlias,
}

/// The root!
///
/// All wildcard requests end up in this function.
///
/// The path is resolved in the prioritized languages. Live aliases are served as JSON, history
/// and forwarding aliases redirect permanently to their current path.
pub async fn root<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    Extension(PrioritizedLanguages(prioritized)): Extension<PrioritizedLanguages>,
    uri: Uri,
) -> Result<Response, (StatusCode, String)> {
    let path =
        url_decode_path(uri.path()).map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    tracing::debug!("Looking for path: /{path}");

    let alias = match handler.lookup(&path, &prioritized).await {
        Ok(alias) => alias,
        Err(handler::Error::NotFound(_)) => {
            tracing::debug!(r#"Path "/{path}" not found"#);

            return Ok(StatusCode::NOT_FOUND.into_response());
        }
        Err(err) => return Err(internal_error(err)),
    };

    if alias.needs_redirect() {
        let target = handler
            .redirect_path(&alias, &prioritized)
            .await
            .map_err(internal_error)?;

        if let Some(target) = target.filter(|target| *target != alias.path) {
            tracing::debug!(r#"Path "/{path}" redirecting to: /{target}"#);

            let location = format!("/{}", utf8_percent_encode(&target, PATH));
            let location = HeaderValue::from_str(&location).map_err(internal_error)?;

            return Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response());
        }
    }

    tracing::debug!(r#"Path "/{path}" resolved to: {}"#, alias.destination);

    Ok((StatusCode::OK, Json(DataWrapper { data: alias })).into_response())
}

/// Utility function for mapping any error into a `500 Internal Server Error`
/// response.
fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: std::error::Error,
{
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// URL decode the request path
///
/// Uses percentage encoding for the decoding, might error in case of invalid UTF-8
fn url_decode_path(path: &str) -> Result<String, Utf8Error> {
    let decoded = percent_decode_str(path.trim_matches('/'));

    decoded.decode_utf8().map(|decoded| decoded.to_string())
}
