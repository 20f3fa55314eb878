//! Aliases API endpoints
//!
//! Path lookups, global aliases and single aliases by ID

use axum::Extension;
use serde::Deserialize;

use crate::aliases::UrlAlias;
use crate::config::PrioritizedLanguages;
use crate::handler::UrlAliasHandler;
use crate::storage::Storage;

use super::Error;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::parse_languages;

/// Default page size of the global alias list
const DEFAULT_LIMIT: usize = 50;

/// Query parameters for a lookup
#[derive(Deserialize)]
pub struct LookupQuery {
    /// Path to resolve
    url: String,

    /// Comma separated language codes, the prioritized languages without
    languages: Option<String>,
}

/// Resolve a path into an alias
///
/// History aliases are returned with `isHistory`, they are not followed
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/lookup?url=/products/shoes&languages=eng-GB'
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "7-<md5>", "destination": { "type": "location", "target": 44 } ... } }
/// ```
pub async fn lookup<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    Extension(PrioritizedLanguages(prioritized)): Extension<PrioritizedLanguages>,
    QueryParameters(query): QueryParameters<LookupQuery>,
) -> Result<Success<UrlAlias>, Error> {
    let languages = parse_languages(query.languages.as_deref(), &prioritized);

    let alias = handler.lookup(&query.url, &languages).await?;

    Ok(Success::ok(alias))
}

/// Query parameters for listing global aliases
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGlobalQuery {
    /// Only aliases usable in this language
    language_code: Option<String>,

    /// Number of aliases to skip
    #[serde(default)]
    offset: usize,

    /// Maximum number of aliases
    limit: Option<usize>,
}

/// List global aliases
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/aliases/global?languageCode=eng-GB&offset=0&limit=10'
/// ```
pub async fn list_global<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    QueryParameters(query): QueryParameters<ListGlobalQuery>,
) -> Result<Success<Vec<UrlAlias>>, Error> {
    let aliases = handler
        .list_global_url_aliases(
            query.language_code.as_deref(),
            query.offset,
            Some(query.limit.unwrap_or(DEFAULT_LIMIT)),
        )
        .await?;

    Ok(Success::ok(aliases))
}

/// Request to create a global alias
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGlobalAlias {
    /// Target resource, like `module:content/search`
    resource: String,

    /// Wanted path, intermediate elements are created when missing
    path: String,

    /// Redirect to the resource instead of serving in place
    #[serde(default)]
    forwarding: bool,

    /// Language code, the default language without
    language_code: Option<String>,

    /// Valid for any language
    #[serde(default)]
    always_available: bool,
}

/// Create a global alias
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/aliases/global \
///     -d '{ "resource": "module:content/search", "path": "search" }'
/// ```
pub async fn create_global<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    Form(form): Form<CreateGlobalAlias>,
) -> Result<Success<UrlAlias>, Error> {
    let alias = handler
        .create_global_url_alias(
            &form.resource,
            &form.path,
            form.forwarding,
            form.language_code.as_deref(),
            form.always_available,
        )
        .await?;

    Ok(Success::created(alias))
}

/// Get a single alias by its ID
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/aliases/0-<md5>
/// ```
pub async fn single<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(alias_id): PathParameters<String>,
) -> Result<Success<UrlAlias>, Error> {
    let alias = handler.load_url_alias(&alias_id).await?;

    Ok(Success::ok(alias))
}

/// Remove a custom or global alias
///
/// Autogenerated aliases can not be removed, they follow their location
///
/// Request:
/// ```sh
/// curl -v -X DELETE http://localhost:6000/api/aliases/0-<md5>
/// ```
pub async fn delete<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(alias_id): PathParameters<String>,
) -> Result<Success<()>, Error> {
    let alias = handler.load_url_alias(&alias_id).await?;

    if !alias.is_custom {
        return Err(Error::forbidden("Autogenerated aliases can not be removed"));
    }

    if !handler.remove_url_aliases(&[alias]).await? {
        return Err(Error::not_found("Alias not found"));
    }

    Ok(Success::no_content())
}
