//! Locations API endpoints
//!
//! Maintaining the location tree and the aliases of a single location

use std::collections::BTreeMap;

use axum::Extension;
use serde::Deserialize;
use serde::Serialize;

use crate::aliases::LocationId;
use crate::aliases::UrlAlias;
use crate::config::PrioritizedLanguages;
use crate::handler::UrlAliasHandler;
use crate::locations::Location;
use crate::storage::Storage;

use super::Error;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::parse_languages;

/// Request to create a location
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocation {
    /// ID of the new location
    id: LocationId,

    /// ID of the parent location
    parent_id: LocationId,
}

/// Add a location to the tree
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/locations \
///     -d '{ "id": 42, "parentId": 2 }'
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": 42, "parentId": 2 } }
/// ```
pub async fn create<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    Form(form): Form<CreateLocation>,
) -> Result<Success<Location>, Error> {
    let location = handler.create_location(form.id, form.parent_id).await?;

    Ok(Success::created(location))
}

/// Delete a location and its subtree
///
/// Request:
/// ```sh
/// curl -v -X DELETE http://localhost:6000/api/locations/42
/// ```
pub async fn delete<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
) -> Result<Success<()>, Error> {
    handler.location_deleted(location_id).await?;

    Ok(Success::no_content())
}

/// Query parameters for listing aliases
#[derive(Deserialize)]
pub struct ListAliasesQuery {
    /// List custom aliases instead of autogenerated ones
    #[serde(default)]
    custom: bool,

    /// Comma separated language codes, all languages without
    languages: Option<String>,
}

/// List the autogenerated or custom aliases of a location
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/locations/42/aliases?custom=true&languages=eng-GB'
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "0-<md5>", "path": "about-us", "isCustom": true ... } ] }
/// ```
pub async fn list_aliases<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
    QueryParameters(query): QueryParameters<ListAliasesQuery>,
) -> Result<Success<Vec<UrlAlias>>, Error> {
    let languages = parse_languages(query.languages.as_deref(), &[]);

    let aliases = handler
        .list_url_aliases_for_location(location_id, query.custom, &languages)
        .await?;

    Ok(Success::ok(aliases))
}

/// Request to create a custom alias
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomAlias {
    /// Wanted path, intermediate elements are created when missing
    path: String,

    /// Redirect to the autogenerated alias instead of serving in place
    #[serde(default)]
    forwarding: bool,

    /// Language code, the default language without
    language_code: Option<String>,

    /// Valid for any language
    #[serde(default)]
    always_available: bool,
}

/// Create a custom alias for a location
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/locations/42/aliases \
///     -d '{ "path": "promo/summer", "forwarding": true, "languageCode": "eng-GB" }'
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "12-<md5>", "path": "promo/summer", "forward": true ... } }
/// ```
pub async fn create_alias<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
    Form(form): Form<CreateCustomAlias>,
) -> Result<Success<UrlAlias>, Error> {
    let alias = handler
        .create_custom_url_alias(
            location_id,
            &form.path,
            form.forwarding,
            form.language_code.as_deref(),
            form.always_available,
        )
        .await?;

    Ok(Success::created(alias))
}

/// Request to publish the name of a location
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publish {
    /// Name of the location in the language
    name: String,

    /// Language code
    language_code: String,

    /// Valid for any language
    #[serde(default)]
    always_available: bool,
}

/// Publish the autogenerated alias of a location
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/locations/42/publish \
///     -d '{ "name": "About us", "languageCode": "eng-GB", "alwaysAvailable": true }'
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "0-<md5>", "path": "About-us", "isCustom": false ... } }
/// ```
pub async fn publish<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
    Form(form): Form<Publish>,
) -> Result<Success<UrlAlias>, Error> {
    let alias = handler
        .publish_url_alias_for_location(
            location_id,
            &form.name,
            &form.language_code,
            form.always_available,
        )
        .await?;

    Ok(Success::ok(alias))
}

/// Query parameters for a reverse lookup
#[derive(Deserialize)]
pub struct ReverseQuery {
    /// Comma separated language codes, the prioritized languages without
    languages: Option<String>,
}

/// All aliases of a location usable in the given languages
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/locations/42/reverse?languages=ger-DE,eng-GB'
/// ```
pub async fn reverse<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    Extension(PrioritizedLanguages(prioritized)): Extension<PrioritizedLanguages>,
    PathParameters(location_id): PathParameters<LocationId>,
    QueryParameters(query): QueryParameters<ReverseQuery>,
) -> Result<Success<Vec<UrlAlias>>, Error> {
    let languages = parse_languages(query.languages.as_deref(), &prioritized);

    let aliases = handler.reverse_lookup(location_id, &languages).await?;

    Ok(Success::ok(aliases))
}

/// Request to move or copy a location
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reorganize {
    /// ID of the new parent location
    parent_id: LocationId,
}

/// Move a location below another parent
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/locations/42/move \
///     -d '{ "parentId": 43 }'
/// ```
pub async fn move_location<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
    Form(form): Form<Reorganize>,
) -> Result<Success<()>, Error> {
    handler.location_moved(location_id, form.parent_id).await?;

    Ok(Success::no_content())
}

/// Response of a copy, mapping copied locations to their copies
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResponse {
    /// ID of the copy of the requested location
    location_id: LocationId,

    /// New location ID for every copied location
    copies: BTreeMap<LocationId, LocationId>,
}

/// Copy a location and its subtree below another parent
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     http://localhost:6000/api/locations/42/copy \
///     -d '{ "parentId": 43 }'
/// ```
///
/// Response:
/// ```json
/// { "data": { "locationId": 50, "copies": { "42": 50, "44": 51 } } }
/// ```
pub async fn copy<S: Storage>(
    Extension(handler): Extension<UrlAliasHandler<S>>,
    PathParameters(location_id): PathParameters<LocationId>,
    Form(form): Form<Reorganize>,
) -> Result<Success<CopyResponse>, Error> {
    let copies = handler.location_copied(location_id, form.parent_id).await?;

    let copy_id = copies
        .get(&location_id)
        .copied()
        .ok_or_else(|| Error::internal_server_error("Location was not copied"))?;

    Ok(Success::created(CopyResponse {
        location_id: copy_id,
        copies,
    }))
}
