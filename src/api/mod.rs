//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use request::parse_languages;
pub use response::Error;
pub use response::Success;

use crate::storage::Storage;

mod aliases;
mod locations;
mod request;
mod response;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let locations = Router::new()
        .route("/", post(locations::create::<S>))
        .route("/{location}", delete(locations::delete::<S>))
        .route("/{location}/aliases", get(locations::list_aliases::<S>))
        .route("/{location}/aliases", post(locations::create_alias::<S>))
        .route("/{location}/publish", post(locations::publish::<S>))
        .route("/{location}/reverse", get(locations::reverse::<S>))
        .route("/{location}/move", post(locations::move_location::<S>))
        .route("/{location}/copy", post(locations::copy::<S>));

    let aliases = Router::new()
        .route("/global", get(aliases::list_global::<S>))
        .route("/global", post(aliases::create_global::<S>))
        .route("/{alias}", get(aliases::single::<S>))
        .route("/{alias}", delete(aliases::delete::<S>));

    Router::new()
        .route("/lookup", get(aliases::lookup::<S>))
        .nest("/locations", locations)
        .nest("/aliases", aliases)
}
