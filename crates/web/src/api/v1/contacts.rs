use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{delete, get, on},
    Json, Router,
};
use model::contact::EmergencyContact;

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, VecResponse, METHOD_FILTER_ALL,
    },
    middleware::base_url::base_url_middleware,
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/contacts{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<EmergencyContact>))
        .route("/", get(get_contacts).post(add_contact).put(replace_contacts))
        .route("/:phone_number", delete(remove_contact))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_contacts(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { contacts, .. }): State<WebState>,
) -> HateoasResult<VecResponse<EmergencyContact>> {
    contacts
        .list()
        .await
        .map(|contacts| VecResponse::non_paginated(contacts).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn add_contact(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { contacts, .. }): State<WebState>,
    Json(contact): Json<EmergencyContact>,
) -> HateoasResult<VecResponse<EmergencyContact>> {
    contacts
        .add(contact)
        .await
        .map(|contacts| VecResponse::non_paginated(contacts).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

/// Replaces the whole list at once, the way the companion app saves its
/// contact screen.
async fn replace_contacts(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { contacts, .. }): State<WebState>,
    Json(replacement): Json<Vec<EmergencyContact>>,
) -> HateoasResult<VecResponse<EmergencyContact>> {
    contacts
        .replace(replacement)
        .await
        .map(|contacts| VecResponse::non_paginated(contacts).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::PUT)
                .with_uri(original_uri.path())
        })
}

async fn remove_contact(
    OriginalUri(original_uri): OriginalUri,
    Path(phone_number): Path<String>,
    State(WebState { contacts, .. }): State<WebState>,
) -> HateoasResult<VecResponse<EmergencyContact>> {
    contacts
        .remove(&phone_number)
        .await
        .map(|contacts| VecResponse::non_paginated(contacts).hateoas().json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}
