use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::{get, on, patch, post, put},
    Extension, Json, Router,
};
use escort::{sos, EscortError, ValidationError};
use model::{
    checkpoint::Checkpoint, coordinate::Coordinate, journey::Journey, sos::SosStatus, zone::Zone,
};
use serde::Deserialize;
use serde_json::json;
use utility::{id::Id, let_also::LetAlso};

use crate::{
    common::{
        route_not_found, schema, HateoasResult, RouteErrorResponse, RouteResult, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

use super::events;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/journeys{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Journey>))
        .route("/checkpoints/schema", get(schema::<Checkpoint>))
        .route("/zones/schema", get(schema::<Zone>))
        .route("/", get(get_journeys).post(plan_journey))
        .route("/:id", get(get_journey).delete(delete_journey))
        .route("/:id/destination", put(set_destination))
        .route("/:id/start", post(start_journey))
        .route("/:id/stop", post(stop_journey))
        .route("/:id/pause", post(pause_journey))
        .route("/:id/resume", post(resume_journey))
        .route("/:id/speed-up", post(speed_up))
        .route("/:id/slow-down", post(slow_down))
        .route("/:id/checkpoints", post(add_checkpoint))
        .route(
            "/:id/checkpoints/:checkpoint_id",
            patch(edit_checkpoint).delete(remove_checkpoint),
        )
        .route("/:id/zones", get(get_zones))
        .route("/:id/sos", post(open_sos))
        .route("/:id/sos/safe", post(confirm_safe))
        .route("/:id/sos/unsafe", post(confirm_unsafe))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state.clone())
        .merge(events::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanJourneyDto {
    start: Coordinate,
    destination: Coordinate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationDto {
    destination: Coordinate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddCheckpointDto {
    position: Coordinate,
    planned_minutes: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditCheckpointDto {
    planned_minutes: u32,
}

async fn get_journeys(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<Journey>>> {
    journeys
        .journeys()
        .await
        .map(|journeys| {
            journeys
                .into_iter()
                .map(|journey| journey_hateoas(journey, base_url.clone()))
                .collect::<Vec<_>>()
                .let_owned(|data| VecResponse::non_paginated(data).hateoas().json())
        })
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn plan_journey(
    OriginalUri(original_uri): OriginalUri,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<PlanJourneyDto>,
) -> HateoasResult<Journey> {
    journeys
        .plan(body.start, body.destination)
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(|why| {
            no_route_error(why)
                .with_method(&Method::POST)
                .with_uri(original_uri.path())
        })
}

async fn get_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    journeys
        .journey(Id::new(id))
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::GET)
                .with_uri(original_uri.path())
        })
}

async fn delete_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
) -> RouteResult<Json<serde_json::Value>> {
    journeys
        .remove(Id::new(id))
        .await
        .map(|()| Json(json!({ "message": "journey removed" })))
        .map_err(|why| {
            RouteErrorResponse::from(why)
                .with_method(&Method::DELETE)
                .with_uri(original_uri.path())
        })
}

async fn set_destination(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<DestinationDto>,
) -> HateoasResult<Journey> {
    journeys
        .set_destination(Id::new(id), body.destination)
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(|why| {
            match why {
                EscortError::Validation(ValidationError::SimulationActive) => {
                    RouteErrorResponse::new(StatusCode::BAD_REQUEST)
                        .with_message("Cannot change destination while simulation is running.")
                }
                why => no_route_error(why),
            }
            .with_method(&Method::PUT)
            .with_uri(original_uri.path())
        })
}

async fn start_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.start().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn stop_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.stop().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn pause_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.pause().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn resume_journey(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.resume().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn speed_up(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.speed_up().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn slow_down(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle.slow_down().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn add_checkpoint(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<AddCheckpointDto>,
) -> HateoasResult<Checkpoint> {
    let error = |why: EscortError| {
        match why {
            EscortError::Validation(ValidationError::SimulationActive) => {
                RouteErrorResponse::new(StatusCode::BAD_REQUEST)
                    .with_message("Cannot add new checkpoints while simulation is running.")
            }
            why => RouteErrorResponse::from(why),
        }
        .with_method(&Method::POST)
        .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle
        .add_checkpoint(body.position, body.planned_minutes)
        .await
        .map(|checkpoint| checkpoint_hateoas(Id::new(id), checkpoint, base_url).json())
        .map_err(error)
}

async fn edit_checkpoint(
    OriginalUri(original_uri): OriginalUri,
    Path((id, checkpoint_id)): Path<(u64, u64)>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(body): Json<EditCheckpointDto>,
) -> HateoasResult<Checkpoint> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::PATCH)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle
        .edit_checkpoint(Id::new(checkpoint_id), body.planned_minutes)
        .await
        .map(|checkpoint| checkpoint_hateoas(Id::new(id), checkpoint, base_url).json())
        .map_err(error)
}

async fn remove_checkpoint(
    OriginalUri(original_uri): OriginalUri,
    Path((id, checkpoint_id)): Path<(u64, u64)>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        match why {
            EscortError::Validation(ValidationError::SimulationActive) => {
                RouteErrorResponse::new(StatusCode::BAD_REQUEST)
                    .with_message("Cannot remove checkpoints while simulation is running.")
            }
            why => RouteErrorResponse::from(why),
        }
        .with_method(&Method::DELETE)
        .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle
        .remove_checkpoint(Id::new(checkpoint_id))
        .await
        .map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| journey_hateoas(journey, base_url).json())
        .map_err(error)
}

async fn get_zones(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
) -> HateoasResult<VecResponse<Zone>> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle
        .zones()
        .await
        .map(|zones| VecResponse::non_paginated(zones).hateoas().json())
        .map_err(error)
}

async fn open_sos(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<SosStatus> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    handle
        .open_sos()
        .await
        .map(|status| sos_hateoas(Id::new(id), status, base_url).json())
        .map_err(error)
}

async fn confirm_safe(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    let outcome = handle.confirm_safe().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| {
            journey_builder(journey, base_url)
                .debug_info("outcome", outcome)
                .build()
                .json()
        })
        .map_err(error)
}

async fn confirm_unsafe(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<Journey> {
    let error = |why: EscortError| {
        RouteErrorResponse::from(why)
            .with_method(&Method::POST)
            .with_uri(original_uri.path())
    };
    let handle = journeys.handle(Id::new(id)).await.map_err(error)?;
    let outcome = handle.confirm_unsafe().await.map_err(error)?;
    handle
        .snapshot()
        .await
        .map(|journey| {
            journey_builder(journey, base_url)
                .debug_info("outcome", outcome)
                .build()
                .json()
        })
        .map_err(error)
}

/// The companion app's wording when the routing backend cannot produce a
/// route.
fn no_route_error(why: EscortError) -> RouteErrorResponse {
    match why {
        EscortError::Collaborator(why) => RouteErrorResponse::new(StatusCode::BAD_GATEWAY)
            .with_message("No route available by land. Please try another destination.")
            .with_detailed_information(format!("{}", why)),
        why => RouteErrorResponse::from(why),
    }
}

fn journey_builder(
    journey: Journey,
    base_url: Arc<BaseUrl>,
) -> hateoas::ResponseBuilder<Journey> {
    let id = journey.id;
    let sos_open = journey.sos.is_some();
    let map = sos::map_link(&journey.route.destination);
    hateoas::Response::builder(journey, base_url)
        .link("self", resource!("/{}", id.raw()))
        .link("events", resource!("/{}/events", id.raw()))
        .link("zones", resource!("/{}/zones", id.raw()))
        .link_option(
            "confirm-safe",
            sos_open.then(|| resource!("/{}/sos/safe", id.raw())),
        )
        .link_option(
            "confirm-unsafe",
            sos_open.then(|| resource!("/{}/sos/unsafe", id.raw())),
        )
        .link_extern("map", map)
}

pub(super) fn journey_hateoas(
    journey: Journey,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<Journey> {
    journey_builder(journey, base_url).build()
}

fn checkpoint_hateoas(
    journey: Id<Journey>,
    checkpoint: Checkpoint,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<Checkpoint> {
    let checkpoint_id = checkpoint.id;
    hateoas::Response::builder(checkpoint, base_url)
        .link("journey", resource!("/{}", journey.raw()))
        .link(
            "edit",
            resource!("/{}/checkpoints/{}", journey.raw(), checkpoint_id.raw()),
        )
        .build()
}

fn sos_hateoas(
    journey: Id<Journey>,
    status: SosStatus,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<SosStatus> {
    hateoas::Response::builder(status, base_url)
        .link("journey", resource!("/{}", journey.raw()))
        .link("safe", resource!("/{}/sos/safe", journey.raw()))
        .link("unsafe", resource!("/{}/sos/unsafe", journey.raw()))
        .link("contacts", super::contacts::resource!(""))
        .build()
}
