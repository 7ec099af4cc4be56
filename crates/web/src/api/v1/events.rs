use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use axum_extra::TypedHeader;
use futures::stream::{self, Stream};
use model::event::JourneyEvent;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::StreamExt as _;
use tower_http::trace::TraceLayer;
use utility::id::Id;

use crate::{
    common::{schema_no_example, RouteErrorResponse, RouteResult},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/:id/events", get(sse_handler))
        .route("/:id/events/schema", get(schema_no_example::<JourneyEvent>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Streams a journey's live events. The subscription starts at the moment
/// of the request; earlier events are not replayed.
async fn sse_handler(
    TypedHeader(user_agent): TypedHeader<headers::UserAgent>,
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<u64>,
    State(WebState { journeys, .. }): State<WebState>,
) -> RouteResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    log::info!("`{}` subscribed to journey {} events", user_agent.as_str(), id);

    let handle = journeys.handle(Id::new(id)).await.map_err(|why| {
        RouteErrorResponse::from(why)
            .with_method(&Method::GET)
            .with_uri(original_uri.path())
    })?;

    let stream = stream::unfold(handle.subscribe(), |mut events| async move {
        loop {
            match events.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse_event) => return Some((sse_event, events)),
                    Err(why) => {
                        log::error!("could not serialize journey event: {}", why);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("event subscriber lagging, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .map(Ok);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
