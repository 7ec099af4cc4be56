use std::error::Error;

use async_trait::async_trait;
use model::{coordinate::Coordinate, route::Route};

/// Turns a start/destination pair into a travel route.
///
/// An unavailable provider means no route and therefore no journey;
/// callers never start a simulation on a partial plan.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn fetch_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, Box<dyn Error + Send>>;
}
