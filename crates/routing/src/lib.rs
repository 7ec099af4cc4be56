use std::env;
use std::error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use escort::routing::RouteProvider;
use model::{coordinate::Coordinate, route::Route};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum RoutingError {
    RequestError(Arc<reqwest::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
    EmptyRoute,
}

impl error::Error for RoutingError {}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RoutingError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            RoutingError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
            RoutingError::EmptyRoute => {
                write!(f, "Routing service returned no route points.")
            }
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(e: reqwest::Error) -> Self {
        RoutingError::RequestError(Arc::new(e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutingRequest {
    start: WirePoint,
    end: WirePoint,
}

#[derive(Debug, Clone, Deserialize)]
struct RoutingResponse {
    route: WireRoute,
}

#[derive(Debug, Clone, Deserialize)]
struct WireRoute {
    /// Kilometers.
    distance: Option<f64>,
    /// Minutes.
    duration: Option<f64>,
    points: Vec<WirePoint>,
}

fn route_from_wire(wire: WireRoute) -> Result<Route, RoutingError> {
    let points: Vec<Coordinate> = wire
        .points
        .iter()
        .map(|point| Coordinate::new(point.latitude, point.longitude))
        .collect();
    let destination = match points.last() {
        Some(point) => *point,
        None => return Err(RoutingError::EmptyRoute),
    };
    let mut route = Route::new(points, destination);
    route.distance_m = wire.distance.map(|kilometers| kilometers * 1000.0);
    route.duration_s = wire.duration.map(|minutes| minutes * 60.0);
    Ok(route)
}

/// Client for the routing backend. Posts start and destination to the
/// `/api/routing` endpoint and converts the polyline it returns.
pub struct HttpRouteProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRouteProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Reads `ROUTING_API_URL`.
    pub fn from_env() -> Option<Self> {
        Some(Self::new(env::var("ROUTING_API_URL").ok()?))
    }

    async fn request_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RoutingError> {
        let url = format!("{}/api/routing", self.base_url);
        let request = RoutingRequest {
            start: WirePoint {
                latitude: start.latitude,
                longitude: start.longitude,
            },
            end: WirePoint {
                latitude: destination.latitude,
                longitude: destination.longitude,
            },
        };
        let response = self.client.post(&url).json(&request).send().await?;
        match response.status() {
            reqwest::StatusCode::OK => {
                let body: RoutingResponse = response.json().await?;
                route_from_wire(body.route)
            }
            other => match response.text().await {
                Ok(text) => Err(RoutingError::InvalidResponse {
                    status_code: other,
                    url,
                    response: Some(text),
                }),
                Err(_) => Err(RoutingError::InvalidResponse {
                    status_code: other,
                    url,
                    response: None,
                }),
            },
        }
    }
}

#[async_trait]
impl RouteProvider for HttpRouteProvider {
    async fn fetch_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, Box<dyn error::Error + Send>> {
        match self.request_route(start, destination).await {
            Ok(route) => Ok(route),
            Err(why) => Err(Box::new(why)),
        }
    }
}

/// Route source that needs no backend: points interpolated on the
/// straight line between start and destination, the same shape the
/// development routing backend responds with.
pub struct SyntheticRouteProvider {
    segments: usize,
}

impl SyntheticRouteProvider {
    pub fn new(segments: usize) -> Self {
        Self {
            segments: segments.max(1),
        }
    }
}

impl Default for SyntheticRouteProvider {
    fn default() -> Self {
        Self::new(2)
    }
}

#[async_trait]
impl RouteProvider for SyntheticRouteProvider {
    async fn fetch_route(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, Box<dyn error::Error + Send>> {
        let segments = self.segments as f64;
        let points: Vec<Coordinate> = (0..=self.segments)
            .map(|step| {
                let fraction = step as f64 / segments;
                Coordinate::new(
                    start.latitude + (destination.latitude - start.latitude) * fraction,
                    start.longitude + (destination.longitude - start.longitude) * fraction,
                )
            })
            .collect();
        let mut route = Route::new(points, destination);
        route.distance_m = Some(start.distance_to(&destination));
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_the_backend_response() {
        let body = r#"{
            "route": {
                "distance": 5.2,
                "duration": 15,
                "points": [
                    { "latitude": 54.3233, "longitude": 10.1228 },
                    { "latitude": 54.3154, "longitude": 10.1342 },
                    { "latitude": 54.3075, "longitude": 10.1456 }
                ]
            }
        }"#;
        let response: RoutingResponse = serde_json::from_str(body).unwrap();
        let route = route_from_wire(response.route).unwrap();

        assert_eq!(route.len(), 3);
        assert_eq!(route.points[0], Coordinate::new(54.3233, 10.1228));
        assert_eq!(route.destination, Coordinate::new(54.3075, 10.1456));
        assert_eq!(route.distance_m, Some(5200.0));
        assert_eq!(route.duration_s, Some(900.0));
    }

    #[test]
    fn a_response_without_points_is_an_error() {
        let body = r#"{ "route": { "distance": null, "duration": null, "points": [] } }"#;
        let response: RoutingResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            route_from_wire(response.route),
            Err(RoutingError::EmptyRoute)
        ));
    }

    #[tokio::test]
    async fn synthetic_routes_interpolate_between_the_endpoints() {
        let provider = SyntheticRouteProvider::new(4);
        let start = Coordinate::new(0.0, 0.0);
        let destination = Coordinate::new(0.0, 0.004);
        let route = provider.fetch_route(start, destination).await.unwrap();

        assert_eq!(route.len(), 5);
        assert_eq!(route.points[0], start);
        assert_eq!(route.points[2], Coordinate::new(0.0, 0.002));
        assert_eq!(route.destination, destination);
        assert!(route.distance_m.is_some_and(|meters| meters > 400.0));
    }
}
