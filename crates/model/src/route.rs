use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{coordinate::Coordinate, ExampleData};

/// An ordered polyline from start to destination. Index order is travel
/// order; the sequence is fixed once a route has been computed.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub points: Vec<Coordinate>,
    pub destination: Coordinate,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
}

impl Route {
    pub fn new(points: Vec<Coordinate>, destination: Coordinate) -> Self {
        Self {
            points,
            destination,
            distance_m: None,
            duration_s: None,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point_at(&self, index: usize) -> Option<&Coordinate> {
        self.points.get(index)
    }

    /// Distance from `position` to the closest polyline point, in meters.
    /// `None` for an empty route.
    pub fn distance_to_polyline(&self, position: &Coordinate) -> Option<f64> {
        self.points
            .iter()
            .map(|point| position.distance_to(point))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl ExampleData for Route {
    fn example_data() -> Self {
        let points = vec![
            Coordinate::new(54.3233, 10.1228),
            Coordinate::new(54.3150, 10.1340),
            Coordinate::new(54.3075, 10.1456),
        ];
        let destination = points[2];
        Route::new(points, destination)
    }
}
