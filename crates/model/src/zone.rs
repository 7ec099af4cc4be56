use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{coordinate::Coordinate, ExampleData};

/// A named circular geofence zone.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: Id<Zone>,
    pub name: String,
    pub center: Coordinate,
    pub radius_m: f64,
}

impl Zone {
    pub fn new(
        id: Id<Zone>,
        name: impl Into<String>,
        center: Coordinate,
        radius_m: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            center,
            radius_m,
        }
    }

    pub fn contains(&self, position: &Coordinate) -> bool {
        self.center.distance_to(position) <= self.radius_m
    }
}

impl HasId for Zone {
    type IdType = u64;
}

impl ExampleData for Zone {
    fn example_data() -> Self {
        Zone::new(
            Id::new(1),
            "Route zone 1",
            Coordinate::new(54.3233, 10.1228),
            100.0,
        )
    }
}
