use itertools::Itertools;
use model::{coordinate::Coordinate, route::Route, zone::Zone};
use utility::id::IdSequence;

/// Accumulated path distance between two route zones.
pub const ZONE_SPACING_M: f64 = 500.0;
pub const ZONE_RADIUS_M: f64 = 100.0;

pub const DESTINATION_ZONE_NAME: &str = "Destination";

/// Protective zones along a route: one per 500 m of accumulated path
/// distance, plus one around the destination.
///
/// Unlike checkpoint derivation this walks the actual path length, not
/// straight-line distances.
pub fn route_zones(route: &Route, ids: &IdSequence) -> Vec<Zone> {
    let mut zones: Vec<Zone> = Vec::new();
    let mut accumulated = 0.0;
    for (from, to) in route.points.iter().tuple_windows() {
        accumulated += from.distance_to(to);
        if accumulated >= ZONE_SPACING_M {
            let number = zones.len() + 1;
            zones.push(Zone::new(
                ids.next(),
                format!("Route Checkpoint {number}"),
                *to,
                ZONE_RADIUS_M,
            ));
            accumulated = 0.0;
        }
    }
    zones.push(Zone::new(
        ids.next(),
        DESTINATION_ZONE_NAME,
        route.destination,
        ZONE_RADIUS_M,
    ));
    zones
}

/// The zone whose center is closest to `position`.
pub fn nearest<'a>(zones: &'a [Zone], position: &Coordinate) -> Option<&'a Zone> {
    zones.iter().min_by(|a, b| {
        let to_a = a.center.distance_to(position);
        let to_b = b.center.distance_to(position);
        to_a.partial_cmp(&to_b).unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// The zone containing `position`; the nearest one when zones overlap.
pub fn containing<'a>(zones: &'a [Zone], position: &Coordinate) -> Option<&'a Zone> {
    nearest(zones, position).filter(|zone| zone.contains(position))
}
