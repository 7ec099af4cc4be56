use itertools::Itertools;
use model::{checkpoint::Checkpoint, coordinate::Coordinate, route::Route};
use utility::{geo, id::IdSequence};

use crate::ValidationError;

/// Turns below this angle count as straight road.
pub const STRAIGHT_ANGLE_DEGREES: f64 = 30.0;
/// Spacing between derived checkpoints on straight road.
pub const STRAIGHT_SPACING_KM: f64 = 3.0;
/// Spacing near turns; checkpoints sit denser where the route bends.
pub const TURN_SPACING_KM: f64 = 2.0;
/// Assumed travel speed for time budgets.
pub const CRUISE_SPEED_KMH: f64 = 40.0;
/// Assumed travel speed for the final leg to the destination.
pub const FINAL_LEG_SPEED_KMH: f64 = 50.0;
/// Manual checkpoints must sit within this distance of the polyline.
pub const PLACEMENT_RADIUS_M: f64 = 50.0;

pub const DESTINATION_LABEL: &str = "Destination";

/// Derives timed checkpoints from a route polyline.
///
/// Interior points are classified by their turn angle. A candidate earns
/// a checkpoint once enough straight-line distance has accumulated since
/// the previous one: 3 km on straight road, 2 km around a turn. The
/// destination always closes the list with its own checkpoint.
///
/// Runs once per destination; re-deriving mid-journey would invalidate
/// already-elapsed deadlines.
pub fn derive_checkpoints(route: &Route, ids: &IdSequence) -> Vec<Checkpoint> {
    let mut checkpoints: Vec<Checkpoint> = Vec::new();
    let mut last_anchor = route.points.first().copied().unwrap_or(route.destination);

    for (first, candidate, third) in route.points.iter().tuple_windows() {
        let angle =
            geo::turn_angle_degrees(first.as_tuple(), candidate.as_tuple(), third.as_tuple());
        let required_km = if angle < STRAIGHT_ANGLE_DEGREES {
            STRAIGHT_SPACING_KM
        } else {
            TURN_SPACING_KM
        };
        let distance_km = last_anchor.distance_to(candidate) / 1000.0;
        if distance_km >= required_km {
            let minutes = travel_minutes(distance_km, CRUISE_SPEED_KMH);
            let number = checkpoints.len() + 1;
            checkpoints.push(
                Checkpoint::new(
                    ids.next(),
                    *candidate,
                    format!("Checkpoint {number}"),
                    minutes,
                )
                .with_description(segment_description(distance_km, minutes)),
            );
            last_anchor = *candidate;
        }
    }

    let final_km = last_anchor.distance_to(&route.destination) / 1000.0;
    let minutes = travel_minutes(final_km, FINAL_LEG_SPEED_KMH);
    checkpoints.push(
        Checkpoint::new(ids.next(), route.destination, DESTINATION_LABEL, minutes)
            .with_description(segment_description(final_km, minutes)),
    );
    checkpoints
}

/// A manually placed checkpoint must lie near the computed route.
pub fn validate_placement(route: &Route, position: &Coordinate) -> Result<(), ValidationError> {
    if !position.is_valid() {
        return Err(ValidationError::InvalidCoordinate);
    }
    match route.distance_to_polyline(position) {
        Some(distance) if distance < PLACEMENT_RADIUS_M => Ok(()),
        Some(_) => Err(ValidationError::CheckpointNotNearRoute),
        None => Err(ValidationError::EmptyRoute),
    }
}

/// Orders checkpoints from start to destination (descending distance to
/// the destination) and renumbers the display labels. The destination
/// checkpoint keeps its label. Labels change, identities never do.
pub fn sort_and_relabel(checkpoints: &mut [Checkpoint], destination: &Coordinate) {
    checkpoints.sort_by(|a, b| {
        let to_a = a.position.distance_to(destination);
        let to_b = b.position.distance_to(destination);
        to_b.partial_cmp(&to_a).unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut number = 0;
    for checkpoint in checkpoints.iter_mut() {
        if checkpoint.label == DESTINATION_LABEL {
            continue;
        }
        number += 1;
        checkpoint.label = format!("Checkpoint {number}");
    }
}

fn travel_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    let minutes = distance_km / speed_kmh * 60.0;
    (minutes.round() as u32).max(1)
}

fn segment_description(distance_km: f64, minutes: u32) -> String {
    format!("Distance: {distance_km:.2} km, Time: {minutes} minutes")
}

#[cfg(test)]
mod tests {
    use model::route::Route;
    use utility::id::Id;

    use super::*;

    /// Equator points spaced roughly one kilometer apart.
    fn straight_kilometers(count: usize) -> Vec<Coordinate> {
        (0..=count)
            .map(|index| Coordinate::new(0.0, index as f64 * 0.009))
            .collect()
    }

    #[test]
    fn straight_routes_space_checkpoints_every_three_kilometers() {
        let points = straight_kilometers(10);
        let destination = points[10];
        let route = Route::new(points, destination);
        let checkpoints = derive_checkpoints(&route, &IdSequence::new());

        // Placed after 3, 6 and 9 km, plus the destination itself.
        assert_eq!(checkpoints.len(), 4);
        assert_eq!(checkpoints[0].label, "Checkpoint 1");
        assert_eq!(checkpoints[2].label, "Checkpoint 3");
        assert_eq!(checkpoints[3].label, DESTINATION_LABEL);
        assert_eq!(checkpoints[3].position, destination);

        // Three kilometers at 40 km/h.
        assert_eq!(checkpoints[0].planned_minutes, 5);
        // The final kilometer at 50 km/h still gets the one-minute floor.
        assert_eq!(checkpoints[3].planned_minutes, 1);
    }

    #[test]
    fn a_sharp_turn_earns_a_checkpoint_after_two_kilometers() {
        // Two straight kilometers, then a right-angle turn north.
        let points = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.009),
            Coordinate::new(0.0, 0.018),
            Coordinate::new(0.009, 0.018),
            Coordinate::new(0.018, 0.018),
        ];
        let destination = points[4];
        let route = Route::new(points.clone(), destination);
        let checkpoints = derive_checkpoints(&route, &IdSequence::new());

        assert_eq!(checkpoints[0].position, points[2]);
        assert_eq!(checkpoints[0].planned_minutes, 3);
    }

    #[test]
    fn two_point_routes_only_get_the_destination_checkpoint() {
        let points = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.018)];
        let destination = points[1];
        let route = Route::new(points, destination);
        let checkpoints = derive_checkpoints(&route, &IdSequence::new());

        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].label, DESTINATION_LABEL);
        // Two kilometers at 50 km/h, rounded.
        assert_eq!(checkpoints[0].planned_minutes, 2);
    }

    #[test]
    fn checkpoint_ids_are_assigned_in_derivation_order() {
        let points = straight_kilometers(10);
        let destination = points[10];
        let route = Route::new(points, destination);
        let checkpoints = derive_checkpoints(&route, &IdSequence::new());

        let ids: Vec<u64> = checkpoints
            .iter()
            .map(|checkpoint| checkpoint.id.raw())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn placement_requires_proximity_to_the_polyline() {
        let points = straight_kilometers(2);
        let destination = points[2];
        let route = Route::new(points, destination);

        // Right on a route point.
        assert!(validate_placement(&route, &Coordinate::new(0.0, 0.009)).is_ok());
        // Roughly two kilometers off the route.
        assert!(matches!(
            validate_placement(&route, &Coordinate::new(0.018, 0.009)),
            Err(ValidationError::CheckpointNotNearRoute)
        ));
        assert!(matches!(
            validate_placement(&route, &Coordinate::new(200.0, 0.0)),
            Err(ValidationError::InvalidCoordinate)
        ));
    }

    #[test]
    fn placement_on_an_empty_route_is_rejected() {
        let route = Route::new(vec![], Coordinate::new(0.0, 0.0));
        assert!(matches!(
            validate_placement(&route, &Coordinate::new(0.0, 0.0)),
            Err(ValidationError::EmptyRoute)
        ));
    }

    #[test]
    fn sorting_orders_by_descending_distance_to_the_destination() {
        let destination = Coordinate::new(0.0, 0.027);
        let ids = IdSequence::new();
        let near = Checkpoint::new(ids.next(), Coordinate::new(0.0, 0.018), "Checkpoint", 5);
        let far = Checkpoint::new(ids.next(), Coordinate::new(0.0, 0.0), "Checkpoint", 5);
        let destination_checkpoint =
            Checkpoint::new(ids.next(), destination, DESTINATION_LABEL, 5);
        let far_id = far.id;

        let mut checkpoints = vec![near, destination_checkpoint, far];
        sort_and_relabel(&mut checkpoints, &destination);

        assert_eq!(checkpoints[0].label, "Checkpoint 1");
        assert_eq!(checkpoints[0].id, far_id);
        assert_eq!(checkpoints[1].label, "Checkpoint 2");
        // The destination stays last and keeps its label.
        assert_eq!(checkpoints[2].label, DESTINATION_LABEL);
    }

    #[test]
    fn relabeling_never_changes_identities() {
        let destination = Coordinate::new(0.0, 0.027);
        let ids = IdSequence::new();
        let mut checkpoints = vec![
            Checkpoint::new(ids.next(), Coordinate::new(0.0, 0.018), "Checkpoint 1", 5),
            Checkpoint::new(ids.next(), Coordinate::new(0.0, 0.009), "Checkpoint 2", 5),
        ];
        let before: Vec<Id<Checkpoint>> =
            checkpoints.iter().map(|checkpoint| checkpoint.id).collect();

        sort_and_relabel(&mut checkpoints, &destination);

        // Sorted into reverse order, ids untouched.
        assert_eq!(checkpoints[0].id, before[1]);
        assert_eq!(checkpoints[1].id, before[0]);
        assert_eq!(checkpoints[0].label, "Checkpoint 1");
        assert_eq!(checkpoints[1].label, "Checkpoint 2");
    }
}
