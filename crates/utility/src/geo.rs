pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

/// Great-circle distance in meters between two WGS84 positions.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude_2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Angle in degrees between the vectors p1->p2 and p2->p3, in [0, 180].
///
/// Works on the raw coordinate plane, which is accurate enough for
/// classifying turns on routes spanning a few kilometers. Degenerate
/// segments (repeated points) count as straight.
pub fn turn_angle_degrees(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> f64 {
    let v1 = (p2.0 - p1.0, p2.1 - p1.1);
    let v2 = (p3.0 - p2.0, p3.1 - p2.1);

    let magnitude_1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let magnitude_2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if magnitude_1 == 0.0 || magnitude_2 == 0.0 {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    // Clamp before acos so floating-point overshoot cannot leave the domain.
    let cos_theta = (dot / (magnitude_1 * magnitude_2)).clamp(-1.0, 1.0);
    to_degrees(cos_theta.acos())
}
