//! Geographic helpers - great-circle distance, centroids, place keys

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decimal places kept when rounding a centroid into a place key (~10m)
pub const PLACE_KEY_PRECISION: u32 = 4;

/// Haversine great-circle distance between two WGS84 coordinates, in meters
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Round a coordinate component to the place-key precision
pub fn round_coord(value: f64) -> f64 {
    let factor = 10f64.powi(PLACE_KEY_PRECISION as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean of a coordinate sequence; `None` for empty input
pub fn centroid(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<(f64, f64)> {
    let mut lat_sum = 0.0;
    let mut lon_sum = 0.0;
    let mut count = 0usize;
    for (lat, lon) in coords {
        lat_sum += lat;
        lon_sum += lon;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some((lat_sum / count as f64, lon_sum / count as f64))
    }
}
