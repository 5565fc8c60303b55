use crate::models::{Coordinate, RouteDeviation};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Assumed average carrier speed for deviation time estimates
const AVERAGE_SPEED_KMH: f64 = 30.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// Rounded to 2 decimal places so downstream comparisons stay stable.
/// Symmetric: `distance_km(a, b) == distance_km(b, a)`.
#[inline]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

/// Validate a latitude/longitude pair
#[inline]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Estimate the deviation a carrier incurs to service a package
///
/// Finds the route point nearest to pickup and the route point nearest to
/// delivery independently, sums the two point-to-point distances, and
/// converts to minutes at the assumed average speed. Returns `None` for an
/// empty route.
pub fn route_deviation(
    route: &[Coordinate],
    pickup: Coordinate,
    delivery: Coordinate,
) -> Option<RouteDeviation> {
    if route.is_empty() {
        return None;
    }

    let pickup_deviation = route
        .iter()
        .map(|&point| distance_km(point, pickup))
        .fold(f64::INFINITY, f64::min);

    let delivery_deviation = route
        .iter()
        .map(|&point| distance_km(point, delivery))
        .fold(f64::INFINITY, f64::min);

    let distance = round2(pickup_deviation + delivery_deviation);
    let minutes = round2(distance / AVERAGE_SPEED_KMH * 60.0);

    Some(RouteDeviation {
        distance_km: distance,
        minutes,
    })
}

#[inline]
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
