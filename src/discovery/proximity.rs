use crate::discovery::location::Location;
use crate::utils::geo::{is_within_radius, HasCoordinate};

/// Radius clients send for "any distance"
pub const UNLIMITED_RADIUS_KM: f64 = 9999.0;

pub fn is_unlimited(radius_km: f64) -> bool {
    radius_km >= UNLIMITED_RADIUS_KM
}

/// Keep the items within `radius_km` of `origin`, in their original order.
///
/// Without an origin nothing is filtered. Items whose distance is NaN only
/// survive an unlimited radius.
pub fn filter_by_radius<T: HasCoordinate>(
    items: Vec<T>,
    origin: Option<&Location>,
    radius_km: f64,
) -> Vec<T> {
    let Some(origin) = origin else {
        return items;
    };

    if is_unlimited(radius_km) {
        return items;
    }

    items
        .into_iter()
        .filter(|item| is_within_radius(item.coordinate(), origin.coordinate, radius_km))
        .collect()
}
