use pitchside_api::{Coordinate, Stadium};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (haversine) distance in km, rounded to one decimal.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    round_tenth(EARTH_RADIUS_KM * c)
}

pub fn distance_between(a: Coordinate, b: Coordinate) -> f64 {
    distance_km(a.latitude, a.longitude, b.latitude, b.longitude)
}

fn round_tenth(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

/// Anything with a position and a derived distance field.
pub trait Located {
    fn coordinate(&self) -> Coordinate;
    fn set_distance(&mut self, km: f64);
    fn distance(&self) -> f64;
}

impl Located for Stadium {
    fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    fn set_distance(&mut self, km: f64) {
        self.distance = km;
    }

    fn distance(&self) -> f64 {
        self.distance
    }
}

/// Recompute every distance against `origin`, then stable-sort nearest first.
/// Entities at equal distance keep their previous relative order.
pub fn rank_by_distance<T: Located>(items: &mut [T], origin: Coordinate) {
    for item in items.iter_mut() {
        item.set_distance(distance_between(origin, item.coordinate()));
    }
    items.sort_by(|a, b| a.distance().total_cmp(&b.distance()));
}
