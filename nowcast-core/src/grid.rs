//! Conversion from latitude/longitude to the KMA forecast grid.
//!
//! The grid is a Lambert Conformal Conic projection with 5 km cells. The
//! constants below are the ones the weather service publishes; any drift
//! moves requests to the wrong cell without an error from upstream.

use std::f64::consts::PI;

use crate::model::GridCoordinate;

const EARTH_RADIUS_KM: f64 = 6371.00877;
const GRID_SPACING_KM: f64 = 5.0;
const STANDARD_PARALLEL_1: f64 = 30.0;
const STANDARD_PARALLEL_2: f64 = 60.0;
const ORIGIN_LON: f64 = 126.0;
const ORIGIN_LAT: f64 = 38.0;
const ORIGIN_X: f64 = 43.0;
const ORIGIN_Y: f64 = 136.0;

const DEG_TO_RAD: f64 = PI / 180.0;

/// Project a geographic position onto the forecast grid.
///
/// Longitudes outside `[-180, 180]` are wrapped by 360° first, so
/// `to_grid(lat, 185.0) == to_grid(lat, -175.0)`.
pub fn to_grid(latitude: f64, longitude: f64) -> GridCoordinate {
    let re = EARTH_RADIUS_KM / GRID_SPACING_KM;
    let slat1 = STANDARD_PARALLEL_1 * DEG_TO_RAD;
    let slat2 = STANDARD_PARALLEL_2 * DEG_TO_RAD;
    let olon = ORIGIN_LON * DEG_TO_RAD;
    let olat = ORIGIN_LAT * DEG_TO_RAD;

    let sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
    let sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();

    let sf = (PI * 0.25 + slat1 * 0.5).tan();
    let sf = sf.powf(sn) * slat1.cos() / sn;

    let ro = (PI * 0.25 + olat * 0.5).tan();
    let ro = re * sf / ro.powf(sn);

    let ra = (PI * 0.25 + latitude * DEG_TO_RAD * 0.5).tan();
    let ra = re * sf / ra.powf(sn);

    let mut theta = normalize_longitude(longitude) * DEG_TO_RAD - olon;
    if theta > PI {
        theta -= 2.0 * PI;
    }
    if theta < -PI {
        theta += 2.0 * PI;
    }
    theta *= sn;

    let x = ra * theta.sin() + ORIGIN_X;
    let y = ro - ra * theta.cos() + ORIGIN_Y;

    GridCoordinate {
        nx: (x + 0.5).floor() as i32,
        ny: (y + 0.5).floor() as i32,
    }
}

fn normalize_longitude(mut longitude: f64) -> f64 {
    while longitude > 180.0 {
        longitude -= 360.0;
    }
    while longitude < -180.0 {
        longitude += 360.0;
    }
    longitude
}
