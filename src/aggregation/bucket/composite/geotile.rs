//! Web mercator tiles, encoded as `(zoom << 58) | (x << 29) | y`.
//!
//! For a fixed zoom, ordering the encoded ids orders the tiles by `x`, then
//! by `y`.

use std::f64::consts::PI;

use crate::AggregationError;
use crate::schema::GeoPoint;

pub(super) const MAX_ZOOM: u8 = 29;

const ZOOM_SHIFT: u32 = 58;
const X_SHIFT: u32 = 29;
const COORD_MASK: u64 = (1 << X_SHIFT) - 1;

fn num_tiles(zoom: u8) -> u64 {
    1u64 << zoom
}

fn clamp_tile(tile: f64, tiles: u64) -> u64 {
    // NaN and infinite coordinates land on the borders
    tile.floor().clamp(0.0, (tiles - 1) as f64) as u64
}

fn longitude_to_tile(lon: f64, tiles: u64) -> u64 {
    clamp_tile((lon + 180.0) / 360.0 * tiles as f64, tiles)
}

fn latitude_to_tile(lat: f64, tiles: u64) -> u64 {
    let sin_lat = lat.to_radians().sin();
    let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);
    clamp_tile(y * tiles as f64, tiles)
}

pub(super) fn encode(zoom: u8, x: u64, y: u64) -> u64 {
    (u64::from(zoom) << ZOOM_SHIFT) | (x << X_SHIFT) | y
}

pub(super) fn decode(tile_id: u64) -> (u8, u64, u64) {
    (
        (tile_id >> ZOOM_SHIFT) as u8,
        (tile_id >> X_SHIFT) & COORD_MASK,
        tile_id & COORD_MASK,
    )
}

/// Id of the tile containing `point` at zoom level `zoom`.
pub(super) fn tile_id(point: GeoPoint, zoom: u8) -> u64 {
    let tiles = num_tiles(zoom);
    encode(
        zoom,
        longitude_to_tile(point.lon, tiles),
        latitude_to_tile(point.lat, tiles),
    )
}

pub(super) fn tile_to_string(tile_id: u64) -> String {
    let (zoom, x, y) = decode(tile_id);
    format!("{zoom}/{x}/{y}")
}

/// Parses a `"zoom/x/y"` key.
pub(super) fn parse_tile(key: &str) -> crate::Result<u64> {
    let invalid = || AggregationError::InvalidArgument(format!("Invalid geotile key '{key}'"));
    let mut parts = key.split('/');
    let (Some(zoom), Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    let zoom: u8 = zoom.parse().map_err(|_| invalid())?;
    let x: u64 = x.parse().map_err(|_| invalid())?;
    let y: u64 = y.parse().map_err(|_| invalid())?;
    if zoom > MAX_ZOOM || x >= num_tiles(zoom) || y >= num_tiles(zoom) {
        return Err(invalid());
    }
    Ok(encode(zoom, x, y))
}
