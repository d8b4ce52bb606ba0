//! Encoded polyline decoding (the compact path format used by routing backends).
//!
//! Each coordinate is stored as a zig-zag encoded delta from the previous
//! point, split into 5-bit chunks offset by 63 into printable ASCII.

use crate::models::LatLng;
use thiserror::Error;

/// Five decimal places, the precision route backends emit.
pub const DEFAULT_PRECISION: u32 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolylineError {
    #[error("invalid character {ch:?} at offset {offset}")]
    InvalidChar { ch: char, offset: usize },
    #[error("path ends in the middle of a value at offset {offset}")]
    Truncated { offset: usize },
    #[error("value starting at offset {offset} overflows")]
    Overflow { offset: usize },
    #[error("decoded point {lat},{lng} is outside valid coordinates")]
    OutOfRange { lat: f64, lng: f64 },
}

/// Decode a path encoded with [`DEFAULT_PRECISION`].
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, PolylineError> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

pub fn decode_with_precision(encoded: &str, precision: u32) -> Result<Vec<LatLng>, PolylineError> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        lng += decode_value(bytes, &mut index)?;

        let point = LatLng::new(lat as f64 / factor, lng as f64 / factor);
        if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
            return Err(PolylineError::OutOfRange {
                lat: point.lat,
                lng: point.lng,
            });
        }
        points.push(point);
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated { offset: start });
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidChar {
                ch: byte as char,
                offset: *index,
            });
        }
        if shift > 60 {
            return Err(PolylineError::Overflow { offset: start });
        }

        let chunk = (byte - 63) as i64;
        *index += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 { !(result >> 1) } else { result >> 1 })
}
