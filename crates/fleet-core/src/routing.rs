//! Route alternatives: decoding and derived per-route metrics.

use crate::error::ReportError;
use crate::models::LatLng;
use crate::polyline;
use crate::spatial::path_length_m;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RouteType {
    Fastest,
    Shortest,
    FuelOptimal,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Shortest => "shortest",
            Self::FuelOptimal => "fuel_optimal",
        }
    }

    /// Overlay color used when every alternative is drawn on the map.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Fastest => "#1976d2",
            Self::Shortest => "#2e7d32",
            Self::FuelOptimal => "#ed6c02",
        }
    }
}

impl TryFrom<String> for RouteType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized: String = value
            .chars()
            .filter(|ch| !matches!(ch, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "fastest" => Ok(Self::Fastest),
            "shortest" => Ok(Self::Shortest),
            "fueloptimal" | "fuelefficient" | "eco" => Ok(Self::FuelOptimal),
            _ => Err(format!("unknown route type: {value}")),
        }
    }
}

impl From<RouteType> for String {
    fn from(value: RouteType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fuel needed for a route, or `N/A` when the device's consumption rate is unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuelEstimate {
    Liters(f64),
    NotAvailable,
}

impl FuelEstimate {
    pub fn liters(&self) -> Option<f64> {
        match self {
            Self::Liters(liters) => Some(*liters),
            Self::NotAvailable => None,
        }
    }
}

impl fmt::Display for FuelEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Liters(liters) => write!(f, "{:.2}", liters),
            Self::NotAvailable => f.write_str("N/A"),
        }
    }
}

impl Serialize for FuelEstimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Liters(liters) => serializer.serialize_f64(*liters),
            Self::NotAvailable => serializer.serialize_str("N/A"),
        }
    }
}

/// `distance_km * rate / 100`, rounded to 2 decimals.
pub fn estimate_fuel(distance_km: f64, consumption_rate: Option<f64>) -> FuelEstimate {
    match consumption_rate {
        Some(rate) if rate.is_finite() && rate >= 0.0 && distance_km.is_finite() => {
            FuelEstimate::Liters((distance_km * rate / 100.0 * 100.0).round() / 100.0)
        }
        _ => FuelEstimate::NotAvailable,
    }
}

/// Route as returned by the route backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoute {
    pub route_type: RouteType,
    pub distance_km: f64,
    pub duration_min: f64,
    #[serde(alias = "encodedPath")]
    pub polyline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAlternative {
    pub route_type: RouteType,
    pub distance_km: f64,
    pub duration_min: f64,
    pub encoded_path: String,
    pub estimated_fuel_liters: FuelEstimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl BoundingBox {
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut south_west = *first;
        let mut north_east = *first;
        for point in &points[1..] {
            south_west.lat = south_west.lat.min(point.lat);
            south_west.lng = south_west.lng.min(point.lng);
            north_east.lat = north_east.lat.max(point.lat);
            north_east.lng = north_east.lng.max(point.lng);
        }
        Some(Self {
            south_west,
            north_east,
        })
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            south_west: LatLng::new(
                self.south_west.lat.min(other.south_west.lat),
                self.south_west.lng.min(other.south_west.lng),
            ),
            north_east: LatLng::new(
                self.north_east.lat.max(other.north_east.lat),
                self.north_east.lng.max(other.north_east.lng),
            ),
        }
    }
}

/// A decoded alternative, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRoute {
    #[serde(flatten)]
    pub alternative: RouteAlternative,
    pub path: Vec<LatLng>,
    pub path_length_m: f64,
    pub bounds: Option<BoundingBox>,
    pub color: &'static str,
}

/// Decode a raw route and derive its metrics.
pub fn enrich_route(raw: RawRoute, consumption_rate: Option<f64>) -> Result<PlannedRoute, ReportError> {
    let path = polyline::decode(&raw.polyline).map_err(|err| {
        ReportError::DecodeFailure(format!("{} route: {}", raw.route_type, err))
    })?;

    let estimated_fuel_liters = estimate_fuel(raw.distance_km, consumption_rate);
    let path_length_m = path_length_m(&path);
    let bounds = BoundingBox::from_points(&path);

    Ok(PlannedRoute {
        color: raw.route_type.color(),
        alternative: RouteAlternative {
            route_type: raw.route_type,
            distance_km: raw.distance_km,
            duration_min: raw.duration_min,
            encoded_path: raw.polyline,
            estimated_fuel_liters,
        },
        path,
        path_length_m,
        bounds,
    })
}
