//! Fleet Core - report pipeline and route enrichment domain logic.
//!
//! Everything in this crate is pure: no I/O, no clocks. The async client
//! lives in `fleet-client`.

pub mod error;
pub mod format;
pub mod models;
pub mod polyline;
pub mod query;
pub mod reports;
pub mod routing;
pub mod schedule;
pub mod spatial;

pub use error::ReportError;
pub use format::{fixed_offset, format_row, format_value, FormattedRow, Locale, PLACEHOLDER};
pub use models::{
    Device, DeviceId, DeviceStatus, DispatchMode, FieldValue, FilterState, GroupId, LatLng,
    ReportRow, Scalar, ScheduleRequest,
};
pub use query::{build_query, Query};
pub use reports::{
    Column, ColumnFormat, FieldKind, FilterField, GroupPolicy, ReportDescriptor, ReportKind,
};
pub use routing::{
    enrich_route, estimate_fuel, BoundingBox, FuelEstimate, PlannedRoute, RawRoute,
    RouteAlternative, RouteType,
};
pub use schedule::{to_schedule_request, ScheduleBase};
pub use spatial::haversine_distance;
