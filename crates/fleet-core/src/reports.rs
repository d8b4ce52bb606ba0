//! Declarative descriptors for every report kind.
//!
//! A descriptor carries what differs between report screens: backend path,
//! group and date-range policy, filter fields and the column/formatter table.
//! The query builder, formatter and schedule adapter are generic over it.

use crate::models::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Insurance,
    Fuel,
    Maintenance,
    /// Driver behavior report.
    Behavior,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::Insurance,
        ReportKind::Fuel,
        ReportKind::Maintenance,
        ReportKind::Behavior,
    ];

    /// Canonical identifier, used in backend paths and as the schedule `type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insurance => "insurance",
            Self::Fuel => "fuel",
            Self::Maintenance => "maintenance",
            Self::Behavior => "behavior",
        }
    }

    pub fn descriptor(&self) -> &'static ReportDescriptor {
        match self {
            Self::Insurance => &INSURANCE,
            Self::Fuel => &FUEL,
            Self::Maintenance => &MAINTENANCE,
            Self::Behavior => &BEHAVIOR,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "insurance" => Ok(Self::Insurance),
            "fuel" => Ok(Self::Fuel),
            "maintenance" => Ok(Self::Maintenance),
            "behavior" | "behaviour" | "driver-behavior" | "driverbehavior" => Ok(Self::Behavior),
            other => Err(format!("unknown report kind: {other}")),
        }
    }
}

/// How many group ids the backend accepts for a report kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPolicy {
    Multiple,
    /// Backend takes a single group id; only the first selected group is sent.
    FirstOnly,
}

/// Validity rule for a report-specific filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Day or kilometer counter: finite and non-negative.
    Counter,
    /// Free text or identifier: non-empty after trimming.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    None,
    Number(f64),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    /// Suggested values for selection-style fields.
    pub choices: &'static [&'static str],
}

impl FilterField {
    /// Return the value when it passes the field's validity predicate.
    pub fn accept(&self, value: &FieldValue) -> Result<FieldValue, String> {
        match self.kind {
            FieldKind::Counter => match value.as_number() {
                Some(number) if number.is_finite() && number >= 0.0 => {
                    Ok(FieldValue::Number(number))
                }
                Some(number) => Err(format!("{number} is not a non-negative count")),
                None => Err(format!("`{value}` is not a number")),
            },
            FieldKind::Text => {
                let text = value.to_string();
                if text.trim().is_empty() {
                    Err("empty value".to_string())
                } else {
                    Ok(FieldValue::Text(text.trim().to_string()))
                }
            }
        }
    }
}

/// Display rule for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    Text,
    /// Integer with grouping separators.
    Count,
    /// Grouped number with a fraction-digit range.
    Decimal { min: u8, max: u8 },
    /// Fixed five decimals, no grouping.
    Coordinate,
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub format: ColumnFormat,
    pub visible: bool,
}

const fn col(key: &'static str, label: &'static str, format: ColumnFormat) -> Column {
    Column {
        key,
        label,
        format,
        visible: true,
    }
}

const fn hidden(key: &'static str, label: &'static str, format: ColumnFormat) -> Column {
    Column {
        key,
        label,
        format,
        visible: false,
    }
}

const TWO_DECIMALS: ColumnFormat = ColumnFormat::Decimal { min: 2, max: 2 };

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDescriptor {
    pub kind: ReportKind,
    pub title: &'static str,
    pub group_policy: GroupPolicy,
    pub ignore_date_range: bool,
    pub filter_fields: &'static [FilterField],
    pub columns: &'static [Column],
}

impl ReportDescriptor {
    /// Backend path for generate; export and mail append `/xlsx` and `/mail`.
    pub fn base_path(&self) -> String {
        format!("/api/reports/{}", self.kind.as_str())
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| column.visible)
    }

    pub fn filter_field(&self, key: &str) -> Option<&FilterField> {
        self.filter_fields.iter().find(|field| field.key == key)
    }

    /// Group ids the backend will receive for this kind.
    pub fn effective_groups<'a>(&self, group_ids: &'a [i64]) -> &'a [i64] {
        match self.group_policy {
            GroupPolicy::Multiple => group_ids,
            GroupPolicy::FirstOnly => &group_ids[..group_ids.len().min(1)],
        }
    }

    /// Initial filter values the screen starts with.
    pub fn default_filters(&self) -> BTreeMap<String, FieldValue> {
        self.filter_fields
            .iter()
            .filter_map(|field| {
                let value = match field.default {
                    FieldDefault::None => return None,
                    FieldDefault::Number(number) => FieldValue::Number(number),
                    FieldDefault::Text(text) => FieldValue::Text(text.to_string()),
                };
                Some((field.key.to_string(), value))
            })
            .collect()
    }
}

pub static INSURANCE: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::Insurance,
    title: "Insurance",
    group_policy: GroupPolicy::Multiple,
    ignore_date_range: true,
    filter_fields: &[FilterField {
        key: "expiryWithinDays",
        label: "Expires within (days)",
        kind: FieldKind::Counter,
        default: FieldDefault::Number(30.0),
        choices: &[],
    }],
    columns: &[
        col("deviceName", "Device Name", ColumnFormat::Text),
        col("groupName", "Group", ColumnFormat::Text),
        col("insuranceCompany", "Insurance Company", ColumnFormat::Text),
        col("insurancePolicyNumber", "Policy Number", ColumnFormat::Text),
        col("insuranceAmount", "Insurance Amount", TWO_DECIMALS),
        col("insuranceExpiryDate", "Expiry Date", ColumnFormat::Date),
        col("daysRemaining", "Days Remaining", ColumnFormat::Text),
    ],
};

pub static FUEL: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::Fuel,
    title: "Fuel",
    group_policy: GroupPolicy::Multiple,
    ignore_date_range: false,
    filter_fields: &[],
    columns: &[
        col("deviceName", "Device Name", ColumnFormat::Text),
        col("groupName", "Group", ColumnFormat::Text),
        col("totalMileage", "Distance (km)", TWO_DECIMALS),
        col("averageSpeed", "Avg Speed (km/h)", TWO_DECIMALS),
        col("totalFuelUsed", "Fuel Used (L)", TWO_DECIMALS),
        col("avgFuelPer100Km", "Avg Fuel (L/100km)", TWO_DECIMALS),
        col("fuelRefillEvents", "Refill Events", ColumnFormat::Count),
        col("fuelRefilled", "Fuel Refilled (L)", TWO_DECIMALS),
        col("fuelTheftEvents", "Theft Events", ColumnFormat::Count),
        col("fuelStolen", "Fuel Stolen (L)", TWO_DECIMALS),
    ],
};

pub static MAINTENANCE: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::Maintenance,
    title: "Maintenance",
    group_policy: GroupPolicy::Multiple,
    ignore_date_range: true,
    filter_fields: &[
        FilterField {
            key: "dueWithinKm",
            label: "Due within (km)",
            kind: FieldKind::Counter,
            default: FieldDefault::Number(1000.0),
            choices: &[],
        },
        FilterField {
            key: "status",
            label: "Status",
            kind: FieldKind::Text,
            default: FieldDefault::Text(""),
            choices: &["Pending", "Overdue"],
        },
    ],
    columns: &[
        col("deviceName", "Vehicle Name", ColumnFormat::Text),
        col("groupName", "Group", ColumnFormat::Text),
        col("maintenanceTask", "Maintenance Task", ColumnFormat::Text),
        col("scheduledMileage", "Scheduled Mileage", ColumnFormat::Decimal { min: 0, max: 1 }),
        col("currentMileage", "Current Mileage", ColumnFormat::Decimal { min: 0, max: 1 }),
        col("status", "Status", ColumnFormat::Text),
        col("mileageRemaining", "Mileage Remaining", ColumnFormat::Text),
    ],
};

pub static BEHAVIOR: ReportDescriptor = ReportDescriptor {
    kind: ReportKind::Behavior,
    title: "Driver Behavior",
    group_policy: GroupPolicy::FirstOnly,
    ignore_date_range: false,
    filter_fields: &[FilterField {
        key: "driverId",
        label: "Driver ID (Optional)",
        kind: FieldKind::Text,
        default: FieldDefault::None,
        choices: &[],
    }],
    columns: &[
        col("deviceName", "Device Name", ColumnFormat::Text),
        col("driverName", "Driver Name", ColumnFormat::Text),
        hidden("tripDate", "Trip Date", ColumnFormat::DateTime),
        col("harshAccelerationCount", "Harsh Accel", ColumnFormat::Count),
        col("harshBrakingCount", "Harsh Brake", ColumnFormat::Count),
        col("overspeedCount", "Overspeed", ColumnFormat::Count),
        col("sharpTurnCount", "Sharp Turn", ColumnFormat::Count),
        col("idleMinutes", "Idle (min)", ColumnFormat::Decimal { min: 0, max: 2 }),
        hidden("accCycleCount", "ACC Cycles", ColumnFormat::Count),
        col("lastEventType", "Last Event Type", ColumnFormat::Text),
        col("lastEventTime", "Last Event Time", ColumnFormat::DateTime),
        hidden("lastEventLatitude", "Last Event Lat", ColumnFormat::Coordinate),
        hidden("lastEventLongitude", "Last Event Lon", ColumnFormat::Coordinate),
        hidden("speedAtEvent", "Speed at Event", ColumnFormat::Decimal { min: 0, max: 2 }),
        hidden("speedLimit", "Speed Limit", ColumnFormat::Decimal { min: 0, max: 2 }),
        col("severity", "Severity", ColumnFormat::Text),
    ],
};
