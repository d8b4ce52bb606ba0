//! Response formatter: raw report values to display strings.

use crate::models::{plain_number, ReportRow};
use crate::reports::{ColumnFormat, ReportDescriptor};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Shown for null or missing values in every column.
pub const PLACEHOLDER: &str = "-";

/// Column key to display string, covering every declared column.
pub type FormattedRow = BTreeMap<String, String>;

/// Display conventions for numbers and dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub grouping_separator: String,
    pub decimal_separator: String,
    /// chrono pattern for date columns
    pub date_pattern: String,
    /// chrono pattern for date-time columns
    pub datetime_pattern: String,
    pub utc_offset_minutes: i32,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            grouping_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            date_pattern: "%Y-%m-%d".to_string(),
            datetime_pattern: "%Y-%m-%d %H:%M:%S".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

impl Locale {
    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Display offset; anything a day or more from UTC reads as UTC.
    fn offset(&self) -> FixedOffset {
        fixed_offset(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }

    /// Group the integer part and apply the decimal separator.
    fn localize(&self, fixed: &str) -> String {
        let (sign, digits) = match fixed.strip_prefix('-') {
            Some(rest) if rest.chars().any(|ch| ch.is_ascii_digit() && ch != '0') => ("-", rest),
            Some(rest) => ("", rest),
            None => ("", fixed),
        };
        let (integer, fraction) = match digits.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (digits, None),
        };

        let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
        for (i, ch) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                grouped.push_str(&self.grouping_separator);
            }
            grouped.push(ch);
        }

        let mut out = String::from(sign);
        out.push_str(&grouped);
        if let Some(fraction) = fraction {
            out.push_str(&self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }
}

/// Offset `minutes` east of UTC, or `None` unless it is strictly within a day.
pub fn fixed_offset(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

/// Format one cell of a row.
pub fn format_value(
    row: &ReportRow,
    column_key: &str,
    descriptor: &ReportDescriptor,
    locale: &Locale,
) -> String {
    let value = match row.get(column_key) {
        None | Some(Value::Null) => return PLACEHOLDER.to_string(),
        Some(value) => value,
    };

    let format = descriptor
        .column(column_key)
        .map(|column| column.format)
        .unwrap_or(ColumnFormat::Text);

    match format {
        ColumnFormat::Text => passthrough(value),
        ColumnFormat::Count => match numeric(value) {
            Some(number) => locale.localize(&format!("{:.0}", round_half_away(number, 0))),
            None => passthrough(value),
        },
        ColumnFormat::Decimal { min, max } => match numeric(value) {
            Some(number) => locale.localize(&fixed_fraction(number, min, max)),
            None => passthrough(value),
        },
        ColumnFormat::Coordinate => match numeric(value) {
            Some(number) => format!("{:.5}", round_half_away(number, 5)),
            None => passthrough(value),
        },
        ColumnFormat::Date => format_timestamp(value, &locale.date_pattern, locale),
        ColumnFormat::DateTime => format_timestamp(value, &locale.datetime_pattern, locale),
    }
}

/// Format every declared column of a row; missing keys get the placeholder.
pub fn format_row(row: &ReportRow, descriptor: &ReportDescriptor, locale: &Locale) -> FormattedRow {
    descriptor
        .columns
        .iter()
        .map(|column| {
            (
                column.key.to_string(),
                format_value(row, column.key, descriptor, locale),
            )
        })
        .collect()
}

fn passthrough(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if !number.is_i64() && !number.is_u64() => plain_number(float),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Fixed-point text with at least `min` and at most `max` fraction digits.
fn fixed_fraction(value: f64, min: u8, max: u8) -> String {
    let max = max.max(min);
    let mut text = format!("{:.*}", max as usize, round_half_away(value, max));
    if let Some(dot) = text.find('.') {
        let keep = dot + 1 + min as usize;
        while text.len() > keep && text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    text
}

/// Round to `digits` fraction digits, ties away from zero.
fn round_half_away(value: f64, digits: u8) -> f64 {
    let factor = 10_f64.powi(i32::from(digits));
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn format_timestamp(value: &Value, pattern: &str, locale: &Locale) -> String {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
                return instant.with_timezone(&locale.offset()).format(pattern).to_string();
            }
            for naive_pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, naive_pattern) {
                    return naive.and_utc().with_timezone(&locale.offset()).format(pattern).to_string();
                }
            }
            // A bare calendar date has no instant to shift.
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map_or_else(
                    || text.to_string(),
                    |naive| naive.format(pattern).to_string(),
                );
            }
            text.to_string()
        }
        Value::Number(number) => number
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|instant| instant.with_timezone(&locale.offset()).format(pattern).to_string())
            .unwrap_or_else(|| passthrough(value)),
        other => passthrough(other),
    }
}
