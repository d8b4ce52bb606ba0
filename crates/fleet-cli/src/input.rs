//! Command-line value parsing.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use fleet_core::{fixed_offset, FieldValue};

/// Which end of a date range a bare date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEdge {
    Start,
    End,
}

/// Parse `key=value`. Numeric values become numbers, everything else text.
pub fn parse_field(raw: &str) -> Result<(String, FieldValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("missing key in `{}`", raw);
    }
    let value = match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => FieldValue::Number(number),
        _ => FieldValue::Text(value.to_string()),
    };
    Ok((key.to_string(), value))
}

/// Parse an RFC 3339 instant or a bare `YYYY-MM-DD` date.
///
/// Bare dates are read in the given UTC offset: the start of the day for
/// [`RangeEdge::Start`], the last second of the day for [`RangeEdge::End`].
pub fn parse_instant(raw: &str, utc_offset_minutes: i32, edge: RangeEdge) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("`{}` is neither RFC 3339 nor YYYY-MM-DD", raw))?;
    let time = match edge {
        RangeEdge::Start => NaiveTime::MIN,
        RangeEdge::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    };
    let offset = fixed_offset(utc_offset_minutes)
        .ok_or_else(|| anyhow!("utc offset {} minutes is out of range", utc_offset_minutes))?;
    let local = offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| anyhow!("`{}` has no unique instant", raw))?;
    Ok(local.with_timezone(&Utc))
}
