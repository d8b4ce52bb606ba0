//! Query builder: filter state to backend query parameters.

use crate::models::FilterState;
use crate::reports::ReportDescriptor;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Ordered, multi-valued query parameters. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// All values recorded for `key`, in insertion order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into()));
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Build the backend query for a report kind.
///
/// Order: device ids, group ids, date range, then filter fields in the order
/// the descriptor declares them. Filter values that fail validation are
/// skipped, never sent empty.
pub fn build_query(filter: &FilterState, descriptor: &ReportDescriptor) -> Query {
    let mut query = Query::default();

    for device_id in &filter.device_ids {
        query.push("deviceId", device_id.to_string());
    }

    let groups = descriptor.effective_groups(&filter.group_ids);
    for group_id in groups {
        query.push("groupId", group_id.to_string());
    }
    if groups.len() < filter.group_ids.len() {
        tracing::debug!(
            report = %descriptor.kind,
            dropped = filter.group_ids.len() - groups.len(),
            "report accepts a single group, extra groups dropped"
        );
    }

    if !descriptor.ignore_date_range {
        if let Some(from) = filter.from {
            query.push("from", format_instant(from));
        }
        if let Some(to) = filter.to {
            query.push("to", format_instant(to));
        }
    }

    for field in descriptor.filter_fields {
        let Some(value) = filter.report_specific.get(field.key) else {
            continue;
        };
        match field.accept(value) {
            Ok(value) => query.push(field.key, value.to_string()),
            Err(reason) => {
                tracing::debug!(report = %descriptor.kind, field = field.key, %reason, "filter value skipped");
            }
        }
    }

    query
}

/// RFC 3339 in UTC with a `Z` suffix, the form the backend parses.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
