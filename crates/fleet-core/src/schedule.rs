//! Schedule adapter: package filter state into a persisted-schedule request.

use crate::models::{DeviceId, FieldValue, GroupId, Scalar, ScheduleRequest};
use crate::reports::{GroupPolicy, ReportDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values from the schedule form itself (description, calendar, extra attributes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBase {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub calendar_id: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Scalar>,
}

/// Build the schedule request for a report kind.
///
/// Declared filter fields refresh whatever the base carries under the same
/// key; any other report-specific key only fills a gap. Values go through
/// the same validity check as the query builder.
pub fn to_schedule_request(
    device_ids: &[DeviceId],
    group_ids: &[GroupId],
    descriptor: &ReportDescriptor,
    base: ScheduleBase,
    report_specific: &BTreeMap<String, FieldValue>,
) -> ScheduleRequest {
    let mut attributes = base.attributes;

    for (key, value) in report_specific {
        match descriptor.filter_field(key) {
            Some(field) => match field.accept(value) {
                Ok(value) => {
                    attributes.insert(key.clone(), value.into());
                }
                Err(reason) => {
                    tracing::debug!(report = %descriptor.kind, field = %key, %reason, "schedule attribute skipped");
                }
            },
            None => {
                attributes
                    .entry(key.clone())
                    .or_insert_with(|| value.clone().into());
            }
        }
    }

    let groups = descriptor.effective_groups(group_ids).to_vec();
    if descriptor.group_policy == GroupPolicy::FirstOnly {
        if let Some(first) = groups.first() {
            attributes.insert("groupId".to_string(), Scalar::Number(*first as f64));
        }
    }

    ScheduleRequest {
        device_ids: device_ids.to_vec(),
        group_ids: groups,
        report_type: descriptor.kind.as_str().to_string(),
        description: base.description,
        calendar_id: base.calendar_id,
        attributes,
    }
}
