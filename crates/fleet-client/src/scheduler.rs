//! Persisted report schedules.

use crate::transport::Transport;
use fleet_core::ScheduleRequest;
use serde_json::json;
use std::future::Future;

/// Where the dashboard lists persisted schedules.
pub const SCHEDULE_LISTING_PATH: &str = "/reports/scheduled";

pub trait Scheduler: Send + Sync {
    /// Persist a schedule. `None` on success, otherwise the scheduler's message.
    fn schedule_report(&self, request: &ScheduleRequest) -> impl Future<Output = Option<String>> + Send;
}

/// Scheduler backed by the reports and permissions endpoints.
#[derive(Debug, Clone)]
pub struct HttpScheduler<T> {
    transport: T,
}

impl<T: Transport> HttpScheduler<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, String> {
        let response = self
            .transport
            .post_json(path, body)
            .await
            .map_err(|err| err.to_string())?;
        if !response.is_success() {
            return Err(response.text());
        }
        response.json().map_err(|err| err.to_string())
    }

    async fn persist(&self, request: &ScheduleRequest) -> Result<i64, String> {
        let body = serde_json::to_value(request).map_err(|err| err.to_string())?;
        let created = self.post("/api/reports", &body).await?;
        let report_id = created
            .get("id")
            .and_then(|id| id.as_i64())
            .ok_or_else(|| "scheduler did not return a report id".to_string())?;

        for device_id in &request.device_ids {
            self.post("/api/permissions", &json!({ "deviceId": device_id, "reportId": report_id }))
                .await?;
        }
        for group_id in &request.group_ids {
            self.post("/api/permissions", &json!({ "groupId": group_id, "reportId": report_id }))
                .await?;
        }
        Ok(report_id)
    }
}

impl<T: Transport> Scheduler for HttpScheduler<T> {
    async fn schedule_report(&self, request: &ScheduleRequest) -> Option<String> {
        match self.persist(request).await {
            Ok(report_id) => {
                tracing::info!(
                    report_id,
                    report = %request.report_type,
                    devices = request.device_ids.len(),
                    groups = request.group_ids.len(),
                    "schedule persisted"
                );
                None
            }
            Err(message) => {
                tracing::warn!(report = %request.report_type, %message, "schedule refused");
                Some(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::FakeTransport;
    use crate::transport::HttpResponse;
    use fleet_core::{to_schedule_request, ReportKind, ScheduleBase};
    use std::collections::BTreeMap;

    fn behavior_request() -> ScheduleRequest {
        to_schedule_request(
            &[7],
            &[3, 4],
            ReportKind::Behavior.descriptor(),
            ScheduleBase {
                description: "weekly".to_string(),
                ..ScheduleBase::default()
            },
            &BTreeMap::new(),
        )
    }

    #[tokio::test]
    async fn links_created_report_to_devices_and_groups() {
        let transport = FakeTransport::with(vec![
            Ok(HttpResponse::new(200, r#"{"id":42,"type":"behavior"}"#)),
            Ok(HttpResponse::new(204, "")),
            Ok(HttpResponse::new(204, "")),
        ]);
        let scheduler = HttpScheduler::new(transport);

        assert_eq!(scheduler.schedule_report(&behavior_request()).await, None);

        let requests = scheduler.transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/api/reports");
        let report = requests[0].body.as_ref().unwrap();
        assert_eq!(report["type"], "behavior");
        assert_eq!(report["description"], "weekly");
        assert_eq!(report["attributes"]["groupId"], json!(3.0));
        assert_eq!(requests[1].body, Some(json!({ "deviceId": 7, "reportId": 42 })));
        assert_eq!(requests[2].body, Some(json!({ "groupId": 3, "reportId": 42 })));
    }

    #[tokio::test]
    async fn refusal_is_returned_verbatim() {
        let transport = FakeTransport::with(vec![Ok(HttpResponse::new(400, "calendar not found"))]);
        let scheduler = HttpScheduler::new(transport);

        assert_eq!(
            scheduler.schedule_report(&behavior_request()).await,
            Some("calendar not found".to_string())
        );
        assert_eq!(scheduler.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_report_id_is_a_failure() {
        let transport = FakeTransport::with(vec![Ok(HttpResponse::new(200, "{}"))]);
        let scheduler = HttpScheduler::new(transport);

        assert!(scheduler.schedule_report(&behavior_request()).await.is_some());
    }
}
