//! Dispatch router: deliver a built query according to the requested mode.

use crate::error::ClientError;
use crate::transport::{Accept, Transport};
use fleet_core::{DispatchMode, Query, ReportDescriptor, ReportError, ReportRow};

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Generated report rows, in backend order.
    Rows(Vec<ReportRow>),
    /// Download location of the spreadsheet export.
    Redirected(String),
    /// The backend accepted the mail request.
    Sent,
}

pub async fn dispatch<T: Transport>(
    transport: &T,
    query: &Query,
    mode: DispatchMode,
    descriptor: &ReportDescriptor,
) -> Result<Outcome, ClientError> {
    let base_path = descriptor.base_path();
    tracing::debug!(report = %descriptor.kind, ?mode, params = query.len(), "dispatching report");

    match mode {
        DispatchMode::Generate => {
            let response = transport
                .get(&base_path, query.pairs(), Accept::Json)
                .await?
                .error_for_status()?;
            let rows: Option<Vec<ReportRow>> = response.json()?;
            let rows = rows.unwrap_or_default();
            tracing::info!(report = %descriptor.kind, rows = rows.len(), "report generated");
            Ok(Outcome::Rows(rows))
        }
        DispatchMode::Export => {
            let url = transport.url(&format!("{}/xlsx", base_path), query.pairs())?;
            Ok(Outcome::Redirected(url))
        }
        DispatchMode::Mail => {
            let response = transport
                .get(&format!("{}/mail", base_path), query.pairs(), Accept::Any)
                .await?;
            if !response.is_success() {
                return Err(ReportError::NetworkFailure {
                    status: response.status,
                    message: response.text(),
                }
                .into());
            }
            tracing::info!(report = %descriptor.kind, "report mailed");
            Ok(Outcome::Sent)
        }
    }
}
