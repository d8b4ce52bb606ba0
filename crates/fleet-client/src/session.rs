//! Per-screen report session.
//!
//! A session owns the loading flag, the current row set and the last error of
//! one report screen. Generate submissions flip the flag for as long as any of
//! them is in flight; the flag is released by a guard so it also clears when a
//! request fails, panics or is dropped half-way. Once the session is closed,
//! late completions are ignored.

use crate::dispatch::{dispatch, Outcome};
use crate::error::ClientError;
use crate::scheduler::Scheduler;
use crate::transport::Transport;
use fleet_core::{
    build_query, format_row, to_schedule_request, DispatchMode, FilterState, FormattedRow,
    Locale, ReportDescriptor, ReportError, ReportRow, ScheduleBase,
};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SessionState {
    in_flight: usize,
    rows: Vec<ReportRow>,
    last_error: Option<ClientError>,
    closed: bool,
}

pub struct ReportSession<T> {
    transport: T,
    descriptor: &'static ReportDescriptor,
    locale: Locale,
    state: Mutex<SessionState>,
}

struct LoadingGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a Mutex<SessionState>) -> Self {
        lock(state).in_flight += 1;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Transport> ReportSession<T> {
    pub fn new(transport: T, descriptor: &'static ReportDescriptor, locale: Locale) -> Self {
        Self {
            transport,
            descriptor,
            locale,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn descriptor(&self) -> &'static ReportDescriptor {
        self.descriptor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the query for `filter` and dispatch it.
    ///
    /// Generated rows replace the current row set; the last completion wins.
    /// Failures are recorded as the last error and returned.
    pub async fn submit(&self, filter: &FilterState, mode: DispatchMode) -> Result<Outcome, ClientError> {
        let query = build_query(filter, self.descriptor);
        let _loading = (mode == DispatchMode::Generate).then(|| LoadingGuard::enter(&self.state));

        let result = dispatch(&self.transport, &query, mode, self.descriptor).await;

        let mut state = lock(&self.state);
        if state.closed {
            tracing::debug!(report = %self.descriptor.kind, "session closed, discarding result");
            return result;
        }
        match &result {
            Ok(Outcome::Rows(rows)) => {
                state.rows = rows.clone();
                state.last_error = None;
            }
            Ok(_) => state.last_error = None,
            Err(err) => {
                tracing::warn!(report = %self.descriptor.kind, ?mode, error = %err, "report request failed");
                state.last_error = Some(err.clone());
            }
        }
        result
    }

    /// Persist a schedule for `filter` through `scheduler`.
    pub async fn schedule<S: Scheduler>(
        &self,
        scheduler: &S,
        filter: &FilterState,
        base: ScheduleBase,
    ) -> Result<(), ClientError> {
        let request = to_schedule_request(
            &filter.device_ids,
            &filter.group_ids,
            self.descriptor,
            base,
            &filter.report_specific,
        );

        let outcome = match scheduler.schedule_report(&request).await {
            None => Ok(()),
            Some(message) => Err(ClientError::from(ReportError::SchedulePersistFailure(message))),
        };

        let mut state = lock(&self.state);
        if !state.closed {
            state.last_error = outcome.as_ref().err().cloned();
        }
        outcome
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).in_flight > 0
    }

    pub fn rows(&self) -> Vec<ReportRow> {
        lock(&self.state).rows.clone()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        lock(&self.state).last_error.clone()
    }

    /// Current rows rendered with the session locale.
    pub fn formatted_rows(&self) -> Vec<FormattedRow> {
        lock(&self.state)
            .rows
            .iter()
            .map(|row| format_row(row, self.descriptor, &self.locale))
            .collect()
    }

    pub fn close(&self) {
        lock(&self.state).closed = true;
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}
