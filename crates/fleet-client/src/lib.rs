//! Fleet Client - async side of the reporting screens.
//!
//! Dispatches report queries, persists schedules, reads the device directory
//! and plans route alternatives. All network access goes through the
//! [`Transport`] trait so every flow can run against a test double.

pub mod config;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod route_planner;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use devices::fetch_devices;
pub use dispatch::{dispatch, Outcome};
pub use error::{ClientError, ConfigError, PlanError};
pub use route_planner::{PlannerState, RoutePlanner};
pub use scheduler::{HttpScheduler, Scheduler, SCHEDULE_LISTING_PATH};
pub use session::ReportSession;
pub use transport::{Accept, HttpResponse, HttpTransport, Transport, TransportError};
