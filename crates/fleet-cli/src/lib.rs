//! Helpers shared by the `fleet-report` binary.

pub mod input;
pub mod table;

pub use input::{parse_field, parse_instant, RangeEdge};
pub use table::render_table;
