//! Range-query orchestration and metric discovery against a
//! [`MetricsBackend`](crate::backend::MetricsBackend).

pub mod discovery;
pub mod range;

pub use discovery::discover;
pub use range::{NamedQuery, RangeQueryOrchestrator, POD_MONITOR_QUERIES};
