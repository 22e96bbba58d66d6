pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parse;
pub mod query;

pub use error::{PodMonitorError, Result};
