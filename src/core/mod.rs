//! Core library modules for butterfly-retime
//!
//! Leaves first: the oracle client and call logger, then the per-route
//! retimer, then the per-response aggregator.

pub mod aggregator;
pub mod anchor;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod oracle;
pub mod retimer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for internal use
pub use aggregator::ResponseAggregator;
pub use anchor::AnchorTime;
pub use config::ServiceConfig;
pub use logger::{CallLogger, LoggingState};
pub use oracle::ValhallaClient;
