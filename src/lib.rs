//! # Butterfly-retime Library
//!
//! Post-processes route planner responses so that travel durations reflect
//! conditions at the actual time of travel. Every route is walked hop by hop,
//! asking a Valhalla instance how long each hop takes when departing at the
//! moment the traveler actually reaches it.
//!
//! ## Features
//!
//! - **Time-dependent chains**: each hop departs at the recomputed arrival of
//!   the previous one
//! - **Concurrent routes**: alternatives are re-timed side by side and joined
//!   once; the first failure cancels the rest
//! - **Pass-through**: planner fields the pipeline does not touch come back
//!   unchanged
//! - **Call logging**: optional per-call JSON records, togglable at runtime
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let planner_response = serde_json::json!({
//!         "routes": [{"steps": [
//!             {"location": [4.3517, 50.8503], "duration": 0, "arrival": 0},
//!             {"location": [4.4025, 51.2194], "duration": 1800, "arrival": 1800}
//!         ]}],
//!         "summary": {"duration": 1800, "cost": 1800}
//!     });
//!
//!     let retimed = butterfly_retime::retime(
//!         planner_response,
//!         "http://localhost:8002",
//!         Some("2024-03-14T08:00:00"),
//!     )
//!     .await?;
//!     println!("{retimed}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Oracles
//!
//! ```rust,no_run
//! use butterfly_retime::{AnchorTime, DurationOracle, Location, ResponseAggregator, Result};
//! use chrono::NaiveDateTime;
//!
//! struct FixedOracle;
//!
//! impl DurationOracle for FixedOracle {
//!     async fn get_duration(&self, _: Location, _: Location, _: NaiveDateTime) -> Result<u64> {
//!         Ok(600)
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let aggregator = ResponseAggregator::new(FixedOracle);
//! # let body = serde_json::json!({"routes": [], "summary": {}});
//! let retimed = aggregator.process_json(body, Some("2024-03-14T08:00")).await?;
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::sync::Arc;

// Re-export core types that users might need
pub use crate::core::aggregator::ResponseAggregator;
pub use crate::core::anchor::AnchorTime;
pub use crate::core::config::ServiceConfig;
pub use crate::core::error::{Error, Result};
pub use crate::core::logger::{CallLogger, LoggingState, DEFAULT_LOG_DIR};
pub use crate::core::model::{Location, PlannerResponse, Route, Step, Summary};
pub use crate::core::oracle::{
    build_query, parse_duration, DurationOracle, OracleConfig, ValhallaClient,
};
pub use crate::core::retimer::RouteRetimer;

// Internal modules
mod core;

pub mod server;

/// Re-time a planner response against a Valhalla instance with default
/// settings and logging disabled
///
/// # Arguments
/// * `planner_response` - Raw planner JSON (routes + summary)
/// * `oracle_url` - Base URL of the Valhalla service
/// * `base_time` - Optional ISO-8601 anchor, defaults to now
pub async fn retime(
    planner_response: Value,
    oracle_url: &str,
    base_time: Option<&str>,
) -> Result<Value> {
    let config = OracleConfig {
        base_url: oracle_url.to_string(),
        ..Default::default()
    };
    let client = ValhallaClient::new(config, Arc::new(CallLogger::default()))?;

    ResponseAggregator::new(client)
        .process_json(planner_response, base_time)
        .await
}
