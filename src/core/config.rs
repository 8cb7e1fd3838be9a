//! Service configuration
//!
//! Defaults match a local deployment: planner on 3333, Valhalla on 8002, the
//! gateway itself on 3334.

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::aggregator::ResponseAggregator;
use crate::core::error::Result;
use crate::core::logger::{CallLogger, DEFAULT_LOG_DIR};
use crate::core::oracle::{OracleConfig, ValhallaClient};

/// Configuration for the gateway and the pipeline behind it
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upstream route planner receiving forwarded requests
    pub planner_url: String,

    /// Address the gateway listens on
    pub bind_addr: String,

    /// Directory for oracle call records
    pub log_dir: PathBuf,

    /// Whether call logging starts enabled
    pub enable_logging: bool,

    pub oracle: OracleConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            planner_url: "http://localhost:3333".to_string(),
            bind_addr: "0.0.0.0:3334".to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            enable_logging: false,
            oracle: OracleConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Build the shared call logger and the aggregator wired to it
    pub fn build_pipeline(&self) -> Result<(Arc<CallLogger>, ResponseAggregator<ValhallaClient>)> {
        let logger = Arc::new(CallLogger::new(&self.log_dir, self.enable_logging)?);
        let client = ValhallaClient::new(self.oracle.clone(), Arc::clone(&logger))?;
        Ok((logger, ResponseAggregator::new(client)))
    }
}
