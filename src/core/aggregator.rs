//! Concurrent re-timing of every route in a planner response
//!
//! Routes are independent, so their step chains run concurrently and are
//! joined at a single point. The first failing chain short-circuits the join:
//! the other chains' futures are dropped, which cancels their in-flight oracle
//! requests, and no response is produced.

use futures::future::try_join_all;
use serde_json::Value;

use crate::core::anchor::AnchorTime;
use crate::core::error::{Error, Result};
use crate::core::model::PlannerResponse;
use crate::core::oracle::DurationOracle;
use crate::core::retimer::RouteRetimer;

/// Applies the route retimer to whole planner responses
pub struct ResponseAggregator<O> {
    retimer: RouteRetimer<O>,
}

impl<O: DurationOracle> ResponseAggregator<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            retimer: RouteRetimer::new(oracle),
        }
    }

    pub fn retimer(&self) -> &RouteRetimer<O> {
        &self.retimer
    }

    /// Re-time all routes against one shared anchor and rebuild the summary.
    ///
    /// The summary becomes the sum of all route durations, alternatives
    /// included. With no routes the summary is left alone.
    pub async fn process(
        &self,
        response: &mut PlannerResponse,
        anchor: Option<AnchorTime>,
    ) -> Result<()> {
        let anchor = anchor.unwrap_or_else(AnchorTime::now);
        log::debug!(
            "Retiming {} route(s) departing {anchor}",
            response.routes.len()
        );

        let retimer = &self.retimer;
        let chains = response
            .routes
            .iter_mut()
            .enumerate()
            .map(|(index, route)| async move {
                retimer.retime(route, anchor).await.map_err(|e| {
                    log::warn!("Route {index} aborted: {e}");
                    Error::RouteProcessingFailed {
                        route: index,
                        source: Box::new(e),
                    }
                })
            });
        try_join_all(chains).await?;

        if !response.routes.is_empty() {
            let total = response
                .routes
                .iter()
                .fold(0u64, |acc, route| acc.saturating_add(route.duration));
            response.summary.duration = total;
            response.summary.cost = total;
        }

        Ok(())
    }

    /// JSON entry point used by the CLI.
    ///
    /// The anchor is validated before anything else so a malformed value never
    /// reaches the oracle.
    pub async fn process_json(&self, body: Value, base_time: Option<&str>) -> Result<Value> {
        let anchor = base_time.map(AnchorTime::parse).transpose()?;
        self.process_value(body, anchor).await
    }

    /// Decode a planner response, re-time it, encode it back
    pub async fn process_value(&self, body: Value, anchor: Option<AnchorTime>) -> Result<Value> {
        let mut response: PlannerResponse =
            serde_json::from_value(body).map_err(|e| Error::InvalidResponse(e.to_string()))?;

        self.process(&mut response, anchor).await?;

        serde_json::to_value(&response).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}
