//! Sequential re-timing of a single route
//!
//! Each hop's oracle query departs when the traveler actually reaches the hop
//! start, i.e. at the anchor plus the arrival recomputed for the previous hop.
//! The chain is therefore a left fold over step pairs and cannot be
//! parallelized.

use chrono::NaiveDateTime;
use futures::stream::{self, TryStreamExt};

use crate::core::anchor::AnchorTime;
use crate::core::error::{Error, Result};
use crate::core::model::{Route, Step};
use crate::core::oracle::DurationOracle;

/// Recomputed cumulative timing of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timing {
    duration: u64,
    arrival: u64,
}

/// Fold state carried from hop to hop
struct Chain {
    departure: NaiveDateTime,
    last: Timing,
    timings: Vec<Timing>,
}

/// Re-times routes one hop at a time against a duration oracle
pub struct RouteRetimer<O> {
    oracle: O,
}

impl<O: DurationOracle> RouteRetimer<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Recompute every step after the first and the route aggregates.
    ///
    /// The route is only written once the whole chain succeeded; on error it
    /// is left as it was.
    pub async fn retime(&self, route: &mut Route, anchor: AnchorTime) -> Result<()> {
        if route.steps.len() < 2 {
            if let Some(step) = route.steps.first() {
                route.duration = step.duration;
                route.cost = step.duration;
            }
            return Ok(());
        }

        let timings = self.fold_chain(&route.steps, anchor).await?;

        for (step, timing) in route.steps.iter_mut().skip(1).zip(timings) {
            step.set_timing(timing.duration, timing.arrival);
        }

        if let Some(last) = route.steps.last() {
            route.duration = last.duration;
            route.cost = last.duration;
        }

        Ok(())
    }

    async fn fold_chain(&self, steps: &[Step], anchor: AnchorTime) -> Result<Vec<Timing>> {
        let first = &steps[0];
        let start = Chain {
            departure: anchor.as_naive(),
            last: Timing {
                duration: first.duration,
                arrival: first.arrival,
            },
            timings: Vec::with_capacity(steps.len() - 1),
        };

        let hops = steps
            .windows(2)
            .map(|pair| Ok::<_, Error>((pair[0].location, pair[1].location)));
        let oracle = &self.oracle;

        let chain = stream::iter(hops)
            .try_fold(start, |mut chain, (origin, destination)| async move {
                let seconds = oracle
                    .get_duration(origin, destination, chain.departure)
                    .await?;

                let timing = Timing {
                    duration: chain.last.duration.saturating_add(seconds),
                    arrival: chain.last.arrival.saturating_add(seconds),
                };
                chain.departure = anchor.offset_by(timing.arrival);
                chain.last = timing;
                chain.timings.push(timing);

                Ok::<_, Error>(chain)
            })
            .await?;

        Ok(chain.timings)
    }
}
