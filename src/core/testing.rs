//! Stub oracle shared by the unit tests

use chrono::NaiveDateTime;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::error::Result;
use crate::core::model::{Location, Route, Step};
use crate::core::oracle::DurationOracle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Call {
    pub origin: Location,
    pub destination: Location,
    pub departure: NaiveDateTime,
}

/// Oracle answering from a closure and recording every query in order
pub(crate) struct StubOracle<F> {
    responder: F,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl<F> StubOracle<F>
where
    F: Fn(&Call) -> Result<u64> + Send + Sync,
{
    pub fn new(responder: F) -> Self {
        Self {
            responder,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long (on the tokio clock) before answering each query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl<F> DurationOracle for StubOracle<F>
where
    F: Fn(&Call) -> Result<u64> + Send + Sync,
{
    async fn get_duration(
        &self,
        origin: Location,
        destination: Location,
        departure: NaiveDateTime,
    ) -> Result<u64> {
        let call = Call {
            origin,
            destination,
            departure,
        };
        self.calls.lock().unwrap().push(call);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&call)
    }
}

pub(crate) fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Route through `n` points along the equator, all timings zero
pub(crate) fn straight_route(n: usize) -> Route {
    let steps = (0..n)
        .map(|i| Step::new(Location::new(i as f64 * 0.01, 0.0), 0, 0))
        .collect();
    Route::new(steps)
}
