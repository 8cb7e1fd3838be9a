//! Planner response data model
//!
//! Only the fields the re-timing pipeline reads or writes are typed. Everything
//! else the planner sends is captured in `extra` and serialized back unchanged.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Geographic position, encoded on the wire as `[longitude, latitude]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Location {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.lon, location.lat]
    }
}

/// One waypoint of a route
///
/// Timings are whole seconds. Fractional planner values are rounded for
/// arithmetic, but a step the pipeline never rewrites is serialized with the
/// exact number the planner sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireStep", into = "WireStep")]
pub struct Step {
    pub location: Location,

    /// Cumulative seconds since the route start
    pub duration: u64,

    /// Cumulative seconds since the anchor departure time
    pub arrival: u64,

    pub extra: Map<String, Value>,

    /// Planner's `(duration, arrival)` as received
    received: Option<(Number, Number)>,
}

impl Step {
    pub fn new(location: Location, duration: u64, arrival: u64) -> Self {
        Self {
            location,
            duration,
            arrival,
            extra: Map::new(),
            received: None,
        }
    }

    /// Overwrite the timings with recomputed values
    pub fn set_timing(&mut self, duration: u64, arrival: u64) {
        self.duration = duration;
        self.arrival = arrival;
        self.received = None;
    }
}

#[derive(Serialize, Deserialize)]
struct WireStep {
    location: Location,
    duration: Number,
    arrival: Number,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<WireStep> for Step {
    type Error = String;

    fn try_from(wire: WireStep) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            location: wire.location,
            duration: number_to_seconds(&wire.duration)?,
            arrival: number_to_seconds(&wire.arrival)?,
            extra: wire.extra,
            received: Some((wire.duration, wire.arrival)),
        })
    }
}

impl From<Step> for WireStep {
    fn from(step: Step) -> Self {
        // Fields set directly after decoding no longer match what was received
        let (duration, arrival) = match step.received {
            Some((duration, arrival))
                if number_to_seconds(&duration) == Ok(step.duration)
                    && number_to_seconds(&arrival) == Ok(step.arrival) =>
            {
                (duration, arrival)
            }
            _ => (Number::from(step.duration), Number::from(step.arrival)),
        };

        Self {
            location: step.location,
            duration,
            arrival,
            extra: step.extra,
        }
    }
}

/// One alternative route proposed by the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<Step>,

    #[serde(default, deserialize_with = "de_seconds")]
    pub duration: u64,

    /// Always equal to `duration` once re-timed
    #[serde(default, deserialize_with = "de_seconds")]
    pub cost: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Route {
    pub fn new(steps: Vec<Step>) -> Self {
        let duration = steps.last().map(|s| s.duration).unwrap_or(0);
        Self {
            steps,
            duration,
            cost: duration,
            extra: Map::new(),
        }
    }
}

/// Response-level aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "de_seconds")]
    pub duration: u64,

    #[serde(default, deserialize_with = "de_seconds")]
    pub cost: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full planner response as forwarded by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerResponse {
    pub routes: Vec<Route>,
    pub summary: Summary,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlannerResponse {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            summary: Summary::default(),
            extra: Map::new(),
        }
    }
}

/// Accepts integral or fractional JSON numbers, rounding to whole seconds
fn de_seconds<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = f64::deserialize(deserializer)?;
    round_seconds(seconds).map_err(D::Error::custom)
}

fn number_to_seconds(number: &Number) -> std::result::Result<u64, String> {
    match number.as_u64() {
        Some(seconds) => Ok(seconds),
        None => round_seconds(number.as_f64().unwrap_or(f64::NAN)),
    }
}

fn round_seconds(seconds: f64) -> std::result::Result<u64, String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!(
            "expected a non-negative number of seconds, got {seconds}"
        ));
    }
    Ok(seconds.round() as u64)
}
