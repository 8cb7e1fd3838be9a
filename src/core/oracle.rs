//! Time-dependent duration oracle client
//!
//! Asks a Valhalla `/route` endpoint how long a single hop takes when
//! departing at a given instant. Departure times are sent with minute
//! resolution, so the oracle never sees anything finer than a minute.

use chrono::NaiveDateTime;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{Error, Result};
use crate::core::logger::CallLogger;
use crate::core::model::Location;

/// Valhalla `date_time.type` for "depart at"
const DEPART_AT: u8 = 1;

/// Minute-resolution timestamp format understood by the oracle
const DEPARTURE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Source of time-dependent hop durations
pub trait DurationOracle: Send + Sync {
    /// Seconds needed to travel from `origin` to `destination` departing at
    /// `departure`
    fn get_duration(
        &self,
        origin: Location,
        destination: Location,
        departure: NaiveDateTime,
    ) -> impl Future<Output = Result<u64>> + Send;
}

impl<T: DurationOracle> DurationOracle for Arc<T> {
    fn get_duration(
        &self,
        origin: Location,
        destination: Location,
        departure: NaiveDateTime,
    ) -> impl Future<Output = Result<u64>> + Send {
        (**self).get_duration(origin, destination, departure)
    }
}

/// Configuration for the Valhalla oracle
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Base URL of the Valhalla service, without the `/route` suffix
    pub base_url: String,

    /// Valhalla costing profile
    pub costing: String,

    /// Distance units requested in directions
    pub units: String,

    /// Upper bound for one oracle call, connection included
    pub timeout: Duration,

    pub connect_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            costing: "auto".to_string(),
            units: "kilometers".to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Build the Valhalla route request for one hop
pub fn build_query(
    config: &OracleConfig,
    origin: Location,
    destination: Location,
    departure: NaiveDateTime,
) -> Value {
    json!({
        "locations": [
            {"lat": origin.lat, "lon": origin.lon},
            {"lat": destination.lat, "lon": destination.lon}
        ],
        "costing": config.costing,
        "directions_options": {"units": config.units},
        "date_time": {
            "type": DEPART_AT,
            "value": departure.format(DEPARTURE_FORMAT).to_string()
        }
    })
}

/// Extract `trip.summary.time` as whole seconds (fractions truncated)
pub fn parse_duration(body: &Value) -> Result<u64> {
    if let Some(err) = body.get("error") {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(Error::DurationUnavailable(format!("oracle error: {msg}")));
    }

    let time = body
        .pointer("/trip/summary/time")
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            Error::DurationUnavailable("response has no trip.summary.time".to_string())
        })?;

    if !time.is_finite() || time < 0.0 {
        return Err(Error::DurationUnavailable(format!(
            "invalid trip duration: {time}"
        )));
    }

    Ok(time.trunc() as u64)
}

/// HTTP client for a Valhalla instance
pub struct ValhallaClient {
    client: Client,
    config: OracleConfig,
    logger: Arc<CallLogger>,
}

impl ValhallaClient {
    pub fn new(config: OracleConfig, logger: Arc<CallLogger>) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(format!("butterfly-retime/{}", env!("BUTTERFLY_VERSION")))
            .build()
            .map_err(|e| Error::DurationUnavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            logger,
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn route_url(&self) -> String {
        format!("{}/route", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, query: &Value) -> Result<(StatusCode, Value)> {
        let response = self.client.post(self.route_url()).json(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = serde_json::from_str(&text).map_err(|e| {
            Error::DurationUnavailable(format!("oracle returned non-JSON body ({status}): {e}"))
        })?;
        Ok((status, body))
    }
}

impl DurationOracle for ValhallaClient {
    async fn get_duration(
        &self,
        origin: Location,
        destination: Location,
        departure: NaiveDateTime,
    ) -> Result<u64> {
        let query = build_query(&self.config, origin, destination, departure);
        log::debug!(
            "Oracle query ({}, {}) -> ({}, {}) departing {}",
            origin.lat,
            origin.lon,
            destination.lat,
            destination.lon,
            departure.format(DEPARTURE_FORMAT)
        );

        let outcome = self.send(&query).await;

        if self.logger.is_enabled() {
            let logged = match &outcome {
                Ok((_, body)) => body.clone(),
                Err(e) => json!({ "error": e.to_string() }),
            };
            self.logger.record(query, logged);
        }

        let (status, body) = outcome?;

        // Valhalla reports failures as JSON with an `error` field; prefer that message
        if !status.is_success() && body.get("error").is_none() {
            return Err(Error::DurationUnavailable(format!(
                "oracle returned {status}"
            )));
        }

        parse_duration(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departure(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_build_query_shape() {
        let query = build_query(
            &OracleConfig::default(),
            Location::new(4.3517, 50.8503),
            Location::new(4.4025, 51.2194),
            departure("2024-03-14 12:00:00"),
        );

        assert_eq!(
            query,
            json!({
                "locations": [
                    {"lat": 50.8503, "lon": 4.3517},
                    {"lat": 51.2194, "lon": 4.4025}
                ],
                "costing": "auto",
                "directions_options": {"units": "kilometers"},
                "date_time": {"type": 1, "value": "2024-03-14T12:00"}
            })
        );
    }

    #[test]
    fn test_departure_truncated_to_minute() {
        let query = build_query(
            &OracleConfig::default(),
            Location::new(0.0, 0.0),
            Location::new(1.0, 1.0),
            departure("2024-03-14 12:34:59.999"),
        );
        assert_eq!(query["date_time"]["value"], "2024-03-14T12:34");
    }

    #[test]
    fn test_parse_duration() {
        let body = json!({"trip": {"summary": {"time": 600, "length": 12.3}}});
        assert_eq!(parse_duration(&body).unwrap(), 600);

        let body = json!({"trip": {"summary": {"time": 599.9}}});
        assert_eq!(parse_duration(&body).unwrap(), 599);
    }

    #[test]
    fn test_parse_duration_failures() {
        let cases = [
            json!({"error": "No path could be found for input", "error_code": 442}),
            json!({"trip": {"status": 0}}),
            json!({"trip": {"summary": {"time": "soon"}}}),
            json!({"trip": {"summary": {"time": -3}}}),
            json!({}),
        ];
        for body in cases {
            assert!(
                matches!(parse_duration(&body), Err(Error::DurationUnavailable(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_oracle_error_message_is_kept() {
        let body = json!({"error": "No path could be found for input"});
        let err = parse_duration(&body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Duration unavailable: oracle error: No path could be found for input"
        );
    }

    #[test]
    fn test_route_url_strips_trailing_slash() {
        let client = ValhallaClient::new(
            OracleConfig {
                base_url: "http://valhalla:8002/".to_string(),
                ..Default::default()
            },
            Arc::new(CallLogger::default()),
        )
        .unwrap();
        assert_eq!(client.route_url(), "http://valhalla:8002/route");
    }
}
