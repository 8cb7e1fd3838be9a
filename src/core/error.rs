//! Error types for butterfly-retime
//!
//! Every failure is terminal for the unit of work it occurs in: an oracle
//! failure aborts its step chain, a failed chain aborts the whole response.

use std::fmt;

/// Main error type for butterfly-retime operations
#[derive(Debug)]
pub enum Error {
    /// The duration oracle could not produce a duration: transport failure,
    /// oracle-reported error, or a response without `trip.summary.time`
    DurationUnavailable(String),

    /// A route's step chain failed; `route` is the zero-based route index
    RouteProcessingFailed {
        route: usize,
        source: Box<Error>,
    },

    /// Caller-supplied anchor timestamp is not valid ISO-8601
    InvalidAnchorTime(String),

    /// Logging control value other than `enable` / `disable`
    InvalidLoggingState(String),

    /// Planner payload does not have the routes/steps/summary shape
    InvalidResponse(String),

    /// Upstream planner unreachable or answered with something unusable
    UpstreamError(String),

    /// File I/O error
    IoError(std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than a
    /// downstream failure
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidAnchorTime(_) | Error::InvalidLoggingState(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DurationUnavailable(msg) => {
                write!(f, "Duration unavailable: {msg}")
            }
            Error::RouteProcessingFailed { route, source } => {
                write!(f, "Processing route {route} failed: {source}")
            }
            Error::InvalidAnchorTime(value) => {
                write!(
                    f,
                    "Invalid base_time '{value}'. Use ISO format (e.g., 2024-03-14T12:00:00)"
                )
            }
            Error::InvalidLoggingState(value) => {
                write!(f, "Invalid state '{value}'. Use 'enable' or 'disable'")
            }
            Error::InvalidResponse(msg) => {
                write!(f, "Invalid planner response: {msg}")
            }
            Error::UpstreamError(msg) => {
                write!(f, "Error forwarding request: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::RouteProcessingFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::DurationUnavailable(format!("oracle request timed out: {err}"))
        } else {
            Error::DurationUnavailable(err.to_string())
        }
    }
}

/// Convenience result type for butterfly-retime operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_route_failure_exposes_source() {
        let err = Error::RouteProcessingFailed {
            route: 2,
            source: Box::new(Error::DurationUnavailable("no trip".to_string())),
        };

        assert_eq!(
            err.to_string(),
            "Processing route 2 failed: Duration unavailable: no trip"
        );
        let inner = err.source().expect("inner error");
        assert_eq!(inner.to_string(), "Duration unavailable: no trip");
    }

    #[test]
    fn test_caller_errors() {
        assert!(Error::InvalidAnchorTime("x".to_string()).is_caller_error());
        assert!(Error::InvalidLoggingState("on".to_string()).is_caller_error());
        assert!(!Error::DurationUnavailable("x".to_string()).is_caller_error());
        assert!(!Error::UpstreamError("x".to_string()).is_caller_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.source().is_some());
    }
}
