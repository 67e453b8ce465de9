//! Error types. Every failure surface of the engine is at construction time:
//! once a calibrator and an estimator exist, observing frames cannot fail.

use std::path::PathBuf;
use thiserror::Error;

/// The calibration region is malformed or degenerate. Fatal at startup.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("calibration region needs exactly 4 points, got {0}")]
    WrongPointCount(usize),

    #[error("calibration point {0} has a non-finite coordinate")]
    NonFinite(usize),

    #[error("calibration points {0} and {1} coincide")]
    DuplicatePoints(usize, usize),

    #[error("calibration points {0}, {1} and {2} are collinear")]
    CollinearPoints(usize, usize, usize),

    #[error("perspective transform is singular for this region")]
    SingularHomography,

    #[error("cannot read calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed calibration data: {0}")]
    Malformed(String),
}

/// A session parameter is missing or out of range. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("speed window must hold at least one sample")]
    EmptySpeedWindow,

    #[error("cannot read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while setting up the speed-estimation engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Result type for speed_core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reject zero, negative, NaN and infinite values for a named parameter.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::NonPositive { name, value }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_positive_rejects_bad_values() {
        assert!(require_positive("fps", 30.0).is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = require_positive("fps", bad).unwrap_err();
            assert!(matches!(
                err,
                Error::Configuration(ConfigurationError::NonPositive { name: "fps", .. })
            ));
        }
    }

    #[test]
    fn messages_name_the_offending_points() {
        let err: Error = CalibrationError::CollinearPoints(0, 1, 3).into();
        assert_eq!(err.to_string(), "calibration points 0, 1 and 3 are collinear");
    }
}
