//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for riskbench.
#[derive(Debug, thiserror::Error)]
pub enum RiskbenchError {
    #[error("bar and signal series differ in length: {bars} bars, {signals} signals")]
    SeriesMisaligned { bars: usize, signals: usize },

    #[error("bar/signal timestamp mismatch at index {index}: bar {bar_ts}, signal {signal_ts}")]
    TimestampMismatch {
        index: usize,
        bar_ts: NaiveDateTime,
        signal_ts: NaiveDateTime,
    },

    #[error("malformed bar at index {index}: {reason}")]
    MalformedBar { index: usize, reason: String },

    #[error("initial capital must be positive, got {capital}")]
    NonPositiveCapital { capital: f64 },

    #[error("insufficient data for {statistic}: have {samples} samples, need {minimum}")]
    InsufficientData {
        statistic: &'static str,
        samples: usize,
        minimum: usize,
    },

    #[error("unsupported scenario {scenario}: {reason}")]
    UnsupportedScenario { scenario: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RiskbenchError> for std::process::ExitCode {
    fn from(err: &RiskbenchError) -> Self {
        let code: u8 = match err {
            RiskbenchError::Io(_) => 1,
            RiskbenchError::ConfigParse { .. }
            | RiskbenchError::ConfigMissing { .. }
            | RiskbenchError::ConfigInvalid { .. } => 2,
            RiskbenchError::SeriesMisaligned { .. }
            | RiskbenchError::TimestampMismatch { .. }
            | RiskbenchError::MalformedBar { .. }
            | RiskbenchError::NonPositiveCapital { .. } => 3,
            RiskbenchError::InsufficientData { .. } => 4,
            RiskbenchError::UnsupportedScenario { .. } => 5,
            RiskbenchError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
