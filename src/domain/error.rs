//! Domain error types.

/// Top-level error type for pitback.
///
/// Only configuration problems are fatal to a run. Per-instrument data gaps
/// surface as [`PitbackError::DataUnavailable`] at the port boundary and are
/// turned into skip records by the screener and engine.
#[derive(Debug, thiserror::Error)]
pub enum PitbackError {
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

    #[error("data unavailable for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("no period produced results ({periods} periods run)")]
    NoResults { periods: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PitbackError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PitbackError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        PitbackError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            PitbackError::ConfigParse { .. }
                | PitbackError::ConfigMissing { .. }
                | PitbackError::ConfigInvalid { .. }
        )
    }
}

impl From<&PitbackError> for std::process::ExitCode {
    fn from(err: &PitbackError) -> Self {
        let code: u8 = match err {
            PitbackError::Io(_) => 1,
            PitbackError::ConfigParse { .. }
            | PitbackError::ConfigMissing { .. }
            | PitbackError::ConfigInvalid { .. } => 2,
            PitbackError::DataUnavailable { .. } => 5,
            PitbackError::NoResults { .. } => 6,
            PitbackError::Csv(_) => 7,
        };
        std::process::ExitCode::from(code)
    }
}
