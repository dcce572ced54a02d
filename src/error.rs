use std::time::Duration;
use thiserror::Error;

/// Why a single probe produced no signal.
///
/// None of these abort a scan. Detection and enumeration log them and treat
/// the probe as negative.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("probe of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("could not parse response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl ProbeError {
    pub fn transport(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ProbeError::Transport {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ProbeError::Parse {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;
