use std::time::Duration;

use framemux_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use tracing::Dispatch;

use crate::error::ConfigError;

/// Default read timeout: how often an idle read loop checks for shutdown.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Read timeout applied to the transport. Bounds how long `recv` takes
    /// to notice a shutdown while idle. Must be non-zero.
    pub timeout: Duration,
    /// Maximum encoded frame size accepted and produced.
    pub max_payload_size: usize,
    /// Log sink. Installed as the scoped default dispatcher while the
    /// connection sends, receives, and shuts down.
    pub dispatch: Option<Dispatch>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            dispatch: Some(tracing::dispatcher::get_default(|d| d.clone())),
        }
    }
}

impl Config {
    /// Override the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the maximum encoded frame size.
    pub fn with_max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    /// Route this connection's logs to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Reject configurations a connection cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.dispatch.is_none() {
            return Err(ConfigError::InvalidLogSink);
        }
        if self.max_payload_size == 0 {
            return Err(ConfigError::InvalidMaxPayload);
        }
        Ok(())
    }

    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = Config::default().with_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn missing_log_sink_rejected() {
        let config = Config {
            dispatch: None,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidLogSink));
    }

    #[test]
    fn zero_payload_cap_rejected() {
        let config = Config::default().with_max_payload_size(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxPayload));
    }

    #[test]
    fn builders_override_fields() {
        let dispatch = Dispatch::new(tracing_subscriber::fmt().with_test_writer().finish());
        let config = Config::default()
            .with_timeout(Duration::from_millis(5))
            .with_max_payload_size(1024)
            .with_dispatch(dispatch);

        assert_eq!(config.timeout, Duration::from_millis(5));
        assert_eq!(config.frame_config().max_payload_size, 1024);
        assert!(config.dispatch.is_some());
    }
}
