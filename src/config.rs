use crate::error::{ConsultationError, Result};
use chrono::Duration;

pub const DEFAULT_ACCEPTANCE_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_COMPLAINT_LEN: usize = 2000;
pub const DEFAULT_MAX_REASON_LEN: usize = 500;
/// Longest acceptance window the engine accepts: one day.
pub const MAX_ACCEPTANCE_TIMEOUT_SECS: i64 = 86_400;

/// Tunables for [`crate::application::engine::ConsultationEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window a practitioner has to answer; fixed onto each request at creation.
    pub acceptance_timeout: Duration,
    /// Period of the background deadline sweep.
    pub sweep_interval: std::time::Duration,
    pub max_complaint_len: usize,
    pub max_reason_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            acceptance_timeout: Duration::seconds(DEFAULT_ACCEPTANCE_TIMEOUT_SECS),
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_complaint_len: DEFAULT_MAX_COMPLAINT_LEN,
            max_reason_len: DEFAULT_MAX_REASON_LEN,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.acceptance_timeout <= Duration::zero() {
            return Err(ConsultationError::ValidationError(
                "Acceptance timeout must be positive".to_string(),
            ));
        }
        if self.acceptance_timeout > Duration::seconds(MAX_ACCEPTANCE_TIMEOUT_SECS) {
            return Err(ConsultationError::ValidationError(format!(
                "Acceptance timeout must not exceed {MAX_ACCEPTANCE_TIMEOUT_SECS} seconds"
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConsultationError::ValidationError(
                "Sweep interval must be positive".to_string(),
            ));
        }
        if self.max_complaint_len == 0 || self.max_reason_len == 0 {
            return Err(ConsultationError::ValidationError(
                "Text limits must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acceptance_timeout, Duration::seconds(60));
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let config = EngineConfig {
            acceptance_timeout: Duration::zero(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConsultationError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_timeout_beyond_one_day() {
        let at_limit = EngineConfig {
            acceptance_timeout: Duration::seconds(MAX_ACCEPTANCE_TIMEOUT_SECS),
            ..EngineConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        let huge = EngineConfig {
            acceptance_timeout: Duration::seconds(10_000_000_000_000),
            ..EngineConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConsultationError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_sweep_interval() {
        let config = EngineConfig {
            sweep_interval: std::time::Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
