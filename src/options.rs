use std::time::Duration;

use serde::Deserialize;

use crate::{FailoverError, Result};

/// Configures per-service retries, the pause between them and the per-attempt
/// timeout.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct FailoverOptions {
    /// Attempts made against each service before moving to the next one.
    pub max_retries: usize,
    /// Fixed pause between two attempts on the same service, in milliseconds.
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

impl FailoverOptions {
    /// Rejects option values the failover loop cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(FailoverError::Config(
                "max_retries must be at least 1".to_owned(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(FailoverError::Config(
                "timeout_ms must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for FailoverOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 500,
            timeout_ms: 3_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FailoverOptions;
    use crate::FailoverError;

    #[test]
    fn defaults_are_valid() {
        let opts = FailoverOptions::default();
        assert_eq!(opts.max_retries, 5);
        assert_eq!(opts.retry_delay_ms, 500);
        assert_eq!(opts.timeout_ms, 3_000);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn zero_retries_rejected() {
        let opts = FailoverOptions {
            max_retries: 0,
            ..FailoverOptions::default()
        };
        assert!(matches!(opts.validate(), Err(FailoverError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let opts = FailoverOptions {
            timeout_ms: 0,
            ..FailoverOptions::default()
        };
        assert!(matches!(opts.validate(), Err(FailoverError::Config(_))));
    }

    #[test]
    fn zero_delay_allowed() {
        let opts = FailoverOptions {
            retry_delay_ms: 0,
            ..FailoverOptions::default()
        };
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_config() {
        let opts: FailoverOptions =
            serde_json::from_str(r#"{"max_retries": 2}"#).expect("options must parse");
        assert_eq!(opts.max_retries, 2);
        assert_eq!(opts.retry_delay_ms, 500);
        assert_eq!(opts.timeout_ms, 3_000);
    }
}
