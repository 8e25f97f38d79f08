use backoff::backoff::Constant;
use std::time::Duration;

use crate::config::ClientConfig;

/// Fixed-delay retry policy for the winners poll loop
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    delay: Duration,
    /// 0 keeps retrying until the server answers
    max_attempts: u32,
}

impl RetryStrategy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self { delay, max_attempts }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.loop_period, config.loop_amount)
    }

    pub fn create_backoff(&self) -> Constant {
        Constant::new(self.delay)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts > 0
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn should_retry(&self, attempts: u32) -> bool {
        !self.is_bounded() || attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Backoff;

    #[test]
    fn test_should_retry() {
        let strategy = RetryStrategy::new(Duration::from_millis(10), 3);
        assert!(strategy.should_retry(1));
        assert!(strategy.should_retry(2));
        assert!(!strategy.should_retry(3));
    }

    #[test]
    fn test_unbounded_strategy_always_retries() {
        let strategy = RetryStrategy::new(Duration::from_millis(10), 0);
        assert!(!strategy.is_bounded());
        assert!(strategy.should_retry(u32::MAX));
    }

    #[test]
    fn test_backoff_delay_is_constant() {
        let strategy = RetryStrategy::new(Duration::from_secs(5), 0);
        let mut backoff = strategy.create_backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_from_config_uses_loop_settings() {
        let mut config = ClientConfig::new("1", "server:12345");
        config.loop_amount = 4;
        config.loop_period = Duration::from_millis(250);
        let strategy = RetryStrategy::from_config(&config);
        assert_eq!(strategy.delay(), Duration::from_millis(250));
        assert!(!strategy.should_retry(4));
    }
}
