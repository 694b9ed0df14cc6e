//! Service configuration
//!
//! Broker address list and topic come from the environment; everything else
//! is a fixed constant.

use std::time::Duration;
use thiserror::Error;

/// Port the HTTP listener binds to
pub const HTTP_PORT: u16 = 8080;

/// Default broker address when `KAFKA_BROKER` is unset
pub const DEFAULT_BROKER: &str = "localhost:9092";

/// Default topic when `KAFKA_TOPIC` is unset
pub const DEFAULT_TOPIC: &str = "health-events";

/// Upper bound on a single publish attempt
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Global ceiling on handling one request and writing its response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How long in-flight requests may run after shutdown starts
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("KAFKA_BROKER does not contain any broker address")]
    NoBrokers,
}

/// Runtime configuration for the writer service
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub brokers: Vec<String>,
    pub topic: String,
    pub port: u16,
    pub publish_timeout: Duration,
    /// Never shorter than `publish_timeout`
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// - `KAFKA_BROKER`: comma separated broker list (default: localhost:9092)
    /// - `KAFKA_TOPIC`: topic to publish to (default: health-events)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(
            std::env::var("KAFKA_BROKER").ok(),
            std::env::var("KAFKA_TOPIC").ok(),
        )
    }

    /// Build configuration from raw variable values
    ///
    /// Unset or blank values fall back to the defaults.
    pub fn from_vars(broker: Option<String>, topic: Option<String>) -> Result<Self, ConfigError> {
        let broker = non_blank(broker).unwrap_or_else(|| DEFAULT_BROKER.to_string());
        let brokers = parse_brokers(&broker)?;

        let topic = non_blank(topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        Ok(Self {
            brokers,
            topic: topic.trim().to_string(),
            port: HTTP_PORT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT.min(DEFAULT_REQUEST_TIMEOUT),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brokers: vec![DEFAULT_BROKER.to_string()],
            topic: DEFAULT_TOPIC.to_string(),
            port: HTTP_PORT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT.min(DEFAULT_REQUEST_TIMEOUT),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split a comma separated broker list, dropping empty entries
fn parse_brokers(raw: &str) -> Result<Vec<String>, ConfigError> {
    let brokers: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect();

    if brokers.is_empty() {
        return Err(ConfigError::NoBrokers);
    }
    Ok(brokers)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process global, so these go through from_vars to stay
    // safe under parallel test execution.

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_vars(None, None).unwrap();

        assert_eq!(config.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(config.topic, "health-events");
        assert_eq!(config.port, 8080);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_vars(Some("  ".to_string()), Some(String::new())).unwrap();

        assert_eq!(config.brokers, vec![DEFAULT_BROKER.to_string()]);
        assert_eq!(config.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_broker_list_is_split_and_trimmed() {
        let config = Config::from_vars(
            Some("kafka-0:9092, kafka-1:9092,,kafka-2:9092".to_string()),
            Some("events".to_string()),
        )
        .unwrap();

        assert_eq!(
            config.brokers,
            vec!["kafka-0:9092", "kafka-1:9092", "kafka-2:9092"]
        );
        assert_eq!(config.topic, "events");
    }

    #[test]
    fn test_broker_list_of_only_separators_is_rejected() {
        let err = Config::from_vars(Some(",, ,".to_string()), None).unwrap_err();
        assert_eq!(err, ConfigError::NoBrokers);
    }

    #[test]
    fn test_timeouts_are_bounded() {
        let config = Config::default();
        assert_eq!(config.publish_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.publish_timeout <= config.request_timeout);
        assert!(config.shutdown_grace >= config.publish_timeout);
    }
}
