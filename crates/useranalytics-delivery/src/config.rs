// Analytics Configuration
//
// Configuration for event delivery, loaded from environment variables.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::destination::{DeliveryError, Destination};
use crate::webhook::WebhookDestination;

/// Configuration for analytics delivery
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Whether analytics delivery is enabled globally
    pub enabled: bool,

    /// Name of the cluster events originate from
    pub cluster_name: String,

    /// Instance id of this controller; differs across restarts by default
    pub controller_id: String,

    /// Webhook destination configuration
    pub webhook: Option<WebhookConfig>,
}

impl AnalyticsConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `ANALYTICS_ENABLED`: Enable/disable delivery (default: true)
    /// - `ANALYTICS_CLUSTER_NAME`: Originating cluster name (default: empty)
    /// - `ANALYTICS_CONTROLLER_ID`: Controller instance id (default: fresh UUID v7)
    /// - `ANALYTICS_WEBHOOK_*`: see [`WebhookConfig::from_env`]
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = var("ANALYTICS_ENABLED")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        let cluster_name = var("ANALYTICS_CLUSTER_NAME").unwrap_or_default();

        let controller_id = var("ANALYTICS_CONTROLLER_ID")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        Self {
            enabled,
            cluster_name,
            controller_id,
            webhook: WebhookConfig::from_vars(&var),
        }
    }

    /// Configuration with no destinations, for tests and embedding
    pub fn new(cluster_name: impl Into<String>, controller_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            cluster_name: cluster_name.into(),
            controller_id: controller_id.into(),
            webhook: None,
        }
    }

    /// Build the destinations this configuration describes
    pub fn destinations(&self) -> Result<Vec<Arc<dyn Destination>>, DeliveryError> {
        let mut destinations: Vec<Arc<dyn Destination>> = Vec::new();
        if let Some(webhook) = &self.webhook {
            destinations.push(Arc::new(WebhookDestination::new(webhook.clone())?));
        }
        Ok(destinations)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Webhook destination configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Destination name recorded on delivered events
    pub name: String,

    /// URL events are POSTed to
    pub url: String,

    /// Optional bearer token
    pub token: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl WebhookConfig {
    /// Create configuration from environment variables
    ///
    /// Returns None if `ANALYTICS_WEBHOOK_URL` is not set.
    ///
    /// - `ANALYTICS_WEBHOOK_URL`: endpoint URL
    /// - `ANALYTICS_WEBHOOK_NAME`: destination name (default: webhook)
    /// - `ANALYTICS_WEBHOOK_TOKEN`: bearer token
    /// - `ANALYTICS_WEBHOOK_TIMEOUT_MS`: request timeout (default: 10000)
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = var("ANALYTICS_WEBHOOK_URL").filter(|v| !v.is_empty())?;

        let name = var("ANALYTICS_WEBHOOK_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "webhook".to_string());

        let token = var("ANALYTICS_WEBHOOK_TOKEN").filter(|v| !v.is_empty());

        let timeout_ms = var("ANALYTICS_WEBHOOK_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);

        Some(Self {
            name,
            url,
            token,
            timeout_ms,
        })
    }

    /// Create configuration for `url` with defaults
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: None,
            timeout_ms: 10_000,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Authorization header value, if a token is configured
    pub fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AnalyticsConfig::from_vars(lookup(&[]));
        assert!(config.enabled);
        assert!(config.cluster_name.is_empty());
        assert!(config.webhook.is_none());

        let id = Uuid::parse_str(&config.controller_id).unwrap();
        assert_eq!(id.get_version_num(), 7);

        let other = AnalyticsConfig::from_vars(lookup(&[]));
        assert_ne!(other.controller_id, config.controller_id);
    }

    #[test]
    fn test_enabled_parsing() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("false", false),
            ("0", false),
            ("yes", false),
        ] {
            let config = AnalyticsConfig::from_vars(lookup(&[("ANALYTICS_ENABLED", value)]));
            assert_eq!(config.enabled, expected, "ANALYTICS_ENABLED={value}");
        }
    }

    #[test]
    fn test_explicit_origin() {
        let config = AnalyticsConfig::from_vars(lookup(&[
            ("ANALYTICS_CLUSTER_NAME", "us-east-1"),
            ("ANALYTICS_CONTROLLER_ID", "controller-7"),
        ]));
        assert_eq!(config.cluster_name, "us-east-1");
        assert_eq!(config.controller_id, "controller-7");

        let blank = AnalyticsConfig::from_vars(lookup(&[("ANALYTICS_CONTROLLER_ID", "")]));
        assert!(Uuid::parse_str(&blank.controller_id).is_ok());
    }

    #[test]
    fn test_webhook_requires_url() {
        assert!(WebhookConfig::from_vars(lookup(&[])).is_none());
        assert!(WebhookConfig::from_vars(lookup(&[("ANALYTICS_WEBHOOK_URL", "")])).is_none());
        assert!(WebhookConfig::from_vars(lookup(&[("ANALYTICS_WEBHOOK_TOKEN", "t")])).is_none());
    }

    #[test]
    fn test_webhook_from_vars() {
        let webhook = WebhookConfig::from_vars(lookup(&[
            ("ANALYTICS_WEBHOOK_URL", "https://example.com/track"),
            ("ANALYTICS_WEBHOOK_NAME", "woopra"),
            ("ANALYTICS_WEBHOOK_TOKEN", "secret"),
            ("ANALYTICS_WEBHOOK_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(webhook.name, "woopra");
        assert_eq!(webhook.url, "https://example.com/track");
        assert_eq!(webhook.auth_header().as_deref(), Some("Bearer secret"));
        assert_eq!(webhook.timeout(), Duration::from_millis(2500));

        let defaults = WebhookConfig::from_vars(lookup(&[
            ("ANALYTICS_WEBHOOK_URL", "https://example.com/track"),
            ("ANALYTICS_WEBHOOK_TOKEN", ""),
            ("ANALYTICS_WEBHOOK_TIMEOUT_MS", "soon"),
        ]))
        .unwrap();
        assert_eq!(defaults.name, "webhook");
        assert!(defaults.token.is_none());
        assert_eq!(defaults.timeout_ms, 10_000);
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        // The only test in this crate that touches the process environment
        std::env::set_var("ANALYTICS_WEBHOOK_URL", "http://localhost:9/track");
        std::env::set_var("ANALYTICS_CLUSTER_NAME", "env-cluster");
        let config = AnalyticsConfig::from_env();
        std::env::remove_var("ANALYTICS_WEBHOOK_URL");
        std::env::remove_var("ANALYTICS_CLUSTER_NAME");

        assert_eq!(config.cluster_name, "env-cluster");
        assert_eq!(
            config.webhook.map(|w| w.url).as_deref(),
            Some("http://localhost:9/track")
        );
    }

    #[test]
    fn test_webhook_config_auth_header() {
        let mut config = WebhookConfig::new("woopra", "https://example.com/track");
        assert!(config.auth_header().is_none());

        config.token = Some("secret".to_string());
        assert_eq!(config.auth_header().as_deref(), Some("Bearer secret"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_without_webhook_has_no_destinations() {
        let config = AnalyticsConfig::new("cluster-a", "controller-1");
        assert!(config.enabled);
        assert!(config.destinations().unwrap().is_empty());
    }

    #[test]
    fn test_config_with_webhook_builds_destination() {
        let config = AnalyticsConfig {
            webhook: Some(WebhookConfig::new("woopra", "http://localhost:1/track")),
            ..AnalyticsConfig::new("cluster-a", "controller-1")
        };

        let destinations = config.destinations().unwrap();
        assert_eq!(destinations.len(), 1);
        assert_eq!(destinations[0].name(), "woopra");
    }
}
