// Webhook Destination
//
// Delivers each event as a JSON document POSTed to a configured URL.
// One request per event; any 2xx response counts as delivered.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error};
use useranalytics_core::AnalyticsEvent;

use crate::config::WebhookConfig;
use crate::destination::{DeliveryError, Destination};

/// Request body sent to the webhook
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    event: &'a str,
    actor_id: &'a str,
    object_kind: &'a str,
    object_name: &'a str,
    object_namespace: &'a str,
    object_uid: &'a str,
    cluster_name: &'a str,
    controller_id: &'a str,
    timestamp: DateTime<Utc>,
    properties: &'a HashMap<String, String>,
    annotations: &'a HashMap<String, String>,
    sdk_version: &'static str,
}

impl<'a> From<&'a AnalyticsEvent> for WebhookPayload<'a> {
    fn from(event: &'a AnalyticsEvent) -> Self {
        Self {
            event: &event.event_name,
            actor_id: &event.actor_id,
            object_kind: &event.object_kind,
            object_name: &event.object_name,
            object_namespace: &event.object_namespace,
            object_uid: &event.object_uid,
            cluster_name: &event.cluster_name,
            controller_id: &event.controller_id,
            timestamp: event.timestamp,
            properties: &event.properties,
            annotations: &event.annotations,
            sdk_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Destination that POSTs events to an HTTP endpoint
pub struct WebhookDestination {
    config: WebhookConfig,
    client: Client,
}

impl WebhookDestination {
    /// Create a new webhook destination
    pub fn new(config: WebhookConfig) -> Result<Self, DeliveryError> {
        if config.url.is_empty() {
            return Err(DeliveryError::Config("webhook URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

#[async_trait]
impl Destination for WebhookDestination {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, event: &AnalyticsEvent) -> Result<(), DeliveryError> {
        let payload = WebhookPayload::from(event);

        debug!(url = %self.config.url, event_name = %event.event_name, "Sending analytics event");

        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(auth) = self.config.auth_header() {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "Webhook rejected analytics event");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
