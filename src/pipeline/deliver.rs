//! Delivery client: forward the reviewed records to the webhook.
//!
//! One POST per session whose body is the JSON array of records in selection
//! order. The webhook's reply is only interesting when it says it is JSON;
//! anything else (including an empty 200) is a successful delivery with no
//! acknowledgement payload.

use crate::config::IntakeConfig;
use crate::error::{DeliveryError, IntakeError};
use crate::record::AnalysisRecord;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

/// Sends the full set of records to the delivery target.
#[async_trait]
pub trait Deliverer: Send + Sync {
    /// Deliver `records` and return the target's JSON acknowledgement, if it
    /// sent one.
    async fn deliver(
        &self,
        records: &[AnalysisRecord],
    ) -> Result<Option<serde_json::Value>, DeliveryError>;
}

/// [`Deliverer`] that POSTs to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookDeliverer {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookDeliverer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Build from config, with a fresh client.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        Ok(Self::new(config.http_client()?, config.delivery_endpoint.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Deliverer for WebhookDeliverer {
    async fn deliver(
        &self,
        records: &[AnalysisRecord],
    ) -> Result<Option<serde_json::Value>, DeliveryError> {
        info!("Delivering {} record(s) to {}", records.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(records)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(declares_json);

        let text = response.text().await.map_err(|e| DeliveryError::Transport {
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        if !is_json {
            debug!("Webhook answered {} without a JSON body", status);
            return Ok(None);
        }
        parse_ack(&text)
    }
}

/// True if a `Content-Type` value names JSON.
fn declares_json(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

/// Parse a JSON acknowledgement. An empty body means no acknowledgement.
fn parse_ack(body: &str) -> Result<Option<serde_json::Value>, DeliveryError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| DeliveryError::MalformedAck {
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_content_type_detection() {
        assert!(declares_json("application/json"));
        assert!(declares_json("application/json; charset=utf-8"));
        assert!(declares_json("Application/JSON"));
        assert!(!declares_json("text/plain"));
        assert!(!declares_json("text/html; charset=utf-8"));
    }

    #[test]
    fn empty_json_body_is_no_ack() {
        assert_eq!(parse_ack("").unwrap(), None);
        assert_eq!(parse_ack("  \n").unwrap(), None);
    }

    #[test]
    fn json_body_is_returned() {
        assert_eq!(
            parse_ack(r#"{"received":2}"#).unwrap(),
            Some(json!({ "received": 2 }))
        );
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(matches!(
            parse_ack("{nope"),
            Err(DeliveryError::MalformedAck { .. })
        ));
    }
}
