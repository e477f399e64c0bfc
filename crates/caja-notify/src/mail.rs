//! [`MailApiDispatcher`] — delivers notifications through an HTTP mail API.
//!
//! The API accepts one JSON message per call; file attachments travel
//! base64-encoded in the body.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use caja_core::{
  Error, Result,
  external::{NotificationDispatcher, OutboundMessage},
};
use serde::Deserialize;
use serde_json::{Value, json};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the mail API.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  /// Message endpoint, e.g. `https://mail.example.com/v1/messages`.
  pub endpoint: String,
  pub token:    String,
  /// The `from` address stamped on every message.
  pub sender:   String,
}

/// Async client for the mail API. Cheap to clone.
#[derive(Clone)]
pub struct MailApiDispatcher {
  http:   reqwest::Client,
  config: MailConfig,
}

impl MailApiDispatcher {
  pub fn new(config: MailConfig) -> Result<Self> {
    if config.token.is_empty() {
      return Err(Error::Config("mail token is empty".to_string()));
    }
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| Error::upstream("mail", e.to_string()))?;
    Ok(Self { http, config })
  }
}

impl NotificationDispatcher for MailApiDispatcher {
  async fn send(&self, message: &OutboundMessage) -> Result<()> {
    let resp = self
      .http
      .post(&self.config.endpoint)
      .bearer_auth(&self.config.token)
      .json(&payload(&self.config.sender, message))
      .send()
      .await
      .map_err(|e| Error::upstream("mail", e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::upstream("mail", format!("dispatch returned {status}: {body}")));
    }
    tracing::info!(
      recipients = message.recipients.len(),
      attachments = message.attachments.len(),
      "notification dispatched"
    );
    Ok(())
  }
}

/// The wire shape of one message.
fn payload(sender: &str, message: &OutboundMessage) -> Value {
  let attachments: Vec<Value> = message
    .attachments
    .iter()
    .map(|a| {
      json!({
        "name":         a.name,
        "content_type": a.content_type,
        "data":         B64.encode(&a.bytes),
      })
    })
    .collect();

  json!({
    "from":        sender,
    "to":          message.recipients,
    "subject":     message.subject,
    "html":        message.html_body,
    "attachments": attachments,
  })
}

#[cfg(test)]
mod tests {
  use caja_core::external::MailAttachment;

  use super::*;

  #[test]
  fn payload_encodes_attachments_as_base64() {
    let message = OutboundMessage {
      subject:     "Consolidación".to_string(),
      html_body:   "<p>hola</p>".to_string(),
      recipients:  vec!["tesoreria@example.com".to_string()],
      attachments: vec![MailAttachment {
        name:         "recibo.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes:        b"%PDF-1.4".to_vec(),
      }],
    };

    let body = payload("caja@example.com", &message);
    assert_eq!(body["from"], "caja@example.com");
    assert_eq!(body["to"][0], "tesoreria@example.com");
    assert_eq!(body["attachments"][0]["data"], B64.encode(b"%PDF-1.4"));
    assert_eq!(body["attachments"][0]["name"], "recibo.pdf");
  }
}
