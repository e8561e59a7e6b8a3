use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::EmailSettings;
use larder_core::service::ListMailer;

/// Client for the hosted email-dispatch service: one POST per message, the
/// HTML body and recipient in the payload, success/failure in the response.
pub struct DispatchClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    rt: tokio::runtime::Handle,
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    to_email: &'a str,
    from_name: &'a str,
    message_html: &'a str,
}

#[derive(Deserialize)]
struct DispatchResponse {
    #[serde(default)]
    error: Option<String>,
}

impl DispatchClient {
    pub fn new(settings: &EmailSettings) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "larder-cli/{} (meal planner)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            endpoint: settings.endpoint.clone(),
            token: settings.token.clone(),
            rt: tokio::runtime::Handle::current(),
        }
    }

    pub async fn send_async(&self, to: &str, sender_name: &str, html_body: &str) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&DispatchRequest {
            to_email: to,
            from_name: sender_name,
            message_html: html_body,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .context("Failed to reach email dispatch service")?;

        let status = resp.status();
        if !status.is_success() {
            // Dispatch services return their reason in the body when they can
            let detail = resp
                .json::<DispatchResponse>()
                .await
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| status.to_string());
            bail!("Email dispatch failed: {detail}");
        }

        Ok(())
    }
}

impl ListMailer for DispatchClient {
    /// Synchronous bridge for non-async callers. Must be invoked off the
    /// runtime's worker threads.
    fn send(&self, to: &str, sender_name: &str, html_body: &str) -> Result<()> {
        self.rt.block_on(self.send_async(to, sender_name, html_body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str) -> EmailSettings {
        EmailSettings {
            endpoint: endpoint.to_string(),
            token: None,
        }
    }

    #[test]
    fn test_dispatch_request_payload_shape() {
        let req = DispatchRequest {
            to_email: "alex@example.com",
            from_name: "Alex",
            message_html: "<h3>Dairy</h3><li>Milk</li>",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["to_email"], "alex@example.com");
        assert_eq!(json["from_name"], "Alex");
        assert_eq!(json["message_html"], "<h3>Dairy</h3><li>Milk</li>");
    }

    #[test]
    fn test_dispatch_response_error_field_optional() {
        let with: DispatchResponse = serde_json::from_str(r#"{"error": "quota"}"#).unwrap();
        assert_eq!(with.error.as_deref(), Some("quota"));

        let without: DispatchResponse = serde_json::from_str("{}").unwrap();
        assert!(without.error.is_none());
    }

    // --- Integration test (needs a reachable dispatch endpoint) ---

    #[tokio::test]
    #[ignore = "hits a live dispatch endpoint"]
    async fn test_send_against_local_endpoint() {
        let client = DispatchClient::new(&settings("http://127.0.0.1:9925/send"));
        client
            .send_async("alex@example.com", "Alex", "<li>Milk</li>")
            .await
            .unwrap();
    }
}
