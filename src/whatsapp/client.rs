//! WhatsApp Cloud API send client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use super::MessageSender;
use crate::config::WhatsAppConfig;
use crate::error::{RelayError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for `POST {api_url}/{phone_number_id}/messages`.
///
/// Every call is a single attempt. The public operations report success as a
/// boolean and log the failure details.
pub struct WhatsAppClient {
    http: Client,
    api_url: String,
    access_token: Option<String>,
    phone_number_id: Option<String>,
}

impl WhatsAppClient {
    /// Build a client from the `whatsapp` configuration section.
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
        })
    }

    fn messages_url(&self) -> Result<String> {
        let phone_number_id = self
            .phone_number_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::Config("WhatsApp phone number id not set".to_string()))?;
        Ok(format!("{}/{}/messages", self.api_url, phone_number_id))
    }

    async fn post_messages(&self, payload: &Value) -> Result<Value> {
        let mut request = self.http.post(self.messages_url()?).json(payload);
        if let Some(token) = self.access_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// Send a template message.
    pub async fn send_template_message(
        &self,
        to: &str,
        template_name: &str,
        language_code: &str,
    ) -> bool {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "template",
            "template": {
                "name": template_name,
                "language": {"code": language_code}
            }
        });

        match self.post_messages(&payload).await {
            Ok(result) => {
                info!(
                    to = %to,
                    template = %template_name,
                    result = %result,
                    "Template message sent successfully"
                );
                true
            }
            Err(e) => {
                error!(
                    to = %to,
                    template = %template_name,
                    error = %e,
                    "Failed to send template message"
                );
                false
            }
        }
    }
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_message(&self, to: &str, body: &str) -> bool {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": {"body": body}
        });

        match self.post_messages(&payload).await {
            Ok(result) => {
                info!(to = %to, result = %result, "Message sent successfully");
                true
            }
            Err(e) => {
                error!(to = %to, error = %e, "Failed to send message");
                false
            }
        }
    }

    async fn mark_message_as_read(&self, message_id: &str) -> bool {
        let payload = json!({
            "messaging_product": "whatsapp",
            "status": "read",
            "message_id": message_id
        });

        match self.post_messages(&payload).await {
            Ok(_) => {
                debug!(message_id = %message_id, "Marked message as read");
                true
            }
            Err(e) => {
                error!(message_id = %message_id, error = %e, "Error marking message as read");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::whatsapp::DEFAULT_TEMPLATE_LANGUAGE;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WhatsAppClient {
        let config = WhatsAppConfig {
            api_url: format!("{}/v16.0", server.uri()),
            access_token: Some("wa-token".to_string()),
            phone_number_id: Some("PHONE_ID".to_string()),
            verify_token: None,
        };
        WhatsAppClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_send_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v16.0/PHONE_ID/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "5215512345678",
                "type": "text",
                "text": {"body": "hola"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "5215512345678", "wa_id": "5215512345678"}],
                "messages": [{"id": "wamid.out"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).send_message("5215512345678", "hola").await);
    }

    #[tokio::test]
    async fn test_send_message_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!client_for(&server).send_message("5215512345678", "hola").await);
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Invalid parameter", "code": 100}
            })))
            .mount(&server)
            .await;

        assert!(!client_for(&server).send_message("bad", "hola").await);
    }

    #[tokio::test]
    async fn test_send_message_unreachable() {
        let config = WhatsAppConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            access_token: Some("t".to_string()),
            phone_number_id: Some("P".to_string()),
            verify_token: None,
        };
        let client = WhatsAppClient::new(&config).unwrap();
        assert!(!client.send_message("5215512345678", "hola").await);
    }

    #[tokio::test]
    async fn test_missing_phone_number_id_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = WhatsAppConfig {
            api_url: server.uri(),
            access_token: Some("t".to_string()),
            phone_number_id: None,
            verify_token: None,
        };
        let client = WhatsAppClient::new(&config).unwrap();
        assert!(!client.send_message("5215512345678", "hola").await);
    }

    #[tokio::test]
    async fn test_send_template_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v16.0/PHONE_ID/messages"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "5215512345678",
                "type": "template",
                "template": {"name": "hello_world", "language": {"code": "es"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(
            client_for(&server)
                .send_template_message("5215512345678", "hello_world", DEFAULT_TEMPLATE_LANGUAGE)
                .await
        );
    }

    #[tokio::test]
    async fn test_mark_message_as_read() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v16.0/PHONE_ID/messages"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "status": "read",
                "message_id": "wamid.1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).mark_message_as_read("wamid.1").await);
    }
}
