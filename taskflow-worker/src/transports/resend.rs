/// Resend API transport
///
/// Sends mail with `POST {base_url}/emails`, authenticated by a bearer API
/// key. Any non-2xx answer is reported as [`TransportError::Rejected`] with
/// the provider's body, which carries the reason.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{EmailMessage, EmailTransport, TransportError, TransportResult};

/// Production Resend endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Resend transport
#[derive(Clone)]
pub struct ResendTransport {
    client: reqwest::Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl ResendTransport {
    /// Creates a transport against the production endpoint
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> TransportResult<Self> {
        Self::with_base_url(api_key, from, DEFAULT_BASE_URL)
    }

    /// Creates a transport against a custom endpoint
    pub fn with_base_url(
        api_key: impl Into<String>,
        from: impl Into<String>,
        base_url: impl Into<String>,
    ) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    async fn send(&self, message: &EmailMessage) -> TransportResult<()> {
        let body = SendEmailRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %message.to, "Resend accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_posts_expected_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test_key"))
            .and(body_json(serde_json::json!({
                "from": "noreply@example.com",
                "to": ["ada@example.com"],
                "subject": "Hello",
                "html": "<p>Hi</p>"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "email_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ResendTransport::with_base_url("re_test_key", "noreply@example.com", server.uri()).unwrap();
        transport.send(&message()).await.expect("send should succeed");
    }

    #[tokio::test]
    async fn test_send_reports_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from address"))
            .mount(&server)
            .await;

        let transport = ResendTransport::with_base_url("re_test_key", "bad", format!("{}/", server.uri())).unwrap();
        let err = transport.send(&message()).await.unwrap_err();

        match err {
            TransportError::Rejected { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, "invalid from address");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
