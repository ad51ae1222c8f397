use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::EmailAddress;

/// One message, as handed to a transport. The sender is a property of the
/// transport, not of the message.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingEmail<'a> {
    pub to: &'a str,
    pub subject: &'a str,
    pub html: &'a str,
    pub text: &'a str,
    pub headers: &'a [(String, String)],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str { &self.0 }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Could not connect to the mail server")]
    ConnectionRefused(#[source] anyhow::Error),
    #[error("The mail server rejected the configured credentials")]
    Authentication,
    #[error("The mail server did not respond in time")]
    Timeout,
    #[error("The mail server rejected the message (HTTP {status})")]
    Rejected { status: u16 },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionRefused(e.into())
        } else {
            Self::Unexpected(e.into())
        }
    }
}

/// The outbound mail seam.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Cheap, bounded-time reachability + credentials check. Dispatch calls
    /// this once before sending anything.
    async fn verify(&self) -> Result<(), TransportError>;

    /// Send a single message. Per-message timeouts surface as
    /// `TransportError::Timeout`.
    async fn send(
        &self,
        email: &OutgoingEmail<'_>,
    ) -> Result<MessageId, TransportError>;
}

/// Transport backed by an HTTP email API.
///
/// Establishing a HTTP connection is expensive, so one `Client` (and its
/// connection pool) is kept for the lifetime of the app.
#[derive(Debug)]
pub struct EmailClient {
    http_client: Client,
    probe_client: Client,
    base_url: Url,
    sender: EmailAddress,
    authorization_token: Secret<String>,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    headers: BTreeMap<&'a str, &'a str>,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    #[serde(alias = "MessageID", alias = "message_id")]
    id: Option<String>,
}

impl EmailClient {
    pub fn new(
        base_url: &str,
        sender: EmailAddress,
        authorization_token: Secret<String>,
        timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let probe_client = Client::builder()
            .connect_timeout(probe_timeout)
            .timeout(probe_timeout)
            .build()?;
        Ok(Self {
            http_client,
            probe_client,
            base_url: Url::parse(base_url)?,
            sender,
            authorization_token,
        })
    }

    fn bearer(&self) -> String { format!("Bearer {}", self.authorization_token.expose_secret()) }
}

fn check_status(status: StatusCode) -> Result<(), TransportError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::Authentication),
        s if s.is_success() => Ok(()),
        s => Err(TransportError::Rejected { status: s.as_u16() }),
    }
}

#[async_trait]
impl MailTransport for EmailClient {
    #[tracing::instrument(name = "Probing mail transport", skip(self), err)]
    async fn verify(&self) -> Result<(), TransportError> {
        let resp = self
            .probe_client
            .get(self.base_url.clone())
            .header("Authorization", self.bearer())
            .send()
            .await?;
        // any answer proves reachability; only credential failures matter here
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::Authentication),
            _ => Ok(()),
        }
    }

    async fn send(
        &self,
        email: &OutgoingEmail<'_>,
    ) -> Result<MessageId, TransportError> {
        let url = self
            .base_url
            .join("email")
            .map_err(|e| TransportError::Unexpected(e.into()))?;

        let body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: email.to,
            subject: email.subject,
            html: email.html,
            text: email.text,
            headers: email
                .headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        };

        let resp = self
            .http_client
            .post(url)
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await?;
        check_status(resp.status())?;

        // providers disagree on the shape of the reply; a missing id is not a
        // failed send
        let id = resp
            .json::<SendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(MessageId(id))
    }
}
