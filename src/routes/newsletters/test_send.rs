use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use uuid::Uuid;

use super::json_error;
use super::transport_error_message;
use crate::authentication::OwnerId;
use crate::compiler::Compiler;
use crate::compiler::SendMode;
use crate::domain::TestEmail;
use crate::email_client::MailTransport;
use crate::email_client::OutgoingEmail;
use crate::email_client::TransportError;
use crate::store::Store;
use crate::utils::error_chain_fmt;

pub const TEST_SUBJECT_PREFIX: &str = "[TEST] ";

/// Unsaved editor state may be sent along; omitted fields fall back to the
/// stored newsletter.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TestSendRequest {
    #[serde(default)]
    test_email: String,
    subject: Option<String>,
    preview_text: Option<String>,
    elements: Option<Value>,
}

#[derive(thiserror::Error)]
pub enum TestSendError {
    #[error("{0}")]
    Validation(String),
    #[error("Newsletter not found")]
    NotFound,
    #[error("Failed to send test email")]
    Transport(#[source] TransportError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for TestSendError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for TestSendError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Transport(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Validation(message) => json_error(self.status_code(), message),
            Self::NotFound => json_error(self.status_code(), "Newsletter not found"),
            Self::Transport(e) => json_error(self.status_code(), transport_error_message(e)),
            Self::Unexpected(_) => json_error(self.status_code(), "Failed to send test email"),
        }
    }
}

/// `POST /admin/newsletters/{id}/test`
///
/// Sends one preview of the (possibly unsaved) newsletter to a single
/// address. Nothing is published and no campaign is recorded.
#[tracing::instrument(
    name = "Sending test email",
    skip(body, store, transport, compiler),
    fields(newsletter_id = %*newsletter_id, owner_id = %*owner_id)
)]
pub async fn send_test_email(
    newsletter_id: web::Path<Uuid>,
    owner_id: web::ReqData<OwnerId>,
    body: web::Json<TestSendRequest>,
    store: web::Data<dyn Store>,
    transport: web::Data<dyn MailTransport>,
    compiler: web::Data<Compiler>,
) -> Result<HttpResponse, TestSendError> {
    let body = body.into_inner();
    let to = TestEmail::parse(&body.test_email).map_err(TestSendError::Validation)?;

    let newsletter = store
        .newsletter(newsletter_id.into_inner(), *owner_id.into_inner())
        .await?
        .ok_or(TestSendError::NotFound)?;

    let elements = body.elements.unwrap_or(newsletter.content);
    match elements.as_array() {
        Some(blocks) if !blocks.is_empty() => {}
        Some(_) => {
            return Err(TestSendError::Validation(
                "Add some content before sending a test email".to_string(),
            ))
        }
        None => {
            return Err(TestSendError::Validation(
                "Content must be a list of blocks".to_string(),
            ))
        }
    }

    let subject = body
        .subject
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(newsletter.subject);
    if subject.trim().is_empty() {
        return Err(TestSendError::Validation("A subject is required".to_string()));
    }
    let preview_text = body.preview_text.or(newsletter.preview_text);

    let email = compiler.compile(&elements, &SendMode::Test { preview_text });
    let subject = format!("{TEST_SUBJECT_PREFIX}{subject}");

    let message_id = transport
        .send(&OutgoingEmail {
            to: to.as_ref(),
            subject: &subject,
            html: &email.html,
            text: &email.text,
            headers: &[],
        })
        .await
        .map_err(|e| {
            tracing::error!(error.cause_chain = ?e, "test email was not sent");
            TestSendError::Transport(e)
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Test email sent to {}", to.as_ref()),
        "messageId": message_id.as_ref(),
    })))
}
