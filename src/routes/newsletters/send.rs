use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Serialize;
use uuid::Uuid;

use super::json_error;
use super::transport_error_message;
use crate::authentication::OwnerId;
use crate::cache::WebViewCache;
use crate::compiler::Compiler;
use crate::dispatch::dispatch;
use crate::dispatch::DispatchError;
use crate::dispatch::DispatchSummary;
use crate::email_client::MailTransport;
use crate::store::Store;

#[derive(Serialize)]
struct SendResponse {
    message: String,
    #[serde(flatten)]
    summary: DispatchSummary,
}

impl From<DispatchSummary> for SendResponse {
    fn from(summary: DispatchSummary) -> Self {
        let message = match (summary.total_subscribers, summary.campaign_id) {
            (0, _) => {
                "Newsletter published. There are no active subscribers to send it to.".to_string()
            }
            (n, Some(_)) => format!(
                "Newsletter sent to {} of {n} subscribers.",
                summary.sent_count
            ),
            (n, None) => format!(
                "Newsletter sent to {} of {n} subscribers, but the delivery record could not be saved.",
                summary.sent_count
            ),
        };
        Self { message, summary }
    }
}

impl ResponseError for DispatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TransportConfiguration(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::NotFound => json_error(self.status_code(), "Newsletter not found"),
            Self::TransportConfiguration(e) => {
                json_error(self.status_code(), transport_error_message(e))
            }
            Self::Unexpected(_) => json_error(self.status_code(), "Failed to send newsletter"),
        }
    }
}

/// `POST /admin/newsletters/{id}/send`
///
/// Publishes the newsletter (once) and sends it to every active recipient.
/// Partial failures still answer 200; the counts say what happened.
#[tracing::instrument(
    name = "Sending newsletter",
    skip(store, transport, compiler, web_views),
    fields(newsletter_id = %*newsletter_id, owner_id = %*owner_id)
)]
pub async fn send_newsletter(
    newsletter_id: web::Path<Uuid>,
    owner_id: web::ReqData<OwnerId>,
    store: web::Data<dyn Store>,
    transport: web::Data<dyn MailTransport>,
    compiler: web::Data<Compiler>,
    web_views: web::Data<WebViewCache>,
) -> Result<HttpResponse, DispatchError> {
    let newsletter_id = newsletter_id.into_inner();
    let owner_id = *owner_id.into_inner();

    let outcome = dispatch(
        store.get_ref(),
        transport.get_ref(),
        &compiler,
        newsletter_id,
        owner_id,
    )
    .await;

    // the newsletter may have been published even if sending failed
    if !matches!(outcome, Err(DispatchError::NotFound)) {
        web_views.invalidate(&newsletter_id);
    }

    let summary = outcome.map_err(|e| {
        if let DispatchError::Unexpected(_) = e {
            tracing::error!(error.cause_chain = ?e, "dispatch failed");
        }
        e
    })?;

    Ok(HttpResponse::Ok().json(SendResponse::from(summary)))
}
