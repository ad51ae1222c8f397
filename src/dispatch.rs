//! Sending a newsletter to every active recipient of its owner.
//!
//! The order of operations matters:
//!
//! 1. owner-scoped lookup (a foreign newsletter is simply "not found")
//! 2. publish, at most once
//! 3. snapshot the audience and stamp the attempt
//! 4. empty audience: stop here, no campaign
//! 5. compile once, probe the transport, then fan out
//! 6. record exactly one campaign for the settled outcomes; a failed write
//!    is logged and the counts are still returned

use std::fmt::Debug;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::compiler::CompiledEmail;
use crate::compiler::Compiler;
use crate::compiler::SendMode;
use crate::domain::EmailAddress;
use crate::domain::NewsletterStatus;
use crate::domain::Recipient;
use crate::domain::SendOutcome;
use crate::domain::Transition;
use crate::email_client::MailTransport;
use crate::email_client::OutgoingEmail;
use crate::email_client::TransportError;
use crate::ledger;
use crate::store::Store;
use crate::utils::error_chain_fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub total_subscribers: usize,
    pub sent_count: usize,
    pub failed_count: usize,
    /// `None` when there was nobody to send to, or when the campaign could
    /// not be recorded after sending
    pub campaign_id: Option<Uuid>,
}

impl DispatchSummary {
    fn empty() -> Self {
        Self {
            total_subscribers: 0,
            sent_count: 0,
            failed_count: 0,
            campaign_id: None,
        }
    }
}

#[derive(thiserror::Error)]
pub enum DispatchError {
    /// Missing, or owned by someone else
    #[error("Newsletter not found")]
    NotFound,
    /// Nothing was sent
    #[error("The mail transport is not usable")]
    TransportConfiguration(#[source] TransportError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for DispatchError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[tracing::instrument(
    name = "Dispatching newsletter",
    skip(store, transport, compiler),
    fields(
        total_subscribers = tracing::field::Empty,
        sent_count = tracing::field::Empty,
        failed_count = tracing::field::Empty,
    )
)]
pub async fn dispatch(
    store: &dyn Store,
    transport: &dyn MailTransport,
    compiler: &Compiler,
    newsletter_id: Uuid,
    owner_id: Uuid,
) -> Result<DispatchSummary, DispatchError> {
    let mut newsletter = store
        .newsletter(newsletter_id, owner_id)
        .await?
        .ok_or(DispatchError::NotFound)?;

    let now = Utc::now();
    if !newsletter.is_published() {
        match store.publish(newsletter_id, owner_id, now).await? {
            Transition::Published(published_at) => {
                tracing::info!(%published_at, "newsletter published");
                newsletter.status = NewsletterStatus::Published;
                newsletter.published_at = Some(published_at);
            }
            // a concurrent dispatch got there first
            Transition::Unchanged => {}
        }
    }

    let audience = store.active_recipients(owner_id).await?;
    store.record_send_attempt(newsletter_id, now).await?;
    tracing::Span::current().record("total_subscribers", audience.len());

    if audience.is_empty() {
        tracing::info!("no active recipients, nothing to send");
        return Ok(DispatchSummary::empty());
    }

    let email = compiler.compile(&newsletter.content, &SendMode::Live);

    transport.verify().await.map_err(|e| {
        tracing::error!(error.cause_chain = ?e, "mail transport failed its probe, aborting dispatch");
        DispatchError::TransportConfiguration(e)
    })?;

    let headers = compiler.unsubscribe_headers();
    let outcomes = join_all(
        audience
            .iter()
            .map(|r| send_one(transport, r, &newsletter.subject, &email, &headers)),
    )
    .await;

    let sent_count = outcomes.iter().filter(|o| o.success).count();
    let failed_count = outcomes.len() - sent_count;
    tracing::Span::current()
        .record("sent_count", sent_count)
        .record("failed_count", failed_count);

    // the emails are out; losing the record must not lose the counts
    let campaign_id =
        match ledger::record_delivery(store, &newsletter, &email, &audience, sent_count).await {
            Ok(campaign_id) => Some(campaign_id),
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    "newsletter was sent but its campaign could not be recorded"
                );
                None
            }
        };

    Ok(DispatchSummary {
        total_subscribers: audience.len(),
        sent_count,
        failed_count,
        campaign_id,
    })
}

/// Never fails: every error becomes a failed [`SendOutcome`].
async fn send_one(
    transport: &dyn MailTransport,
    recipient: &Recipient,
    subject: &str,
    email: &CompiledEmail,
    headers: &[(String, String)],
) -> SendOutcome {
    // stored addresses are not trusted to still be valid
    let to = match EmailAddress::parse(recipient.email.clone()) {
        Ok(to) => to,
        Err(e) => {
            tracing::warn!(recipient_id = %recipient.id, error = %e, "skipping invalid email");
            return SendOutcome::failed(recipient.email.clone(), e);
        }
    };

    let message = OutgoingEmail {
        to: to.as_ref(),
        subject,
        html: &email.html,
        text: &email.text,
        headers,
    };
    match transport.send(&message).await {
        Ok(_) => SendOutcome::sent(recipient.email.clone()),
        Err(e) => {
            tracing::warn!(
                recipient_id = %recipient.id,
                error.cause_chain = ?e,
                "failed to deliver newsletter"
            );
            SendOutcome::failed(recipient.email.clone(), e.to_string())
        }
    }
}
