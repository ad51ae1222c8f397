//! Write-once record of a non-empty dispatch.

use chrono::DateTime;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::compiler::CompiledEmail;
use crate::domain::Campaign;
use crate::domain::CampaignStats;
use crate::domain::Newsletter;
use crate::domain::Recipient;
use crate::domain::CAMPAIGN_STATUS_SENT;
use crate::store::CampaignStore;

/// Build the campaign for a dispatch of `newsletter` to `audience`. The
/// snapshot is a copy of what was sent, so later edits to the newsletter do
/// not rewrite history.
pub fn build_campaign(
    newsletter: &Newsletter,
    email: &CompiledEmail,
    audience: &[Recipient],
    sent_at: DateTime<Utc>,
) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        owner_id: newsletter.owner_id,
        newsletter_id: newsletter.id,
        name: newsletter.campaign_name(),
        subject: newsletter.subject.clone(),
        content_snapshot: json!({
            "elements": newsletter.content,
            "previewText": newsletter.preview_text,
            "html": email.html,
        }),
        status: CAMPAIGN_STATUS_SENT.to_string(),
        sent_at,
        recipient_ids: audience.iter().map(|r| r.id).collect(),
    }
}

/// Persist exactly one campaign and its stats. Must only be called for a
/// non-empty audience.
#[tracing::instrument(
    name = "Recording delivery",
    skip_all,
    fields(newsletter_id = %newsletter.id, sent_count)
)]
pub async fn record_delivery<S>(
    store: &S,
    newsletter: &Newsletter,
    email: &CompiledEmail,
    audience: &[Recipient],
    sent_count: usize,
) -> Result<Uuid, anyhow::Error>
where
    S: CampaignStore + ?Sized,
{
    let campaign = build_campaign(newsletter, email, audience, Utc::now());
    let stats = CampaignStats::after_send(campaign.id, sent_count);
    store.insert_campaign(&campaign, &stats).await?;
    Ok(campaign.id)
}
