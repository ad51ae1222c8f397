use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Status of every campaign this crate writes
pub const CAMPAIGN_STATUS_SENT: &str = "sent";

/// Immutable record of one non-empty dispatch. `content_snapshot` is a
/// serialized copy of what was sent, not a reference to the newsletter.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub newsletter_id: Uuid,
    pub name: String,
    pub subject: String,
    pub content_snapshot: Value,
    pub status: String,
    pub sent_at: DateTime<Utc>,
    /// Targeted recipients, in audience order
    pub recipient_ids: Vec<Uuid>,
}

/// Engagement counters, 1:1 with a [`Campaign`]. Only `sent`/`delivered` are
/// set here; the rest are incremented by external trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignStats {
    pub campaign_id: Uuid,
    pub sent: i64,
    pub delivered: i64,
    pub opened: i64,
    pub clicked: i64,
    pub bounced: i64,
    pub complaints: i64,
    pub unsubscribed: i64,
}

impl CampaignStats {
    pub fn after_send(
        campaign_id: Uuid,
        sent_count: usize,
    ) -> Self {
        let sent = sent_count as i64;
        Self {
            campaign_id,
            sent,
            delivered: sent,
            opened: 0,
            clicked: 0,
            bounced: 0,
            complaints: 0,
            unsubscribed: 0,
        }
    }
}
