//! Persistence seam.
//!
//! Every read is scoped by owner where the caller acts on behalf of one; a
//! newsletter that exists but belongs to someone else is indistinguishable
//! from one that does not exist.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::Campaign;
use crate::domain::CampaignStats;
use crate::domain::Newsletter;
use crate::domain::Recipient;
use crate::domain::Transition;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// `None` for a missing newsletter *and* for one not owned by `owner_id`
    async fn newsletter(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error>;

    /// Public read; only published newsletters are returned
    async fn published_newsletter(
        &self,
        id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error>;

    /// Guarded draft/archived -> published transition. Must not touch a
    /// newsletter that is already published, and must never overwrite an
    /// existing `published_at`.
    async fn publish(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Transition, anyhow::Error>;

    async fn record_send_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error>;
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Point-in-time snapshot of the owner's `active` recipients
    async fn active_recipients(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Recipient>, anyhow::Error>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Write a campaign and its stats row together, or neither
    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        stats: &CampaignStats,
    ) -> Result<(), anyhow::Error>;
}

/// Everything the dispatch path needs from persistence.
pub trait Store: NewsletterStore + RecipientStore + CampaignStore {}

impl<T> Store for T where T: NewsletterStore + RecipientStore + CampaignStore {}
