use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use super::CampaignStore;
use super::NewsletterStore;
use super::RecipientStore;
use crate::domain::Campaign;
use crate::domain::CampaignStats;
use crate::domain::Newsletter;
use crate::domain::Recipient;
use crate::domain::Transition;

#[derive(Debug, Default)]
struct State {
    newsletters: HashMap<Uuid, Newsletter>,
    /// (owner_id, recipient), in insertion order
    recipients: Vec<(Uuid, Recipient)>,
    campaigns: Vec<Campaign>,
    stats: HashMap<Uuid, CampaignStats>,
}

/// Store kept entirely in memory, for tests and local runs without Postgres.
///
/// Locks are never held across an `.await`. A poisoned lock is recovered
/// rather than propagated, since every write leaves `State` consistent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn insert_newsletter(
        &self,
        newsletter: Newsletter,
    ) {
        self.write().newsletters.insert(newsletter.id, newsletter);
    }

    pub fn insert_recipient(
        &self,
        owner_id: Uuid,
        recipient: Recipient,
    ) {
        self.write().recipients.push((owner_id, recipient));
    }

    /// Current state of a newsletter, regardless of owner
    pub fn newsletter_snapshot(
        &self,
        id: Uuid,
    ) -> Option<Newsletter> {
        self.read().newsletters.get(&id).cloned()
    }

    pub fn campaigns(&self) -> Vec<Campaign> { self.read().campaigns.clone() }

    pub fn campaign_stats(
        &self,
        campaign_id: Uuid,
    ) -> Option<CampaignStats> {
        self.read().stats.get(&campaign_id).copied()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NewsletterStore for InMemoryStore {
    async fn newsletter(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error> {
        Ok(self
            .read()
            .newsletters
            .get(&id)
            .filter(|n| n.owner_id == owner_id)
            .cloned())
    }

    async fn published_newsletter(
        &self,
        id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error> {
        Ok(self
            .read()
            .newsletters
            .get(&id)
            .filter(|n| n.is_published())
            .cloned())
    }

    async fn publish(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Transition, anyhow::Error> {
        // check and flip under one write lock
        let mut state = self.write();
        let newsletter = state
            .newsletters
            .get_mut(&id)
            .filter(|n| n.owner_id == owner_id)
            .ok_or_else(|| anyhow::anyhow!("Newsletter {id} disappeared before publishing"))?;
        Ok(newsletter.publish(now))
    }

    async fn record_send_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        if let Some(newsletter) = self.write().newsletters.get_mut(&id) {
            newsletter.last_send_attempt_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for InMemoryStore {
    async fn active_recipients(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Recipient>, anyhow::Error> {
        Ok(self
            .read()
            .recipients
            .iter()
            .filter(|(owner, r)| *owner == owner_id && r.is_active())
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        stats: &CampaignStats,
    ) -> Result<(), anyhow::Error> {
        let mut state = self.write();
        if state.stats.contains_key(&stats.campaign_id) {
            anyhow::bail!("Campaign {} already has stats", stats.campaign_id);
        }
        state.campaigns.push(campaign.clone());
        state.stats.insert(stats.campaign_id, *stats);
        Ok(())
    }
}
