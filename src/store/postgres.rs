use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use super::CampaignStore;
use super::NewsletterStore;
use super::RecipientStore;
use crate::domain::Campaign;
use crate::domain::CampaignStats;
use crate::domain::Newsletter;
use crate::domain::NewsletterStatus;
use crate::domain::Recipient;
use crate::domain::RecipientStatus;
use crate::domain::Transition;

/// `PgPool` is an `Arc` internally, so this is cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(sqlx::FromRow)]
struct NewsletterRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    subject: String,
    preview_text: Option<String>,
    content: Value,
    status: String,
    published_at: Option<DateTime<Utc>>,
    last_send_attempt_at: Option<DateTime<Utc>>,
}

impl TryFrom<NewsletterRow> for Newsletter {
    type Error = anyhow::Error;
    fn try_from(row: NewsletterRow) -> Result<Self, Self::Error> {
        Ok(Newsletter {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            subject: row.subject,
            preview_text: row.preview_text,
            content: row.content,
            status: NewsletterStatus::try_from(row.status.as_str()).map_err(anyhow::Error::msg)?,
            published_at: row.published_at,
            last_send_attempt_at: row.last_send_attempt_at,
        })
    }
}

const NEWSLETTER_COLUMNS: &str = r#"
    id, owner_id, name, subject, preview_text, content, status,
    published_at, last_send_attempt_at
"#;

#[async_trait]
impl NewsletterStore for PgStore {
    #[tracing::instrument(name = "Fetching newsletter", skip(self))]
    async fn newsletter(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error> {
        let query = format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE id = $1 AND owner_id = $2"
        );
        sqlx::query_as::<_, NewsletterRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch newsletter")?
            .map(Newsletter::try_from)
            .transpose()
    }

    #[tracing::instrument(name = "Fetching published newsletter", skip(self))]
    async fn published_newsletter(
        &self,
        id: Uuid,
    ) -> Result<Option<Newsletter>, anyhow::Error> {
        let query = format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE id = $1 AND status = 'published'"
        );
        sqlx::query_as::<_, NewsletterRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch published newsletter")?
            .map(Newsletter::try_from)
            .transpose()
    }

    #[tracing::instrument(name = "Publishing newsletter", skip(self))]
    async fn publish(
        &self,
        id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Transition, anyhow::Error> {
        // the WHERE clause is the guard: a concurrent publish sees zero rows
        let published_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE newsletters
            SET
                status = 'published',
                published_at = COALESCE(published_at, $3)
            WHERE
                id = $1 AND
                owner_id = $2 AND
                status <> 'published'
            RETURNING published_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to publish newsletter")?;

        Ok(match published_at {
            Some(at) => Transition::Published(at),
            None => Transition::Unchanged,
        })
    }

    #[tracing::instrument(name = "Recording send attempt", skip(self))]
    async fn record_send_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), anyhow::Error> {
        sqlx::query("UPDATE newsletters SET last_send_attempt_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .context("Failed to record send attempt")?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RecipientRow {
    id: Uuid,
    email: String,
    status: String,
}

#[async_trait]
impl RecipientStore for PgStore {
    #[tracing::instrument(name = "Getting active recipients", skip(self))]
    async fn active_recipients(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<Recipient>, anyhow::Error> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT id, email, status
            FROM recipients
            WHERE owner_id = $1 AND status = 'active'
            ORDER BY created_at, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active recipients")?;

        Ok(rows
            .into_iter()
            .map(|r| Recipient {
                id: r.id,
                email: r.email,
                status: RecipientStatus::from(r.status.as_str()),
            })
            .collect())
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    #[tracing::instrument(
        name = "Inserting campaign",
        skip_all,
        fields(campaign_id = %campaign.id)
    )]
    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        stats: &CampaignStats,
    ) -> Result<(), anyhow::Error> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, owner_id, newsletter_id, name, subject,
                content_snapshot, status, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.owner_id)
        .bind(campaign.newsletter_id)
        .bind(&campaign.name)
        .bind(&campaign.subject)
        .bind(&campaign.content_snapshot)
        .bind(&campaign.status)
        .bind(campaign.sent_at)
        .execute(&mut *transaction)
        .await
        .context("Failed to insert campaign")?;

        sqlx::query(
            r#"
            INSERT INTO campaign_recipients (campaign_id, recipient_id, position)
            SELECT $1, recipient_id, position - 1
            FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(recipient_id, position)
            "#,
        )
        .bind(campaign.id)
        .bind(&campaign.recipient_ids)
        .execute(&mut *transaction)
        .await
        .context("Failed to insert campaign recipients")?;

        sqlx::query(
            r#"
            INSERT INTO campaign_stats (
                campaign_id, sent, delivered, opened, clicked,
                bounced, complaints, unsubscribed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(stats.campaign_id)
        .bind(stats.sent)
        .bind(stats.delivered)
        .bind(stats.opened)
        .bind(stats.clicked)
        .bind(stats.bounced)
        .bind(stats.complaints)
        .bind(stats.unsubscribed)
        .execute(&mut *transaction)
        .await
        .context("Failed to insert campaign stats")?;

        transaction.commit().await?;
        Ok(())
    }
}
