use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsletterStatus {
    Draft,
    Published,
    /// Reached out of band; dispatching an archived newsletter publishes it
    /// again
    Archived,
}

impl NewsletterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl TryFrom<&str> for NewsletterStatus {
    type Error = String;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(format!("Invalid newsletter status: {other:?}")),
        }
    }
}

/// A newsletter as edited by its owner. `content` is the raw block tree; it
/// is only parsed when compiled, so a damaged tree never prevents loading.
#[derive(Debug, Clone)]
pub struct Newsletter {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub subject: String,
    pub preview_text: Option<String>,
    pub content: Value,
    pub status: NewsletterStatus,
    /// Stamped by the first transition to `Published`, never overwritten
    pub published_at: Option<DateTime<Utc>>,
    pub last_send_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Status flipped to `Published`; carries the effective `published_at`
    Published(DateTime<Utc>),
    /// Already published, nothing changed
    Unchanged,
}

impl Newsletter {
    pub fn is_published(&self) -> bool { self.status == NewsletterStatus::Published }

    /// draft/archived -> published. Calling this on a published newsletter is
    /// a no-op, and an existing `published_at` is never re-stamped.
    pub fn publish(
        &mut self,
        now: DateTime<Utc>,
    ) -> Transition {
        if self.is_published() {
            return Transition::Unchanged;
        }
        self.status = NewsletterStatus::Published;
        Transition::Published(*self.published_at.get_or_insert(now))
    }

    /// Campaign name for a dispatch of this newsletter
    pub fn campaign_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            self.subject.clone()
        } else {
            name.to_string()
        }
    }
}
