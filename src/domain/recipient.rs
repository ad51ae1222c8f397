use uuid::Uuid;

/// Subscriber status as stored. Only `Active` recipients are part of a
/// dispatch audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientStatus {
    Active,
    Unsubscribed,
    Bounced,
    /// Any other state written by collaborators (e.g. `complained`)
    Other(String),
}

impl RecipientStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Unsubscribed => "unsubscribed",
            Self::Bounced => "bounced",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for RecipientStatus {
    fn from(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "unsubscribed" => Self::Unsubscribed,
            "bounced" => Self::Bounced,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: Uuid,
    /// Not validated on the way in; see `dispatch::send_one`
    pub email: String,
    pub status: RecipientStatus,
}

impl Recipient {
    pub fn is_active(&self) -> bool { self.status == RecipientStatus::Active }
}

/// Outcome of one send attempt. Produced per dispatch and only ever reported
/// in aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub email: String,
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn sent(email: String) -> Self {
        Self {
            email,
            success: true,
            error: None,
        }
    }

    pub fn failed(
        email: String,
        error: String,
    ) -> Self {
        Self {
            email,
            success: false,
            error: Some(error),
        }
    }
}
