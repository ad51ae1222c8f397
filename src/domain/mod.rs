mod block;
mod campaign;
mod email_address;
mod newsletter;
mod recipient;

pub use block::*;
pub use campaign::Campaign;
pub use campaign::CampaignStats;
pub use campaign::CAMPAIGN_STATUS_SENT;
pub use email_address::EmailAddress;
pub use email_address::TestEmail;
pub use newsletter::Newsletter;
pub use newsletter::NewsletterStatus;
pub use newsletter::Transition;
pub use recipient::Recipient;
pub use recipient::RecipientStatus;
pub use recipient::SendOutcome;
