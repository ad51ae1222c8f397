use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;

use crate::email_client::TransportError;

mod send;
mod test_send;
mod view;

pub use send::*;
pub use test_send::*;
pub use view::*;

/// Error bodies share the `{message}` shape of success bodies
fn json_error(
    status: StatusCode,
    message: &str,
) -> HttpResponse {
    HttpResponse::build(status).json(json!({ "message": message }))
}

/// What the caller is told about a transport failure. Details stay in the
/// logs.
fn transport_error_message(e: &TransportError) -> &'static str {
    match e {
        TransportError::ConnectionRefused(_) => {
            "Could not connect to the email server. Check the email service configuration."
        }
        TransportError::Authentication => {
            "The email server rejected the configured credentials. Check the email service configuration."
        }
        TransportError::Timeout => "The email server did not respond in time. Try again later.",
        TransportError::Rejected { .. } => "The email server refused to accept the message.",
        TransportError::Unexpected(_) => "Failed to send email.",
    }
}
