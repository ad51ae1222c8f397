use std::fmt::Display;
use std::ops::Deref;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::error::InternalError;
use actix_web::FromRequest;
use actix_web::HttpMessage;
use actix_web::HttpResponse;
use actix_web_lab::middleware::Next;
use serde_json::json;
use uuid::Uuid;

use crate::session_state::TypedSession;
use crate::utils::error_500;

/// Id of the logged-in account, inserted into request extensions by
/// [`reject_anonymous_users`]. Extract with `web::ReqData<OwnerId>`.
#[derive(Clone, Copy, Debug)]
pub struct OwnerId(Uuid);

impl Deref for OwnerId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl Display for OwnerId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Middleware for the `/admin` scope: answers 401 unless the session holds
/// an account id. Runs before any handler, so nothing is touched for
/// anonymous callers.
pub async fn reject_anonymous_users(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let (raw_req, payload) = req.parts_mut();
    let session = TypedSession::from_request(raw_req, payload).await?;

    match session.get_owner_id().map_err(error_500)? {
        Some(owner_id) => {
            req.extensions_mut().insert(OwnerId(owner_id));
            next.call(req).await
        }
        None => {
            let resp = HttpResponse::Unauthorized().json(json!({
                "message": "Authentication required"
            }));
            let err = anyhow::anyhow!("You must be logged in to access this resource.");
            Err(InternalError::from_response(err, resp).into())
        }
    }
}
