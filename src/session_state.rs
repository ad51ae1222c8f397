use std::future::ready;
use std::future::Ready;

use actix_session::Session;
use actix_session::SessionExt;
use actix_session::SessionGetError;
use actix_session::SessionInsertError;
use actix_web::FromRequest;
use uuid::Uuid;

/// Typed view over `actix_session::Session`. The session is written by the
/// login flow (outside this crate); we only read the account id back.
pub struct TypedSession(Session);

impl TypedSession {
    /// Key shared with the login flow
    const USER_ID_KEY: &'static str = "user_id";

    pub fn renew(&self) { self.0.renew(); }

    pub fn insert_owner_id(
        &self,
        owner_id: Uuid,
    ) -> Result<(), SessionInsertError> {
        self.0.insert(Self::USER_ID_KEY, owner_id)
    }

    pub fn get_owner_id(&self) -> Result<Option<Uuid>, SessionGetError> { self.0.get(Self::USER_ID_KEY) }
}

impl FromRequest for TypedSession {
    // same error as `Session`'s own extractor
    type Error = <Session as FromRequest>::Error;

    // no I/O needed, so the future is immediately ready
    type Future = Ready<Result<TypedSession, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        ready(Ok(TypedSession(req.get_session())))
    }
}
