//! Author identity, as asserted by the authenticating proxy in front of us.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use rf_core::error::AppError;

use crate::error::WebError;

/// Header carrying the authenticated user name.
pub const REMOTE_USER_HEADER: &str = "X-Remote-User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author(pub String);

impl FromRequest for Author {
    type Error = WebError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let name = req
            .headers()
            .get(REMOTE_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        ready(match name {
            Some(name) => Ok(Author(name.to_string())),
            None => Err(WebError(AppError::Unauthorized("login required".into()))),
        })
    }
}

/// `None` becomes the same 401 the extractor would give.
pub fn require(author: Option<Author>) -> Result<Author, WebError> {
    author.ok_or_else(|| WebError(AppError::Unauthorized("login required".into())))
}

/// Client address from the connection peer.
pub fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}
