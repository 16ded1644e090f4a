//! Request identity extractors.
//!
//! The authentication middleware stores the resolved caller in the request
//! extensions. Handlers read it back through [`AuthenticatedIdentity`] when a
//! caller is mandatory, or [`MaybeIdentity`] when anonymous access is fine.

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::domain::auth::AuthError;
use crate::domain::{Error, Identity};

/// Extension value inserted by the authentication middleware.
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Identity);

fn stored_identity(req: &HttpRequest) -> Option<Identity> {
    req.extensions()
        .get::<RequestIdentity>()
        .map(|stored| stored.0.clone())
}

/// The caller's identity; rejects anonymous requests with `token_missing`.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity(pub Identity);

impl FromRequest for AuthenticatedIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            stored_identity(req)
                .map(Self)
                .ok_or_else(|| Error::from(AuthError::Missing)),
        )
    }
}

/// The caller's identity when one was presented.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl FromRequest for MaybeIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self(stored_identity(req))))
    }
}
