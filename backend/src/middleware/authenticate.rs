//! Bearer authentication middleware.
//!
//! Verifies the `Authorization` header of every request and resolves the
//! identity behind it before any handler runs. A request without the header
//! continues anonymously; a request whose token fails verification or whose
//! identity cannot be resolved is answered with the mapped error and never
//! reaches the handler.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, HttpMessage};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::info;

use crate::domain::Authenticator;
use crate::inbound::http::auth::RequestIdentity;

/// Middleware factory wrapping an [`Authenticator`].
#[derive(Clone)]
pub struct Authenticate {
    authenticator: Authenticator,
}

impl Authenticate {
    /// Wrap routes so bearer tokens resolve through `authenticator`.
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticateMiddleware {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
        }))
    }
}

/// Service wrapper produced by [`Authenticate`].
pub struct AuthenticateMiddleware<S> {
    service: Rc<S>,
    authenticator: Authenticator,
}

impl<S, B> Service<ServiceRequest> for AuthenticateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authenticator = self.authenticator.clone();
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        Box::pin(async move {
            match authenticator.authenticate(header.as_deref()).await {
                Ok(identity) => {
                    if let Some(identity) = identity {
                        req.extensions_mut().insert(RequestIdentity(identity));
                    }
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(error) => {
                    info!(
                        path = req.path(),
                        error = %error,
                        "request rejected by authentication"
                    );
                    let domain_error = crate::domain::Error::from(error);
                    Ok(req.error_response(domain_error).map_into_right_body())
                }
            }
        })
    }
}
