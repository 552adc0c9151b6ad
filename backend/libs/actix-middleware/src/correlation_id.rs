//! `x-correlation-id` propagation
//!
//! A caller-supplied id is kept when it is printable and at most 128 bytes;
//! anything else is replaced with a fresh UUID. The id is stored in request
//! extensions as [`CorrelationId`] and echoed on the response.
//!
//! ```rust
//! use actix_middleware::CorrelationIdMiddleware;
//! use actix_web::App;
//!
//! let app = App::new().wrap(CorrelationIdMiddleware);
//! ```

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, HeaderName, HeaderValue},
    Error, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

const MAX_INBOUND_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Inbound id when usable, otherwise a new UUID v4
    pub fn resolve(headers: &HeaderMap) -> Self {
        let inbound = headers
            .get(&CORRELATION_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= MAX_INBOUND_LEN);

        match inbound {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Default)]
pub struct CorrelationIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for CorrelationIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationIdService { service }))
    }
}

pub struct CorrelationIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CorrelationIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let id = CorrelationId::resolve(req.headers());
        let echoed = HeaderValue::from_str(id.as_str()).ok();
        req.extensions_mut().insert(id);

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            if let Some(value) = echoed {
                res.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(res)
        })
    }
}

/// Correlation id of a request that went through [`CorrelationIdMiddleware`]
pub fn get_correlation_id(req: &HttpRequest) -> Option<String> {
    req.extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
}
