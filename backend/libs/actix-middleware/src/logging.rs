//! Per-request tracing
//!
//! Every request runs inside an `http_request` span carrying the method, path
//! and correlation id, and ends with one summary event. Register it inside
//! [`crate::CorrelationIdMiddleware`] (i.e. `.wrap(Logging)` first) so the id
//! is already resolved. Health probes are logged at debug level.

use crate::correlation_id::CorrelationId;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;
use tracing::Instrument;

const QUIET_PATHS: &[&str] = &["/health"];

#[derive(Clone, Default)]
pub struct Logging;

impl<S, B> Transform<S, ServiceRequest> for Logging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggingService { service }))
    }
}

pub struct LoggingService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for LoggingService<S>
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
        let start = Instant::now();
        let quiet = QUIET_PATHS.contains(&req.path());
        let request_id = req
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        let span = tracing::info_span!(
            "http_request",
            method = %req.method(),
            path = %req.path(),
            request_id = %request_id,
        );

        let fut = span.in_scope(|| self.service.call(req));

        Box::pin(
            async move {
                let res = fut.await;
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let status = match &res {
                    Ok(res) => res.status(),
                    Err(e) => e.as_response_error().status_code(),
                };
                log_outcome(status, elapsed_ms, quiet);
                res
            }
            .instrument(span),
        )
    }
}

fn log_outcome(status: StatusCode, elapsed_ms: u64, quiet: bool) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::warn!(status = code, duration_ms = elapsed_ms, "HTTP request failed");
    } else if quiet {
        tracing::debug!(status = code, duration_ms = elapsed_ms, "HTTP request completed");
    } else {
        tracing::info!(status = code, duration_ms = elapsed_ms, "HTTP request completed");
    }
}
