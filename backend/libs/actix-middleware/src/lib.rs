//! # Actix Middleware Library
//!
//! Request-scoped middleware shared by VOXILABS actix services
//!
//! ## Modules
//! - `correlation_id`: per-request id, echoed in `x-correlation-id`
//! - `logging`: request/response logging with tracing

pub mod correlation_id;
pub mod logging;

pub use correlation_id::{get_correlation_id, CorrelationId, CorrelationIdMiddleware};
pub use logging::Logging;
