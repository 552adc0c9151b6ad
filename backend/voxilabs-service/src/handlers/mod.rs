pub mod auth;
pub mod dashboard;
pub mod health;
pub mod oauth;
pub mod videos;

use crate::error::Result;
use validator::Validate;

/// Run derive validation on a request body at the handler boundary.
pub(crate) fn validated<T: Validate>(body: T) -> Result<T> {
    body.validate()?;
    Ok(body)
}
