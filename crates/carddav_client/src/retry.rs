//! Bounded retry for attempts that can collide with existing resources
//!
//! Only a reported conflict is retried. Any other error ends the loop at
//! once so unrelated failures are never mistaken for collisions.
//!
//! # Example
//!
//! ```rust,ignore
//! let card = retry_on_conflict(MAX_CREATE_ATTEMPTS, |attempt| async move {
//!     client.try_put_new(card, attempt).await
//! })
//! .await?;
//! ```

use std::future::Future;

use tracing::warn;

use crate::error::CardDavError;

/// Outcome of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Done(T),
    /// The target was already taken; carries the server's reason.
    Conflict(String),
}

/// Run `attempt` up to `max_attempts` times, retrying only on
/// [`Attempt::Conflict`].
///
/// # Errors
///
/// Propagates the first non-conflict error unchanged. Returns
/// [`CardDavError::UploadFailed`] with the last conflict reason once every
/// attempt has conflicted.
pub async fn retry_on_conflict<T, F, Fut>(
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, CardDavError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, CardDavError>>,
{
    let mut last_reason = String::from("no attempt made");

    for n in 1..=max_attempts {
        match attempt(n).await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Conflict(reason) => {
                warn!(
                    attempt = n,
                    max_attempts,
                    reason = %reason,
                    "Attempt conflicted with an existing resource"
                );
                last_reason = reason;
            },
        }
    }

    Err(CardDavError::UploadFailed {
        attempts: max_attempts,
        reason: last_reason,
    })
}
