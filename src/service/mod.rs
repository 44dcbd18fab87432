//! Mutation path: match creation, update and deletion, plus the rating
//! engine applied after completed matches.
//!
//! Unlike the read-aggregation paths, these operations are
//! identity-critical: validation failures and store errors propagate to
//! the caller. Successful mutations emit best-effort cache invalidation
//! events for the affected category.

pub mod matches;
pub mod rating;

pub use matches::*;
pub use rating::*;

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the mutation path.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A non-deleted match with this match number already exists.
    #[error("match with number {0} already exists")]
    DuplicateMatchNumber(i64),

    #[error("invalid match data: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
