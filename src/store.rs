//! Seam between the calendar logic and the hosted row store.
//!
//! The production implementation talks to PostgREST (`crate::supabase`); the
//! in-memory one (`crate::memory`) backs tests and local development.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ClassRecord, SavedList, SavedReference, UserId};
use crate::month::DateWindow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote tables used by the calendar: class listings, per-user schedule and
/// bookmark references, plus the auth provider's identity lookup.
#[async_trait]
pub trait ClassStore: Send + Sync {
    /// Resolves an access token to its user. `Ok(None)` when the token is
    /// not (or no longer) valid.
    async fn resolve_user(&self, access_token: &str) -> StoreResult<Option<UserId>>;

    /// All reference rows of `list` owned by `user`, without any date filter.
    async fn list_references(
        &self,
        list: SavedList,
        user: &UserId,
    ) -> StoreResult<Vec<SavedReference>>;

    async fn find_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>>;

    async fn insert_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<SavedReference>;

    /// Deletes the row and returns it, or `None` if there was nothing to delete.
    async fn delete_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>>;

    /// Deletes every row of `list` owned by `user` and returns how many went.
    async fn delete_all_references(&self, list: SavedList, user: &UserId) -> StoreResult<usize>;

    /// Class records whose id is in `class_ids` and whose date is in `window`.
    /// The date predicate is evaluated by the store.
    async fn classes_by_ids(
        &self,
        class_ids: &[String],
        window: DateWindow,
    ) -> StoreResult<Vec<ClassRecord>>;

    /// Every class listed within `window`.
    async fn classes_in_window(&self, window: DateWindow) -> StoreResult<Vec<ClassRecord>>;
}
