use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::cache::MonthCache;
use crate::models::{SavedList, SavedReference, UserId};
use crate::store::{ClassStore, StoreError};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("class {class_id} is already in {list}")]
    AlreadySaved { list: SavedList, class_id: String },
    #[error("class {class_id} is not in {list}")]
    NotSaved { list: SavedList, class_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rows removed when an account's data is wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccountCleanup {
    pub schedule_removed: usize,
    pub bookmarks_removed: usize,
}

/// Schedule and bookmark mutations. Anything that changes the schedule
/// drops the user's cached calendar months.
#[derive(Clone)]
pub struct SavedClasses {
    store: Arc<dyn ClassStore>,
    cache: MonthCache,
}

impl SavedClasses {
    pub fn new(cache: MonthCache) -> Self {
        Self {
            store: cache.store().clone(),
            cache,
        }
    }

    pub async fn save(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> Result<SavedReference, SaveError> {
        if self.store.find_reference(list, user, class_id).await?.is_some() {
            return Err(SaveError::AlreadySaved {
                list,
                class_id: class_id.to_string(),
            });
        }
        let reference = self.store.insert_reference(list, user, class_id).await?;
        if list == SavedList::Schedule {
            self.cache.invalidate_user(user);
        }
        info!(%user, %list, class_id, "class saved");
        Ok(reference)
    }

    pub async fn remove(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> Result<SavedReference, SaveError> {
        let removed = self.store.delete_reference(list, user, class_id).await?;
        let Some(reference) = removed else {
            return Err(SaveError::NotSaved {
                list,
                class_id: class_id.to_string(),
            });
        };
        if list == SavedList::Schedule {
            self.cache.invalidate_user(user);
        }
        info!(%user, %list, class_id, "class removed");
        Ok(reference)
    }

    /// Deletes every schedule and bookmark row of `user`. Both lists are
    /// attempted even if the first fails; the first failure is returned.
    pub async fn delete_account_data(&self, user: &UserId) -> Result<AccountCleanup, SaveError> {
        let schedule = self
            .store
            .delete_all_references(SavedList::Schedule, user)
            .await;
        let bookmarks = self
            .store
            .delete_all_references(SavedList::Bookmarks, user)
            .await;
        self.cache.invalidate_user(user);

        let outcomes = [
            (SavedList::Schedule, &schedule),
            (SavedList::Bookmarks, &bookmarks),
        ];
        for (list, result) in outcomes {
            if let Err(err) = result {
                warn!(%user, %list, error = %err, "could not delete saved classes");
            }
        }
        let cleanup = AccountCleanup {
            schedule_removed: schedule?,
            bookmarks_removed: bookmarks?,
        };
        info!(
            %user,
            schedule = cleanup.schedule_removed,
            bookmarks = cleanup.bookmarks_removed,
            "account data deleted"
        );
        Ok(cleanup)
    }

    pub async fn saved_class_ids(
        &self,
        list: SavedList,
        user: &UserId,
    ) -> Result<Vec<String>, SaveError> {
        let rows = self.store.list_references(list, user).await?;
        Ok(rows.into_iter().map(|r| r.class_id).collect())
    }

    pub fn cache(&self) -> &MonthCache {
        &self.cache
    }
}
