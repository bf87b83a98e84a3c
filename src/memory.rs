//! In-memory [`ClassStore`] for tests and local development.
//!
//! Bearer tokens are taken verbatim as user ids. Every call is counted so
//! tests can assert how often the "remote" side was hit, and failures can be
//! injected globally or per date window.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{ClassRecord, SavedList, SavedReference, UserId};
use crate::month::DateWindow;
use crate::store::{ClassStore, StoreError, StoreResult};

#[derive(Default)]
struct Counters {
    resolve_user: AtomicUsize,
    list_references: AtomicUsize,
    find_reference: AtomicUsize,
    insert_reference: AtomicUsize,
    delete_reference: AtomicUsize,
    delete_all_references: AtomicUsize,
    classes_by_ids: AtomicUsize,
    classes_in_window: AtomicUsize,
}

/// Point-in-time copy of the call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub resolve_user: usize,
    pub list_references: usize,
    pub find_reference: usize,
    pub insert_reference: usize,
    pub delete_reference: usize,
    pub delete_all_references: usize,
    pub classes_by_ids: usize,
    pub classes_in_window: usize,
}

#[derive(Default)]
struct Tables {
    classes: Vec<ClassRecord>,
    references: Vec<(SavedList, SavedReference)>,
    unavailable: bool,
    latency: Option<Duration>,
    failing_windows: Vec<DateWindow>,
    requested_windows: Vec<DateWindow>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    counters: Arc<Counters>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes(classes: Vec<ClassRecord>) -> Self {
        let store = Self::new();
        store.tables().classes = classes;
        store
    }

    /// Loads class records from a JSON array, the same shape the remote
    /// table returns.
    pub fn from_json_file(path: &Path) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| StoreError::Decode(format!("{}: {err}", path.display())))?;
        let classes: Vec<ClassRecord> = serde_json::from_str(&raw)
            .map_err(|err| StoreError::Decode(format!("{}: {err}", path.display())))?;
        Ok(Self::with_classes(classes))
    }

    pub fn remove_class(&self, class_id: &str) {
        self.tables().classes.retain(|c| c.class_id != class_id);
    }

    /// Inserts a reference row directly, bypassing the counters.
    pub fn seed_reference(&self, list: SavedList, user: &UserId, class_id: &str) {
        let row = SavedReference {
            user_id: user.clone(),
            class_id: class_id.to_string(),
            created_at: Utc::now(),
        };
        self.tables().references.push((list, row));
    }

    /// Makes every subsequent call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.tables().unavailable = unavailable;
    }

    /// Delays every class query by `latency`, as a slow remote would.
    pub fn set_latency(&self, latency: Duration) {
        self.tables().latency = Some(latency);
    }

    async fn delay(&self) {
        let latency = self.tables().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Makes class queries for exactly this window fail.
    pub fn fail_window(&self, window: DateWindow) {
        self.tables().failing_windows.push(window);
    }

    /// Windows passed to `classes_by_ids`, in call order.
    pub fn requested_windows(&self) -> Vec<DateWindow> {
        self.tables().requested_windows.clone()
    }

    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            resolve_user: c.resolve_user.load(Ordering::SeqCst),
            list_references: c.list_references.load(Ordering::SeqCst),
            find_reference: c.find_reference.load(Ordering::SeqCst),
            insert_reference: c.insert_reference.load(Ordering::SeqCst),
            delete_reference: c.delete_reference.load(Ordering::SeqCst),
            delete_all_references: c.delete_all_references.load(Ordering::SeqCst),
            classes_by_ids: c.classes_by_ids.load(Ordering::SeqCst),
            classes_in_window: c.classes_in_window.load(Ordering::SeqCst),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(tables: &Tables) -> StoreResult<()> {
        if tables.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl ClassStore for MemoryStore {
    async fn resolve_user(&self, access_token: &str) -> StoreResult<Option<UserId>> {
        bump(&self.counters.resolve_user);
        Self::check_available(&self.tables())?;
        let token = access_token.trim();
        Ok((!token.is_empty()).then(|| UserId::new(token)))
    }

    async fn list_references(
        &self,
        list: SavedList,
        user: &UserId,
    ) -> StoreResult<Vec<SavedReference>> {
        bump(&self.counters.list_references);
        let tables = self.tables();
        Self::check_available(&tables)?;
        Ok(tables
            .references
            .iter()
            .filter(|(l, row)| *l == list && &row.user_id == user)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn find_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>> {
        bump(&self.counters.find_reference);
        let tables = self.tables();
        Self::check_available(&tables)?;
        Ok(tables
            .references
            .iter()
            .find(|(l, row)| *l == list && &row.user_id == user && row.class_id == class_id)
            .map(|(_, row)| row.clone()))
    }

    async fn insert_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<SavedReference> {
        bump(&self.counters.insert_reference);
        let mut tables = self.tables();
        Self::check_available(&tables)?;
        let duplicate = tables
            .references
            .iter()
            .any(|(l, row)| *l == list && &row.user_id == user && row.class_id == class_id);
        if duplicate {
            return Err(StoreError::Status {
                status: 409,
                body: format!("duplicate key in {}", list.table()),
            });
        }
        let row = SavedReference {
            user_id: user.clone(),
            class_id: class_id.to_string(),
            created_at: Utc::now(),
        };
        tables.references.push((list, row.clone()));
        Ok(row)
    }

    async fn delete_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>> {
        bump(&self.counters.delete_reference);
        let mut tables = self.tables();
        Self::check_available(&tables)?;
        let position = tables
            .references
            .iter()
            .position(|(l, row)| *l == list && &row.user_id == user && row.class_id == class_id);
        Ok(position.map(|idx| tables.references.remove(idx).1))
    }

    async fn delete_all_references(&self, list: SavedList, user: &UserId) -> StoreResult<usize> {
        bump(&self.counters.delete_all_references);
        let mut tables = self.tables();
        Self::check_available(&tables)?;
        let before = tables.references.len();
        tables
            .references
            .retain(|(l, row)| !(*l == list && &row.user_id == user));
        Ok(before - tables.references.len())
    }

    async fn classes_by_ids(
        &self,
        class_ids: &[String],
        window: DateWindow,
    ) -> StoreResult<Vec<ClassRecord>> {
        bump(&self.counters.classes_by_ids);
        self.delay().await;
        let mut tables = self.tables();
        tables.requested_windows.push(window);
        Self::check_available(&tables)?;
        if tables.failing_windows.contains(&window) {
            return Err(StoreError::Unavailable(format!(
                "window {}..{} is failing",
                window.start, window.end
            )));
        }
        Ok(tables
            .classes
            .iter()
            .filter(|c| class_ids.contains(&c.class_id) && window.contains(c.date))
            .cloned()
            .collect())
    }

    async fn classes_in_window(&self, window: DateWindow) -> StoreResult<Vec<ClassRecord>> {
        bump(&self.counters.classes_in_window);
        self.delay().await;
        let tables = self.tables();
        Self::check_available(&tables)?;
        if tables.failing_windows.contains(&window) {
            return Err(StoreError::Unavailable(format!(
                "window {}..{} is failing",
                window.start, window.end
            )));
        }
        Ok(tables
            .classes
            .iter()
            .filter(|c| window.contains(c.date))
            .cloned()
            .collect())
    }
}
