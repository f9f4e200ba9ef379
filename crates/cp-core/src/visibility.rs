//! Visibility flags: named boolean gates over login paths and dashboards.
//!
//! The service keeps an in-memory cache in front of a `VisibilityStore` so
//! the hot path (`is_enabled` during login) stays synchronous, while admin
//! updates write through to the store.

use crate::auth::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Gates the student login path.
pub const STUDENT_LOGIN: &str = "studentLogin";
/// Gates the faculty login path.
pub const FACULTY_LOGIN: &str = "facultyLogin";
/// Gates the faculty analytics dashboard.
pub const FACULTY_DASHBOARD: &str = "facultyDashboard";
/// Gates the guest login path and guest registration.
pub const GUEST_LOGIN: &str = "guestLogin";

/// The flags seeded at first startup, all enabled.
pub const DEFAULT_FLAG_NAMES: [&str; 4] =
    [STUDENT_LOGIN, FACULTY_LOGIN, FACULTY_DASHBOARD, GUEST_LOGIN];

/// The flag that must be enabled for a role to log in, if any.
///
/// Coordinators and admins are never gated; locking out the people who flip
/// the flags would be unrecoverable.
pub fn login_flag_for_role(role: Role) -> Option<&'static str> {
    match role {
        Role::Student => Some(STUDENT_LOGIN),
        Role::Faculty => Some(FACULTY_LOGIN),
        Role::Guest => Some(GUEST_LOGIN),
        Role::Admin | Role::Coordinator => None,
    }
}

/// A named boolean gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisibilityFlag {
    /// Flag name, e.g. `studentLogin`.
    pub name: String,
    /// Whether the gated surface is reachable.
    pub enabled: bool,
    /// Last change time.
    pub updated_at: DateTime<Utc>,
}

impl VisibilityFlag {
    /// Creates a flag with the current timestamp.
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_string(),
            enabled,
            updated_at: Utc::now(),
        }
    }
}

/// Errors from visibility flag storage.
#[derive(Debug, thiserror::Error)]
pub enum VisibilityError {
    #[error("Visibility flag not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Persistence interface for visibility flags.
#[async_trait::async_trait]
pub trait VisibilityStore: Send + Sync {
    /// Lists all flags.
    async fn list(&self) -> Result<Vec<VisibilityFlag>, VisibilityError>;

    /// Gets a flag by name.
    async fn get(&self, name: &str) -> Result<Option<VisibilityFlag>, VisibilityError>;

    /// Creates or updates a flag.
    async fn upsert(&self, flag: &VisibilityFlag) -> Result<(), VisibilityError>;
}

/// Visibility flag service with in-memory caching.
///
/// `is_enabled` is synchronous and non-blocking, suitable for the login hot
/// path. The cache is refreshed from the store at startup and kept in sync
/// by `set_enabled`.
pub struct VisibilityFlags {
    cache: Arc<RwLock<HashMap<String, VisibilityFlag>>>,
    store: Arc<dyn VisibilityStore>,
}

impl VisibilityFlags {
    /// Creates the service with an empty cache.
    pub fn new(store: Arc<dyn VisibilityStore>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            store,
        }
    }

    /// Creates the service with a pre-populated cache.
    pub fn with_flags(store: Arc<dyn VisibilityStore>, flags: Vec<VisibilityFlag>) -> Self {
        let cache: HashMap<String, VisibilityFlag> =
            flags.into_iter().map(|f| (f.name.clone(), f)).collect();
        Self {
            cache: Arc::new(RwLock::new(cache)),
            store,
        }
    }

    /// Checks whether a flag is enabled.
    ///
    /// Unknown flags default to **enabled**: a missing row must never lock a
    /// login path shut.
    pub fn is_enabled(&self, name: &str) -> bool {
        // try_read keeps the hot path non-blocking; contention falls back to
        // a blocking read, which is rare in practice.
        let cache_guard = match self.cache.try_read() {
            Ok(guard) => guard,
            Err(_) => futures::executor::block_on(self.cache.read()),
        };

        match cache_guard.get(name) {
            Some(flag) => flag.enabled,
            None => true,
        }
    }

    /// Reloads the cache from the backing store.
    pub async fn refresh(&self) -> Result<(), VisibilityError> {
        let flags = self.store.list().await?;

        let mut cache = self.cache.write().await;
        cache.clear();
        for flag in flags {
            cache.insert(flag.name.clone(), flag);
        }

        Ok(())
    }

    /// Gets a copy of a flag from the cache.
    pub async fn get(&self, name: &str) -> Option<VisibilityFlag> {
        let cache = self.cache.read().await;
        cache.get(name).cloned()
    }

    /// All cached flags, sorted by name for stable listings.
    pub async fn list(&self) -> Vec<VisibilityFlag> {
        let cache = self.cache.read().await;
        let mut flags: Vec<VisibilityFlag> = cache.values().cloned().collect();
        flags.sort_by(|a, b| a.name.cmp(&b.name));
        flags
    }

    /// Sets a flag, writing the store first and then the cache.
    ///
    /// Unknown names are created on the spot.
    pub async fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<VisibilityFlag, VisibilityError> {
        let flag = VisibilityFlag::new(name, enabled);
        self.store.upsert(&flag).await?;

        let mut cache = self.cache.write().await;
        cache.insert(flag.name.clone(), flag.clone());

        Ok(flag)
    }
}

/// In-memory implementation of `VisibilityStore` for tests.
#[derive(Default)]
pub struct InMemoryVisibilityStore {
    flags: RwLock<HashMap<String, VisibilityFlag>>,
}

impl InMemoryVisibilityStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-populated flags.
    pub fn with_flags(flags: Vec<VisibilityFlag>) -> Self {
        let map: HashMap<String, VisibilityFlag> =
            flags.into_iter().map(|f| (f.name.clone(), f)).collect();
        Self {
            flags: RwLock::new(map),
        }
    }
}

#[async_trait::async_trait]
impl VisibilityStore for InMemoryVisibilityStore {
    async fn list(&self) -> Result<Vec<VisibilityFlag>, VisibilityError> {
        let flags = self.flags.read().await;
        Ok(flags.values().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<Option<VisibilityFlag>, VisibilityError> {
        let flags = self.flags.read().await;
        Ok(flags.get(name).cloned())
    }

    async fn upsert(&self, flag: &VisibilityFlag) -> Result<(), VisibilityError> {
        let mut flags = self.flags.write().await;
        flags.insert(flag.name.clone(), flag.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(flags: Vec<VisibilityFlag>) -> Arc<dyn VisibilityStore> {
        Arc::new(InMemoryVisibilityStore::with_flags(flags))
    }

    fn make_empty_store() -> Arc<dyn VisibilityStore> {
        Arc::new(InMemoryVisibilityStore::new())
    }

    #[test]
    fn test_unknown_flag_defaults_enabled() {
        let flags = VisibilityFlags::new(make_empty_store());
        assert!(flags.is_enabled("somethingNew"));
        assert!(flags.is_enabled(STUDENT_LOGIN));
    }

    #[test]
    fn test_disabled_flag() {
        let flags = VisibilityFlags::with_flags(
            make_empty_store(),
            vec![
                VisibilityFlag::new(STUDENT_LOGIN, false),
                VisibilityFlag::new(FACULTY_LOGIN, true),
            ],
        );
        assert!(!flags.is_enabled(STUDENT_LOGIN));
        assert!(flags.is_enabled(FACULTY_LOGIN));
    }

    #[test]
    fn test_login_flag_for_role() {
        assert_eq!(login_flag_for_role(Role::Student), Some(STUDENT_LOGIN));
        assert_eq!(login_flag_for_role(Role::Faculty), Some(FACULTY_LOGIN));
        assert_eq!(login_flag_for_role(Role::Guest), Some(GUEST_LOGIN));
        assert_eq!(login_flag_for_role(Role::Coordinator), None);
        assert_eq!(login_flag_for_role(Role::Admin), None);
    }

    #[tokio::test]
    async fn test_refresh_from_store() {
        let store = make_store(vec![VisibilityFlag::new(GUEST_LOGIN, false)]);
        let flags = VisibilityFlags::new(Arc::clone(&store));

        // Before refresh the cache is empty, so the permissive default wins.
        assert!(flags.is_enabled(GUEST_LOGIN));

        flags.refresh().await.unwrap();
        assert!(!flags.is_enabled(GUEST_LOGIN));
    }

    #[tokio::test]
    async fn test_set_enabled_writes_through() {
        let store = make_empty_store();
        let flags = VisibilityFlags::new(Arc::clone(&store));

        let flag = flags.set_enabled(FACULTY_DASHBOARD, false).await.unwrap();
        assert_eq!(flag.name, FACULTY_DASHBOARD);
        assert!(!flag.enabled);

        // Visible in the cache immediately.
        assert!(!flags.is_enabled(FACULTY_DASHBOARD));

        // And persisted in the store.
        let stored = store.get(FACULTY_DASHBOARD).await.unwrap();
        assert!(stored.is_some());
        assert!(!stored.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let flags = VisibilityFlags::with_flags(
            make_empty_store(),
            DEFAULT_FLAG_NAMES
                .iter()
                .map(|name| VisibilityFlag::new(name, true))
                .collect(),
        );

        let all = flags.list().await;
        assert_eq!(all.len(), 4);
        let names: Vec<&str> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![FACULTY_DASHBOARD, FACULTY_LOGIN, GUEST_LOGIN, STUDENT_LOGIN]
        );
    }

    #[test]
    fn test_in_memory_store() {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let store = InMemoryVisibilityStore::new();

            let list = store.list().await.unwrap();
            assert!(list.is_empty());

            let flag = VisibilityFlag::new(STUDENT_LOGIN, true);
            store.upsert(&flag).await.unwrap();

            let retrieved = store.get(STUDENT_LOGIN).await.unwrap();
            assert!(retrieved.is_some());
            assert!(retrieved.unwrap().enabled);

            // Upsert flips in place.
            store
                .upsert(&VisibilityFlag::new(STUDENT_LOGIN, false))
                .await
                .unwrap();
            let list = store.list().await.unwrap();
            assert_eq!(list.len(), 1);
            assert!(!list[0].enabled);
        });
    }
}
