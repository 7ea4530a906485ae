/// Storage access for the synced key-value store
///
/// Every value lives under one top-level key. Reads that fail to parse are
/// treated as absent, so a corrupted blob degrades to defaults instead of
/// breaking the extension.
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ReminderConfig;
use crate::error::StoreError;
use crate::site_data::{SiteRegistry, TimeSpent};

/// Ordered list of `{domain, enabled}` records.
pub const REGISTRY_KEY: &str = "sites";
/// Map of domain to accumulated seconds.
pub const TIME_SPENT_KEY: &str = "timeSpent";
/// Optional partial overrides of the reminder configuration.
pub const SETTINGS_KEY: &str = "reminderSettings";

/// Minimal async interface of the host's synced storage.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Read and decode the value under `key`.
///
/// `Ok(None)` means nothing is stored; `Err(Malformed)` means something is
/// stored but it has the wrong shape.
pub async fn read_value<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

pub async fn write_value<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore,
    T: Serialize,
{
    let raw = serde_json::to_value(value).map_err(|e| StoreError::Serialize {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, raw).await
}

/// Load the registry, writing the default set on first use.
///
/// The defaults are written only when the stored registry is absent, empty,
/// or malformed. A non-empty registry is returned untouched, so calling this
/// repeatedly performs at most one write.
pub async fn load_or_initialize<S, D>(store: &S, defaults: &[D]) -> Result<SiteRegistry, StoreError>
where
    S: KeyValueStore,
    D: AsRef<str>,
{
    match read_value::<_, SiteRegistry>(store, REGISTRY_KEY).await {
        Ok(Some(registry)) if !registry.is_empty() => return Ok(registry),
        Ok(_) => debug!("No monitored sites stored, writing defaults"),
        Err(StoreError::Malformed { message, .. }) => {
            warn!("Stored site list is malformed ({}), replacing with defaults", message)
        }
        Err(e) => return Err(e),
    }

    let registry = SiteRegistry::with_defaults(defaults);
    save_registry(store, &registry).await?;
    Ok(registry)
}

pub async fn save_registry<S: KeyValueStore>(
    store: &S,
    registry: &SiteRegistry,
) -> Result<(), StoreError> {
    write_value(store, REGISTRY_KEY, registry).await
}

/// Load time-spent counters. Missing or malformed data reads as empty.
pub async fn load_time_spent<S: KeyValueStore>(store: &S) -> Result<TimeSpent, StoreError> {
    match read_value::<_, TimeSpent>(store, TIME_SPENT_KEY).await {
        Ok(time_spent) => Ok(time_spent.unwrap_or_default()),
        Err(StoreError::Malformed { message, .. }) => {
            warn!("Stored time-spent map is malformed ({}), starting over", message);
            Ok(TimeSpent::new())
        }
        Err(e) => Err(e),
    }
}

/// Read-increment-write of one domain's counter.
///
/// Not transactional: a concurrent writer between the read and the write
/// loses its update (last writer wins).
pub async fn add_time_spent<S: KeyValueStore>(
    store: &S,
    domain: &str,
    secs: u64,
) -> Result<TimeSpent, StoreError> {
    let mut time_spent = load_time_spent(store).await?;
    time_spent.add(domain, secs);
    write_value(store, TIME_SPENT_KEY, &time_spent).await?;
    Ok(time_spent)
}

pub async fn reset_time_spent<S: KeyValueStore>(store: &S) -> Result<(), StoreError> {
    write_value(store, TIME_SPENT_KEY, &TimeSpent::new()).await
}

/// Load the reminder configuration, falling back to defaults on any problem.
pub async fn load_config<S: KeyValueStore>(store: &S) -> ReminderConfig {
    match read_value::<_, ReminderConfig>(store, SETTINGS_KEY).await {
        Ok(Some(config)) => config.validated(),
        Ok(None) => ReminderConfig::default(),
        Err(e) => {
            warn!("Using default reminder settings: {}", e);
            ReminderConfig::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use serde_json::Value;

    use super::KeyValueStore;
    use crate::error::StoreError;

    /// In-process store for tests. Counts writes and can be switched offline.
    #[derive(Default)]
    pub struct MemoryStore {
        values: RefCell<HashMap<String, Value>>,
        writes: Cell<usize>,
        offline: Cell<bool>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_value(key: &str, value: Value) -> Self {
            let store = Self::new();
            store.values.borrow_mut().insert(key.to_string(), value);
            store
        }

        pub fn writes(&self) -> usize {
            self.writes.get()
        }

        pub fn raw(&self, key: &str) -> Option<Value> {
            self.values.borrow().get(key).cloned()
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.set(offline);
        }
    }

    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            if self.offline.get() {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            Ok(self.values.borrow().get(key).cloned())
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
            if self.offline.get() {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            self.writes.set(self.writes.get() + 1);
            self.values.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use serde_json::json;

    use super::memory::MemoryStore;
    use super::*;
    use crate::domain::{MatchOutcome, MatchPolicy, check_site};
    use crate::site_data::{DEFAULT_SITES, SiteEntry};

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = MemoryStore::new();

        let first = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();
        let second = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();

        assert_eq!(store.writes(), 1);
        assert_eq!(first, second);
        assert_eq!(first.len(), DEFAULT_SITES.len());
        assert!(first.entries().iter().all(|entry| entry.enabled));
    }

    #[tokio::test]
    async fn test_bootstrap_on_empty_array() {
        let store = MemoryStore::with_value(REGISTRY_KEY, json!([]));

        let registry = load_or_initialize(&store, &["youtube.com"]).await.unwrap();

        assert_eq!(store.writes(), 1);
        assert_eq!(registry.entries(), &[SiteEntry::new("youtube.com", true)]);
        assert_eq!(
            store.raw(REGISTRY_KEY),
            Some(json!([{"domain": "youtube.com", "enabled": true}]))
        );
    }

    #[tokio::test]
    async fn test_bootstrap_replaces_malformed_data() {
        let store = MemoryStore::with_value(REGISTRY_KEY, json!({"not": "a list"}));

        let registry = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();

        assert_eq!(store.writes(), 1);
        assert_eq!(registry.len(), DEFAULT_SITES.len());
    }

    #[tokio::test]
    async fn test_existing_registry_not_overwritten() {
        let store = MemoryStore::with_value(
            REGISTRY_KEY,
            json!([{"domain": "reddit.com", "enabled": false}]),
        );

        let registry = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();

        assert_eq!(store.writes(), 0);
        assert_eq!(registry.entries(), &[SiteEntry::new("reddit.com", false)]);
    }

    #[tokio::test]
    async fn test_bootstrap_propagates_unavailable() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let result = load_or_initialize(&store, DEFAULT_SITES).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_toggle_and_remove_scenario() {
        let store = MemoryStore::with_value(
            REGISTRY_KEY,
            json!([{"domain": "youtube.com", "enabled": true}]),
        );
        let page = "www.youtube.com";

        let registry = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();
        assert_eq!(check_site(&registry, page, MatchPolicy::Exact), MatchOutcome::Monitored);

        let mut registry = registry;
        registry.set_enabled("youtube.com", false);
        save_registry(&store, &registry).await.unwrap();
        let registry = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();
        assert_eq!(check_site(&registry, page, MatchPolicy::Exact), MatchOutcome::Suppressed);

        let mut registry = registry;
        registry.remove("youtube.com");
        registry.add("reddit.com");
        save_registry(&store, &registry).await.unwrap();
        let writes = store.writes();
        let registry = load_or_initialize(&store, DEFAULT_SITES).await.unwrap();
        assert_eq!(check_site(&registry, page, MatchPolicy::Exact), MatchOutcome::NotMonitored);
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_add_time_spent() {
        let store = MemoryStore::new();

        add_time_spent(&store, "youtube.com", 1).await.unwrap();
        add_time_spent(&store, "www.youtube.com", 2).await.unwrap();
        let time_spent = load_time_spent(&store).await.unwrap();

        assert_eq!(time_spent.get("youtube.com"), 3);
        assert_eq!(store.raw(TIME_SPENT_KEY), Some(json!({"youtube.com": 3})));
    }

    #[tokio::test]
    async fn test_malformed_time_spent_reads_empty() {
        let store = MemoryStore::with_value(TIME_SPENT_KEY, json!(["oops"]));

        let time_spent = load_time_spent(&store).await.unwrap();

        assert!(time_spent.is_empty());
    }

    #[tokio::test]
    async fn test_reset_time_spent() {
        let store = MemoryStore::with_value(TIME_SPENT_KEY, json!({"youtube.com": 500, "x.com": 7}));

        reset_time_spent(&store).await.unwrap();

        assert_eq!(store.raw(TIME_SPENT_KEY), Some(json!({})));
        assert!(load_time_spent(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_config_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_config(&store).await, ReminderConfig::default());

        let store = MemoryStore::with_value(SETTINGS_KEY, json!("garbage"));
        assert_eq!(load_config(&store).await, ReminderConfig::default());
    }

    #[tokio::test]
    async fn test_load_config_overrides() {
        let store = MemoryStore::with_value(
            SETTINGS_KEY,
            json!({"allowSkip": false, "waitOptions": [30, 0, 10, 30]}),
        );

        let config = load_config(&store).await;

        assert!(!config.allow_skip);
        assert_eq!(config.wait_options, vec![10, 30]);
        assert!(config.track_time);
    }
}
