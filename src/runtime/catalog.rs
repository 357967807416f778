//! Behaviour catalog and factory system
//!
//! Assets persist behaviours as a `kind` plus a JSON configuration. The catalog
//! maps kinds to factories so a loaded asset can rebuild its prototypes. Hosts
//! register their own kinds on the global catalog (or a local one) before
//! loading assets; loaders work from an immutable snapshot.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::behavior::{Behavior, Countdown, CountdownConfig, SetParameter, SetParameterConfig};
use super::error::{AssetError, AssetResult};

/// Factory building a behaviour from its persisted configuration
pub type BehaviorFactory =
    Arc<dyn Fn(&serde_json::Value) -> AssetResult<Box<dyn Behavior>> + Send + Sync>;

static CATALOG: OnceLock<BehaviorCatalog> = OnceLock::new();

/// Mutable catalog of behaviour kinds
pub struct BehaviorCatalog {
    kinds: RwLock<HashMap<String, BehaviorFactory>>,
}

impl BehaviorCatalog {
    /// Create a catalog holding the built-in kinds
    pub fn new() -> Self {
        let catalog = Self {
            kinds: RwLock::new(HashMap::new()),
        };
        catalog.register_config::<CountdownConfig, _>(Countdown::KIND, Countdown::from_config);
        catalog.register_config::<SetParameterConfig, _>(SetParameter::KIND, SetParameter::from_config);
        catalog
    }

    /// Access the process-wide catalog
    pub fn global() -> &'static Self {
        CATALOG.get_or_init(Self::new)
    }

    /// Register a kind with a factory; an existing kind is replaced
    pub fn register<F>(&self, kind: &str, factory: F)
    where
        F: Fn(&serde_json::Value) -> AssetResult<Box<dyn Behavior>> + Send + Sync + 'static,
    {
        if self.kinds.write().insert(kind.to_string(), Arc::new(factory)).is_some() {
            tracing::debug!(kind, "Replaced behaviour factory");
        }
    }

    /// Register a kind that takes no configuration
    pub fn register_default<T>(&self, kind: &str)
    where
        T: Behavior + Default + Clone,
    {
        self.register(kind, |_config| Ok(Box::new(T::default())));
    }

    /// Register a kind whose configuration deserializes into `C`
    pub fn register_config<C, T>(&self, kind: &str, build: fn(C) -> T)
    where
        C: serde::de::DeserializeOwned + 'static,
        T: Behavior + Clone,
    {
        let owned = kind.to_string();
        self.register(kind, move |config| {
            let parsed = serde_json::from_value::<C>(config.clone()).map_err(|e| AssetError::InvalidBehaviorConfig {
                kind: owned.clone(),
                detail: e.to_string(),
            })?;
            Ok(Box::new(build(parsed)))
        });
    }

    /// Produce an immutable snapshot for loading
    pub fn snapshot(&self) -> BehaviorRegistry {
        BehaviorRegistry {
            kinds: Arc::new(self.kinds.read().clone()),
        }
    }
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of a behaviour catalog
#[derive(Clone)]
pub struct BehaviorRegistry {
    kinds: Arc<HashMap<String, BehaviorFactory>>,
}

impl BehaviorRegistry {
    /// Build a behaviour of the given kind
    pub fn create(&self, kind: &str, config: &serde_json::Value) -> AssetResult<Box<dyn Behavior>> {
        let factory = self
            .kinds
            .get(kind)
            .ok_or_else(|| AssetError::UnknownBehavior(kind.to_string()))?;
        factory(config)
    }

    /// Whether the snapshot knows a kind
    pub fn has_kind(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// All known kinds, sorted
    pub fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.kinds.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
