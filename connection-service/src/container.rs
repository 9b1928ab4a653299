//! Binding container.
//!
//! Maps string keys to values or to providers that are invoked on every
//! lookup. Bindings carry tags so consumers can query a whole category
//! (e.g. every connection) without knowing the keys in advance.

use std::any::{type_name, Any};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use common::errors::{AppError, AppResult};

/// Type-erased bound value.
pub type BoundValue = Arc<dyn Any + Send + Sync>;

type Provider = Arc<dyn Fn() -> Option<BoundValue> + Send + Sync>;

/// A keyed, tagged entry in the [`Container`].
#[derive(Clone)]
pub struct Binding {
    key: String,
    tags: BTreeSet<String>,
    provider: Provider,
}

impl Binding {
    /// Binds a fixed value.
    pub fn constant<T: Any + Send + Sync>(key: impl Into<String>, value: Arc<T>) -> Self {
        let value: BoundValue = value;
        Self {
            key: key.into(),
            tags: BTreeSet::new(),
            provider: Arc::new(move || Some(Arc::clone(&value))),
        }
    }

    /// Binds a provider that is re-run on every resolve. The provider may
    /// yield nothing, in which case resolving fails with `BindingNotFound`.
    pub fn dynamic<T, F>(key: impl Into<String>, provider: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Option<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            tags: BTreeSet::new(),
            provider: Arc::new(move || provider().map(|v| v as BoundValue)),
        }
    }

    /// Adds a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Runs the provider.
    pub fn resolve(&self) -> Option<BoundValue> {
        (self.provider)()
    }

    /// Runs the provider and downcasts the result.
    pub fn value<T: Any + Send + Sync>(&self) -> AppResult<Arc<T>> {
        let value = self
            .resolve()
            .ok_or_else(|| AppError::BindingNotFound(self.key.clone()))?;
        value.downcast::<T>().map_err(|_| {
            AppError::Internal(format!(
                "binding '{}' does not hold a {}",
                self.key,
                type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Registry of bindings owned by the application.
#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<String, Binding>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container seeded with one binding.
    pub fn with_binding(binding: Binding) -> Self {
        let bindings = HashMap::from([(binding.key.clone(), binding)]);
        Self {
            bindings: RwLock::new(bindings),
        }
    }

    /// Adds a binding.
    ///
    /// # Errors
    /// `DuplicateBinding` if the key is already bound.
    pub fn add(&self, binding: Binding) -> AppResult<()> {
        let mut bindings = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if bindings.contains_key(binding.key()) {
            return Err(AppError::DuplicateBinding(binding.key().to_string()));
        }
        tracing::debug!(key = %binding.key, tags = ?binding.tags, "binding added");
        bindings.insert(binding.key.clone(), binding);
        Ok(())
    }

    /// Resolves the binding under `key` as a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> AppResult<Arc<T>> {
        self.find(key)
            .ok_or_else(|| AppError::BindingNotFound(key.to_string()))?
            .value::<T>()
    }

    /// The binding under `key`, if any.
    pub fn find(&self, key: &str) -> Option<Binding> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Bindings carrying `tag`, sorted by key.
    pub fn find_by_tag(&self, tag: &str) -> Vec<Binding> {
        let mut found: Vec<Binding> = self
            .read()
            .values()
            .filter(|b| b.has_tag(tag))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found
    }

    /// All bound keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Binding>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }
}
