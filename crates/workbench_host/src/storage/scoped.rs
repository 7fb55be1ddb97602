//! Scoped key-value storage contracts and adapters.
//!
//! Every read is a round-trip to the backing store; adapters keep no read cache so a workspace
//! switch can never observe another partition's values.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    future::Future,
    marker::PhantomData,
    pin::Pin,
    rc::Rc,
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{validate_key, StoreError};
use crate::scope::{ScopePartition, StoreScope, WorkspaceId};
use crate::time::WriteSequence;

/// Object-safe boxed future used by [`ScopedValueStore`] async methods.
pub type ScopedStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Backend service mapping `(scope, key)` pairs to JSON values.
///
/// Writes carry a [`WriteSequence`] taken when the write is issued. Implementations must apply
/// same-key writes in sequence order (last issued wins) regardless of the order in which the
/// returned futures are polled.
pub trait ScopedValueStore<S: StoreScope> {
    /// Loads the value stored under `key` in `scope`.
    fn get_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>>;

    /// Loads several keys from `scope` in one round-trip, preserving the order of `keys`.
    fn batch_get_value<'a>(
        &'a self,
        scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>>;

    /// Stores `value` under `key` with an explicit issue stamp.
    fn write_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
        value: Value,
        sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>>;

    /// Removes `key` with an explicit issue stamp and returns the removed value.
    fn delete_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
        sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>>;

    /// Stores several values in one round-trip. Either every item is applied or none is.
    fn batch_update_value<'a>(
        &'a self,
        scope: &'a S,
        items: Vec<(String, Value)>,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>>;

    /// Removes several keys in one round-trip and returns the removed values.
    fn batch_remove_value<'a>(
        &'a self,
        scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>>;

    /// Lists every value stored in `scope`, sorted by key.
    fn list_values<'a>(
        &'a self,
        scope: &'a S,
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Value)>, StoreError>>;

    /// Stores `value` under `key`, stamping the write now.
    fn update_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
        value: Value,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>> {
        self.write_value(scope, key, value, WriteSequence::next())
    }

    /// Removes `key`, stamping the write now.
    fn remove_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>> {
        self.delete_value(scope, key, WriteSequence::next())
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op scoped store for unsupported targets and baseline tests.
pub struct NoopScopedStore;

impl<S: StoreScope> ScopedValueStore<S> for NoopScopedStore {
    fn get_value<'a>(
        &'a self,
        _scope: &'a S,
        _key: &'a str,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async { Ok(None) })
    }

    fn batch_get_value<'a>(
        &'a self,
        _scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>> {
        Box::pin(async move { Ok(keys.iter().map(|key| (key.to_string(), None)).collect()) })
    }

    fn write_value<'a>(
        &'a self,
        _scope: &'a S,
        _key: &'a str,
        _value: Value,
        _sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_value<'a>(
        &'a self,
        _scope: &'a S,
        _key: &'a str,
        _sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async { Ok(None) })
    }

    fn batch_update_value<'a>(
        &'a self,
        _scope: &'a S,
        _items: Vec<(String, Value)>,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }

    fn batch_remove_value<'a>(
        &'a self,
        _scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>> {
        Box::pin(async move { Ok(keys.iter().map(|key| (key.to_string(), None)).collect()) })
    }

    fn list_values<'a>(
        &'a self,
        _scope: &'a S,
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Value)>, StoreError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

#[derive(Debug)]
struct StoredEntry {
    // `None` is a tombstone that keeps the sequence of the delete.
    value: Option<Value>,
    sequence: WriteSequence,
}

// `None` is the global partition of the scope family.
type PartitionKey = Option<WorkspaceId>;

fn partition_key<S: StoreScope>(scope: &S) -> PartitionKey {
    match scope.partition() {
        ScopePartition::Global => None,
        ScopePartition::Workspace(id) => Some(id.clone()),
    }
}

#[derive(Debug, Default)]
struct MemoryScopedState {
    partitions: HashMap<PartitionKey, BTreeMap<String, StoredEntry>>,
    fail_writes: bool,
}

impl MemoryScopedState {
    fn read<S: StoreScope>(&self, scope: &S, key: &str) -> Option<Value> {
        self.partitions
            .get(&partition_key(scope))
            .and_then(|partition| partition.get(key))
            .and_then(|entry| entry.value.clone())
    }

    fn apply<S: StoreScope>(
        &mut self,
        scope: &S,
        key: &str,
        value: Option<Value>,
        sequence: WriteSequence,
    ) -> Option<Value> {
        let partition = self.partitions.entry(partition_key(scope)).or_default();
        if let Some(existing) = partition.get(key) {
            if existing.sequence >= sequence {
                tracing::debug!(
                    key,
                    stale = sequence.get(),
                    applied = existing.sequence.get(),
                    "dropping superseded scoped write"
                );
                return None;
            }
        }
        partition
            .insert(key.to_string(), StoredEntry { value, sequence })
            .and_then(|previous| previous.value)
    }

    fn reject_if_failing(&self, operation: &'static str, key: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            Err(StoreError::Backend {
                operation,
                key: key.to_string(),
                message: "backend store is rejecting writes".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// In-memory scoped store; clones share the same backing map.
///
/// Values are keyed by [`ScopePartition`], so each workspace and the global scope own disjoint
/// key spaces.
#[derive(Debug, Clone)]
pub struct MemoryScopedStore<S: StoreScope> {
    inner: Rc<RefCell<MemoryScopedState>>,
    scope: PhantomData<fn() -> S>,
}

impl<S: StoreScope> Default for MemoryScopedStore<S> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryScopedState::default())),
            scope: PhantomData,
        }
    }
}

impl<S: StoreScope> MemoryScopedStore<S> {
    /// Makes every subsequent write fail with [`StoreError::Backend`] while `fail` is set.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl<S: StoreScope> ScopedValueStore<S> for MemoryScopedStore<S> {
    fn get_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async move {
            validate_key(key)?;
            Ok(self.inner.borrow().read(scope, key))
        })
    }

    fn batch_get_value<'a>(
        &'a self,
        scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>> {
        Box::pin(async move {
            for key in keys {
                validate_key(key)?;
            }
            let state = self.inner.borrow();
            Ok(keys
                .iter()
                .map(|key| (key.to_string(), state.read(scope, key)))
                .collect())
        })
    }

    fn write_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
        value: Value,
        sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            validate_key(key)?;
            let mut state = self.inner.borrow_mut();
            state.reject_if_failing("update_value", key)?;
            state.apply(scope, key, Some(value), sequence);
            Ok(())
        })
    }

    fn delete_value<'a>(
        &'a self,
        scope: &'a S,
        key: &'a str,
        sequence: WriteSequence,
    ) -> ScopedStoreFuture<'a, Result<Option<Value>, StoreError>> {
        Box::pin(async move {
            validate_key(key)?;
            let mut state = self.inner.borrow_mut();
            state.reject_if_failing("remove_value", key)?;
            Ok(state.apply(scope, key, None, sequence))
        })
    }

    fn batch_update_value<'a>(
        &'a self,
        scope: &'a S,
        items: Vec<(String, Value)>,
    ) -> ScopedStoreFuture<'a, Result<(), StoreError>> {
        let stamped = items
            .into_iter()
            .map(|(key, value)| (key, value, WriteSequence::next()))
            .collect::<Vec<_>>();
        Box::pin(async move {
            for (key, _, _) in &stamped {
                validate_key(key)?;
            }
            let mut state = self.inner.borrow_mut();
            if let Some((key, _, _)) = stamped.first() {
                state.reject_if_failing("batch_update_value", key)?;
            }
            for (key, value, sequence) in stamped {
                state.apply(scope, &key, Some(value), sequence);
            }
            Ok(())
        })
    }

    fn batch_remove_value<'a>(
        &'a self,
        scope: &'a S,
        keys: &'a [&'a str],
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Option<Value>)>, StoreError>> {
        let stamped = keys
            .iter()
            .map(|key| (*key, WriteSequence::next()))
            .collect::<Vec<_>>();
        Box::pin(async move {
            for (key, _) in &stamped {
                validate_key(key)?;
            }
            let mut state = self.inner.borrow_mut();
            if let Some((key, _)) = stamped.first() {
                state.reject_if_failing("batch_remove_value", key)?;
            }
            Ok(stamped
                .into_iter()
                .map(|(key, sequence)| (key.to_string(), state.apply(scope, key, None, sequence)))
                .collect())
        })
    }

    fn list_values<'a>(
        &'a self,
        scope: &'a S,
    ) -> ScopedStoreFuture<'a, Result<Vec<(String, Value)>, StoreError>> {
        Box::pin(async move {
            let state = self.inner.borrow();
            let Some(partition) = state.partitions.get(&partition_key(scope)) else {
                return Ok(Vec::new());
            };
            Ok(partition
                .iter()
                .filter_map(|(key, entry)| entry.value.clone().map(|value| (key.clone(), value)))
                .collect())
        })
    }
}

/// Loads `key` from `scope`, reporting an absent key as [`StoreError::NotFound`].
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for absent keys and propagates store failures.
pub async fn get_value_or_not_found<S, St>(
    store: &St,
    scope: &S,
    key: &str,
) -> Result<Value, StoreError>
where
    S: StoreScope,
    St: ScopedValueStore<S> + ?Sized,
{
    store
        .get_value(scope, key)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
}

/// Loads several keys in one round-trip, substituting each absent key's own default.
///
/// # Errors
///
/// Fails as a whole when the batch round-trip fails; never fails for individual keys.
pub async fn batch_get_with_defaults<S, St>(
    store: &St,
    scope: &S,
    entries: &[(&str, Value)],
) -> Result<BTreeMap<String, Value>, StoreError>
where
    S: StoreScope,
    St: ScopedValueStore<S> + ?Sized,
{
    let keys = entries.iter().map(|(key, _)| *key).collect::<Vec<_>>();
    let found = store
        .batch_get_value(scope, &keys)
        .await?
        .into_iter()
        .collect::<HashMap<_, _>>();

    Ok(entries
        .iter()
        .map(|(key, default)| {
            let value = found
                .get(*key)
                .cloned()
                .flatten()
                .unwrap_or_else(|| default.clone());
            (key.to_string(), value)
        })
        .collect())
}

/// Loads and deserializes a typed value through a [`ScopedValueStore`] implementation.
///
/// # Errors
///
/// Returns an error when the store round-trip or JSON deserialization fails.
pub async fn load_value_with<S, St, T>(
    store: &St,
    scope: &S,
    key: &str,
) -> Result<Option<T>, StoreError>
where
    S: StoreScope,
    St: ScopedValueStore<S> + ?Sized,
    T: DeserializeOwned,
{
    let Some(raw) = store.get_value(scope, key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_value(raw).map_err(|err| StoreError::Deserialize {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    Ok(Some(value))
}

/// Serializes and saves a typed value through a [`ScopedValueStore`] implementation.
///
/// # Errors
///
/// Returns an error when serialization or the store write fails.
pub async fn save_value_with<S, St, T>(
    store: &St,
    scope: &S,
    key: &str,
    value: &T,
) -> Result<(), StoreError>
where
    S: StoreScope,
    St: ScopedValueStore<S> + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_value(value).map_err(|err| StoreError::Serialize {
        key: key.to_string(),
        message: err.to_string(),
    })?;
    store.update_value(scope, key, raw).await
}
