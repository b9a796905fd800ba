//! Key-value store with change notification.
//!
//! # Responsibility
//! - Hold every dashboard collection as a named JSON value.
//! - Notify per-key subscribers synchronously after each effective write.
//! - Queue writes for the optional remote mirror without waiting on it.
//!
//! # Invariants
//! - Reads never fail: absent, malformed or unreadable values yield the
//!   caller's default.
//! - A `set` that reproduces the stored value is a no-op, so a subscriber
//!   writing back what it was handed settles instead of looping.
//! - Subscriber errors and panics are contained per subscriber.
//! - Notification nesting is capped at `MAX_NOTIFY_DEPTH`.

pub mod backend;
pub mod keys;

use crate::clock::{Clock, SystemClock};
use crate::db::DbError;
use crate::sync::{FlushReport, RemoteStore, SyncOutbox};
use backend::StorageBackend;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

pub use backend::{MemoryBackend, SqliteBackend};

/// Deepest chain of subscriber-triggered writes that still notifies.
pub const MAX_NOTIFY_DEPTH: usize = 16;

pub type StoreResult<T> = Result<T, StoreError>;

/// Value returned by subscriber callbacks.
pub type SubscriberResult = Result<(), Box<dyn Error>>;

type Callback = dyn Fn(&Value, &Value) -> SubscriberResult;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "value serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

struct SubscriberEntry {
    id: u64,
    callback: Rc<Callback>,
}

struct StoreInner {
    backend: RefCell<Box<dyn StorageBackend>>,
    clock: Rc<dyn Clock>,
    subscribers: RefCell<BTreeMap<String, Vec<SubscriberEntry>>>,
    next_subscriber_id: Cell<u64>,
    notify_depth: Cell<usize>,
    remote: RefCell<Option<Rc<dyn RemoteStore>>>,
    outbox: RefCell<SyncOutbox>,
}

/// Shared handle to the dashboard store.
///
/// Cloning is cheap; all clones see the same data and subscribers. The
/// handle is single-threaded by construction (`Rc`).
#[derive(Clone)]
pub struct KeyValueStore {
    inner: Rc<StoreInner>,
}

/// Handle returned by `KeyValueStore::subscribe`.
///
/// Dropping it keeps the callback registered; call `unsubscribe` to remove.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    store: Weak<StoreInner>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Removes the callback. A no-op once the store is gone.
    pub fn unsubscribe(self) {
        let Some(inner) = self.store.upgrade() else {
            return;
        };
        let mut subscribers = inner.subscribers.borrow_mut();
        if let Some(entries) = subscribers.get_mut(&self.key) {
            entries.retain(|entry| entry.id != self.id);
            if entries.is_empty() {
                subscribers.remove(&self.key);
            }
        }
    }
}

impl KeyValueStore {
    /// Creates a store over `backend` using the system clock.
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self::with_clock(backend, Rc::new(SystemClock))
    }

    pub fn with_clock(backend: impl StorageBackend + 'static, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                backend: RefCell::new(Box::new(backend)),
                clock,
                subscribers: RefCell::new(BTreeMap::new()),
                next_subscriber_id: Cell::new(1),
                notify_depth: Cell::new(0),
                remote: RefCell::new(None),
                outbox: RefCell::new(SyncOutbox::new()),
            }),
        }
    }

    /// Clock shared with services built on this store.
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.inner.clock)
    }

    /// Returns the parsed value, or `None` when absent or unreadable.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let raw = match self.inner.backend.borrow().read(key) {
            Ok(raw) => raw?,
            Err(err) => {
                error!(
                    "event=store_get module=store status=error key={} error={}",
                    key, err
                );
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event=store_get_malformed module=store status=skip key={} error={}",
                    key, err
                );
                None
            }
        }
    }

    /// Returns the stored value decoded as `T`, or `default`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.get_value(key) else {
            return default;
        };
        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(
                    "event=store_get_malformed module=store status=skip key={} error={}",
                    key, err
                );
                default
            }
        }
    }

    /// Returns the stored array decoded element-wise.
    ///
    /// Elements that fail to decode are skipped; a non-array value reads as
    /// an empty collection.
    pub fn get_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let value = self.get_value(key).unwrap_or(Value::Null);
        decode_indexed(key, &value)
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }

    /// Returns the stored array as raw JSON elements (empty if not an array).
    pub fn get_array(&self, key: &str) -> Vec<Value> {
        match self.get_value(key) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!(
                    "event=store_get_malformed module=store status=skip key={} reason=not_array",
                    key
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// Serializes and stores `value`. Returns whether anything changed.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<bool> {
        self.set_value(key, serde_json::to_value(value)?)
    }

    /// Stores `value`, then notifies subscribers of `key` before returning.
    pub fn set_value(&self, key: &str, value: Value) -> StoreResult<bool> {
        Ok(self.set_many(vec![(key, value)])? > 0)
    }

    /// Persists every changed entry, then notifies per key in order.
    ///
    /// Subscribers of any key observe the whole batch already stored.
    /// Returns how many keys actually changed.
    pub fn set_many(&self, entries: Vec<(&str, Value)>) -> StoreResult<usize> {
        let mut changed = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let previous = self.get_value(key);
            if previous.as_ref() == Some(&value) {
                debug!("event=store_set module=store status=skip key={key} reason=unchanged");
                continue;
            }

            let raw = serde_json::to_string(&value)?;
            self.inner.backend.borrow_mut().write(key, &raw)?;
            debug!(
                "event=store_set module=store status=ok key={} bytes={}",
                key,
                raw.len()
            );
            self.queue_remote(key, Some(value.clone()));
            changed.push((key, value, previous.unwrap_or(Value::Null)));
        }

        for (key, new_value, old_value) in &changed {
            self.notify(key, new_value, old_value);
        }
        Ok(changed.len())
    }

    /// Deletes `key`. Subscribers see `Value::Null` as the new value.
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        let previous = self.get_value(key);
        if !self.inner.backend.borrow_mut().remove(key)? {
            return Ok(false);
        }
        debug!("event=store_remove module=store status=ok key={key}");

        self.queue_remote(key, None);
        self.notify(key, &Value::Null, &previous.unwrap_or(Value::Null));
        Ok(true)
    }

    /// Sorted list of stored keys; empty when the backend is unreadable.
    pub fn keys(&self) -> Vec<String> {
        self.inner.backend.borrow().keys().unwrap_or_else(|err| {
            error!("event=store_keys module=store status=error error={err}");
            Vec::new()
        })
    }

    /// Registers `callback(new_value, old_value)` for writes to `key`.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, &Value) -> SubscriberResult + 'static,
    {
        let id = self.inner.next_subscriber_id.get();
        self.inner.next_subscriber_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push(SubscriberEntry {
                id,
                callback: Rc::new(callback),
            });
        Subscription {
            store: Rc::downgrade(&self.inner),
            key: key.to_string(),
            id,
        }
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .subscribers
            .borrow()
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Starts queueing writes for `remote`. Already stored values are not
    /// backfilled.
    pub fn attach_remote(&self, remote: Rc<dyn RemoteStore>) {
        *self.inner.remote.borrow_mut() = Some(remote);
    }

    pub fn pending_remote_writes(&self) -> usize {
        self.inner.outbox.borrow().len()
    }

    /// Pushes queued writes to the attached remote.
    ///
    /// Returns `None` when no remote is attached. Hosts call this after
    /// local changes settle; failed pushes wait for the next call.
    pub fn flush_remote(&self) -> Option<FlushReport> {
        let remote = self.inner.remote.borrow().clone()?;
        let report = self.inner.outbox.borrow_mut().flush(remote.as_ref());
        Some(report)
    }

    fn queue_remote(&self, key: &str, value: Option<Value>) {
        if self.inner.remote.borrow().is_none() {
            return;
        }
        let now_ms = self.inner.clock.now_ms();
        self.inner.outbox.borrow_mut().enqueue(key, value, now_ms);
    }

    fn notify(&self, key: &str, new_value: &Value, old_value: &Value) {
        let callbacks: Vec<Rc<Callback>> = match self.inner.subscribers.borrow().get(key) {
            Some(entries) => entries
                .iter()
                .map(|entry| Rc::clone(&entry.callback))
                .collect(),
            None => return,
        };

        let depth = self.inner.notify_depth.get();
        if depth >= MAX_NOTIFY_DEPTH {
            error!(
                "event=store_notify module=store status=skip key={} depth={} reason=max_depth",
                key, depth
            );
            return;
        }

        self.inner.notify_depth.set(depth + 1);
        for (index, callback) in callbacks.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(new_value, old_value))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(
                    "event=subscriber_failed module=store status=error key={} subscriber={} error={}",
                    key, index, err
                ),
                Err(_) => error!(
                    "event=subscriber_failed module=store status=error key={} subscriber={} error=panic",
                    key, index
                ),
            }
        }
        self.inner.notify_depth.set(depth);
    }
}

/// Decodes a JSON array element-wise, keeping each element's position.
///
/// Non-array values and undecodable elements are skipped with a warning.
pub fn decode_indexed<T: DeserializeOwned>(key: &str, value: &Value) -> Vec<(usize, T)> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        _ => {
            warn!(
                "event=store_get_malformed module=store status=skip key={} reason=not_array",
                key
            );
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(decoded) => Some((index, decoded)),
            Err(err) => {
                warn!(
                    "event=store_get_malformed module=store status=skip key={} index={} error={}",
                    key, index, err
                );
                None
            }
        })
        .collect()
}
