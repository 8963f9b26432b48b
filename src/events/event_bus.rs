use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::error::{EmitReport, ListenerError, ListenerFailure};
use super::event_types::{Event, SubscriptionId};
use crate::config::BusSettings;

/// Listener as stored by the bus. Infallible callbacks are wrapped to always return `Ok`.
pub type Listener = Arc<dyn Fn(&Event) -> Result<(), ListenerError> + Send + Sync>;

/// Receives every listener failure. Installed with [`EventBus::set_error_handler`].
pub type ErrorHandler = Arc<dyn Fn(&ListenerFailure) + Send + Sync>;

#[derive(Clone)]
struct ListenerEntry {
    id: SubscriptionId,
    once: bool,
    listener: Listener,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventBusStats {
    pub total_events_emitted: u64,
    pub total_listener_calls: u64,
    pub listener_errors: u64,
    /// Emits that found no listener at all
    pub unhandled_events: u64,
}

/// Synchronous publish/subscribe bus keyed by event name.
///
/// Listeners of a channel run in registration order on the emitting thread.
/// `emit` copies the listener sequence and releases its lock before calling
/// anything, so listeners are free to subscribe, unsubscribe or emit again.
/// A listener that returns `Err` or panics is reported and skipped over; the
/// rest of the channel still runs.
///
/// Share it between producers and consumers with `Arc<EventBus>`.
pub struct EventBus {
    channels: RwLock<HashMap<String, Vec<ListenerEntry>>>,
    // Wildcard listeners, invoked for every event before the channel listeners
    global_listeners: RwLock<Vec<ListenerEntry>>,
    error_handler: RwLock<Option<ErrorHandler>>,
    next_id: AtomicU64,

    max_listeners: usize,
    catch_panics: bool,
    warned_channels: Mutex<HashSet<String>>,

    total_events_emitted: AtomicU64,
    total_listener_calls: AtomicU64,
    listener_errors: AtomicU64,
    unhandled_events: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_settings(&BusSettings::default())
    }

    pub fn with_settings(settings: &BusSettings) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            global_listeners: RwLock::new(Vec::new()),
            error_handler: RwLock::new(None),
            next_id: AtomicU64::new(1),
            max_listeners: settings.max_listeners,
            catch_panics: settings.catch_panics,
            warned_channels: Mutex::new(HashSet::new()),
            total_events_emitted: AtomicU64::new(0),
            total_listener_calls: AtomicU64::new(0),
            listener_errors: AtomicU64::new(0),
            unhandled_events: AtomicU64::new(0),
        }
    }

    /// Register a listener under `event_name`.
    pub fn subscribe<F>(&self, event_name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(event_name.into(), false, infallible(listener))
    }

    /// Register a listener that can report failure through its return value.
    pub fn try_subscribe<F>(&self, event_name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.register(event_name.into(), false, Arc::new(listener))
    }

    /// Register a listener that is removed before its first invocation.
    pub fn once<F>(&self, event_name: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(event_name.into(), true, infallible(listener))
    }

    /// Register a wildcard listener that receives every emitted event.
    pub fn subscribe_global<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_subscription_id();
        write_lock(&self.global_listeners).push(ListenerEntry {
            id,
            once: false,
            listener: infallible(listener),
        });
        log::debug!("registered global listener {}", id);
        id
    }

    /// Remove one listener from `event_name`. Returns false when it was not registered there.
    pub fn unsubscribe(&self, event_name: &str, subscription: SubscriptionId) -> bool {
        let mut channels = write_lock(&self.channels);
        let Some(listeners) = channels.get_mut(event_name) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|entry| entry.id != subscription);
        let removed = listeners.len() != before;

        let emptied = listeners.is_empty();
        if emptied {
            channels.remove(event_name);
        }
        drop(channels);

        if emptied {
            self.forget_listener_warning(event_name);
        }
        if removed {
            log::debug!("removed listener {} from '{}'", subscription, event_name);
        }
        removed
    }

    pub fn unsubscribe_global(&self, subscription: SubscriptionId) -> bool {
        let mut globals = write_lock(&self.global_listeners);
        let before = globals.len();
        globals.retain(|entry| entry.id != subscription);
        globals.len() != before
    }

    /// Drop every listener of `event_name`, returning how many there were.
    pub fn remove_all_listeners(&self, event_name: &str) -> usize {
        let removed = write_lock(&self.channels)
            .remove(event_name)
            .map_or(0, |listeners| listeners.len());
        self.forget_listener_warning(event_name);
        removed
    }

    /// Emit `payload` under `event_name`.
    ///
    /// Global listeners run first, then the channel's listeners in
    /// registration order. Emitting to a name nobody listens to does nothing.
    pub fn emit(&self, event_name: &str, payload: Value) -> EmitReport {
        self.total_events_emitted.fetch_add(1, Ordering::Relaxed);

        let globals = snapshot_vec(&self.global_listeners);
        let listeners = self.snapshot_channel(event_name);

        if globals.is_empty() && listeners.is_empty() {
            self.unhandled_events.fetch_add(1, Ordering::Relaxed);
            log::debug!("no listeners for '{}'", event_name);
            return EmitReport::default();
        }

        let event = Event::new(event_name, payload);
        let mut report = EmitReport::default();

        for entry in globals.iter().chain(listeners.iter()) {
            report.invoked += 1;
            if let Err(error) = self.invoke(entry, &event) {
                let failure = ListenerFailure {
                    event_name: event.name.clone(),
                    subscription: entry.id,
                    error,
                };
                self.report_failure(&failure);
                report.failures.push(failure);
            }
        }

        report
    }

    /// Install the handler that receives listener failures.
    ///
    /// Without one, failures go to `log::error!`.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ListenerFailure) + Send + Sync + 'static,
    {
        *write_lock(&self.error_handler) = Some(Arc::new(handler));
    }

    pub fn clear_error_handler(&self) {
        *write_lock(&self.error_handler) = None;
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        read_lock(&self.channels)
            .get(event_name)
            .map_or(0, |listeners| listeners.len())
    }

    pub fn global_listener_count(&self) -> usize {
        read_lock(&self.global_listeners).len()
    }

    /// Names of all channels that currently have listeners, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read_lock(&self.channels).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn max_listeners(&self) -> usize {
        self.max_listeners
    }

    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_events_emitted: self.total_events_emitted.load(Ordering::Relaxed),
            total_listener_calls: self.total_listener_calls.load(Ordering::Relaxed),
            listener_errors: self.listener_errors.load(Ordering::Relaxed),
            unhandled_events: self.unhandled_events.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.total_events_emitted.store(0, Ordering::Relaxed);
        self.total_listener_calls.store(0, Ordering::Relaxed);
        self.listener_errors.store(0, Ordering::Relaxed);
        self.unhandled_events.store(0, Ordering::Relaxed);
    }

    fn register(&self, event_name: String, once: bool, listener: Listener) -> SubscriptionId {
        let id = self.next_subscription_id();

        let count = {
            let mut channels = write_lock(&self.channels);
            let listeners = channels.entry(event_name.clone()).or_default();
            listeners.push(ListenerEntry { id, once, listener });
            listeners.len()
        };

        log::debug!("registered listener {} on '{}'", id, event_name);
        self.check_listener_limit(&event_name, count);
        id
    }

    fn next_subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // Warns once per channel; registration is never refused.
    fn check_listener_limit(&self, event_name: &str, count: usize) {
        if self.max_listeners == 0 || count <= self.max_listeners {
            return;
        }
        if lock_mutex(&self.warned_channels).insert(event_name.to_string()) {
            log::warn!(
                "possible listener leak: {} listeners on '{}' (max {})",
                count,
                event_name,
                self.max_listeners
            );
        }
    }

    // A dropped channel starts over: growing past the limit again warns again.
    fn forget_listener_warning(&self, event_name: &str) {
        lock_mutex(&self.warned_channels).remove(event_name);
    }

    /// Copy the channel's listeners, removing `once` entries under the same lock.
    fn snapshot_channel(&self, event_name: &str) -> Vec<ListenerEntry> {
        {
            let channels = read_lock(&self.channels);
            match channels.get(event_name) {
                None => return Vec::new(),
                Some(listeners) if !listeners.iter().any(|entry| entry.once) => {
                    return listeners.clone();
                }
                Some(_) => {}
            }
        }

        let mut channels = write_lock(&self.channels);
        let Some(listeners) = channels.get_mut(event_name) else {
            return Vec::new();
        };
        let snapshot = listeners.clone();
        listeners.retain(|entry| !entry.once);
        let emptied = listeners.is_empty();
        if emptied {
            channels.remove(event_name);
        }
        drop(channels);

        if emptied {
            self.forget_listener_warning(event_name);
        }
        snapshot
    }

    fn invoke(&self, entry: &ListenerEntry, event: &Event) -> Result<(), ListenerError> {
        self.total_listener_calls.fetch_add(1, Ordering::Relaxed);

        if !self.catch_panics {
            return (entry.listener)(event);
        }

        match panic::catch_unwind(AssertUnwindSafe(|| (entry.listener)(event))) {
            Ok(result) => result,
            Err(payload) => Err(ListenerError::from_panic(payload)),
        }
    }

    fn report_failure(&self, failure: &ListenerFailure) {
        self.listener_errors.fetch_add(1, Ordering::Relaxed);

        // Clone out so the handler may replace itself without deadlocking
        let handler = read_lock(&self.error_handler).clone();
        match handler {
            Some(handler) => handler(failure),
            None => log::error!("{}", failure),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: HashMap<String, usize> = read_lock(&self.channels)
            .iter()
            .map(|(name, listeners)| (name.clone(), listeners.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("channels", &channels)
            .field("global_listeners", &self.global_listener_count())
            .field("max_listeners", &self.max_listeners)
            .field("catch_panics", &self.catch_panics)
            .finish()
    }
}

fn infallible<F>(listener: F) -> Listener
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(move |event: &Event| -> Result<(), ListenerError> {
        listener(event);
        Ok(())
    })
}

fn snapshot_vec(listeners: &RwLock<Vec<ListenerEntry>>) -> Vec<ListenerEntry> {
    read_lock(listeners).clone()
}

// The maps hold no multi-step invariants, so a poisoned lock is still usable.
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock_mutex<T>(lock: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
