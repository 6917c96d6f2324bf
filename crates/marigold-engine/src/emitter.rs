//! Subscribe-to-everything event fan-out.
//!
//! Engines embed an [`EventEmitter`] and hand out [`Subscription`]s from
//! `subscribe_all`. A subscription unsubscribes when dropped, so a listener
//! can never outlive the scope that registered it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::events::EngineEvent;

/// Callback invoked for every event an engine emits.
pub type EventListener = Arc<dyn Fn(EngineEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
  next_id: AtomicU64,
  entries: RwLock<BTreeMap<u64, EventListener>>,
}

/// Dispatches every emitted event to all current listeners, in subscription order.
#[derive(Clone, Default)]
pub struct EventEmitter {
  listeners: Arc<Listeners>,
}

impl EventEmitter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `listener` for all events until the returned subscription is dropped.
  pub fn subscribe_all(&self, listener: EventListener) -> Subscription {
    let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
    self
      .listeners
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id, listener);

    let weak: Weak<Listeners> = Arc::downgrade(&self.listeners);
    Subscription::new(move || {
      if let Some(listeners) = weak.upgrade() {
        listeners
          .entries
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .remove(&id);
      }
    })
  }

  /// Deliver `event` to every listener.
  ///
  /// Listeners are snapshotted first so a listener may unsubscribe from
  /// within its own callback.
  pub fn emit(&self, event: EngineEvent) {
    let snapshot: Vec<EventListener> = self
      .listeners
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .cloned()
      .collect();

    for listener in snapshot {
      listener(event.clone());
    }
  }

  /// Number of live subscriptions.
  pub fn listener_count(&self) -> usize {
    self
      .listeners
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }
}

/// Handle to a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
  unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
  /// Wrap an arbitrary unsubscribe action.
  pub fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
    Self {
      unsubscribe: Some(Box::new(unsubscribe)),
    }
  }

  /// Unsubscribe now. Equivalent to dropping.
  pub fn unsubscribe(mut self) {
    self.release();
  }

  fn release(&mut self) {
    if let Some(unsubscribe) = self.unsubscribe.take() {
      unsubscribe();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.release();
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.unsubscribe.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  fn started(id: &str) -> EngineEvent {
    EngineEvent::RequestStarted {
      request_id: id.to_string(),
      iteration: 0,
    }
  }

  #[test]
  fn test_events_reach_all_listeners_in_order() {
    let emitter = EventEmitter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first = {
      let seen = seen.clone();
      emitter.subscribe_all(Arc::new(move |e: EngineEvent| {
        seen.lock().unwrap().push(format!("first:{}", e.kind()))
      }))
    };
    let second = {
      let seen = seen.clone();
      emitter.subscribe_all(Arc::new(move |e: EngineEvent| {
        seen.lock().unwrap().push(format!("second:{}", e.kind()))
      }))
    };

    emitter.emit(started("a"));
    assert_eq!(
      *seen.lock().unwrap(),
      vec!["first:request:started", "second:request:started"]
    );

    drop(first);
    drop(second);
  }

  #[test]
  fn test_drop_unsubscribes() {
    let emitter = EventEmitter::new();
    let count = Arc::new(AtomicU64::new(0));

    let subscription = {
      let count = count.clone();
      emitter.subscribe_all(Arc::new(move |_: EngineEvent| {
        count.fetch_add(1, Ordering::SeqCst);
      }))
    };
    assert_eq!(emitter.listener_count(), 1);

    emitter.emit(started("a"));
    drop(subscription);
    emitter.emit(started("b"));

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(emitter.listener_count(), 0);
  }

  #[test]
  fn test_explicit_unsubscribe() {
    let emitter = EventEmitter::new();
    let subscription = emitter.subscribe_all(Arc::new(|_: EngineEvent| {}));
    subscription.unsubscribe();
    assert_eq!(emitter.listener_count(), 0);
  }

  #[test]
  fn test_subscription_outliving_emitter() {
    let emitter = EventEmitter::new();
    let subscription = emitter.subscribe_all(Arc::new(|_: EngineEvent| {}));
    drop(emitter);
    drop(subscription);
  }
}
