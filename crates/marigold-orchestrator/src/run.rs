//! The detached half of a collection run.
//!
//! Once `execute_collection` has acknowledged the caller, everything that
//! happens to the run is recorded here: the engine outcome lands in the
//! registry and, on failure, on the event stream. Nothing escapes the task,
//! panics included. The event subscription belongs to the registry record,
//! which drops it when the run stops or finishes.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use marigold_collection::Collection;
use marigold_engine::{EngineError, RequestEngine, RunOptions};
use tracing::{debug, info, warn};

use crate::events::{ExecutionEnvelope, ExecutionNotifier};
use crate::eviction::Evictor;
use crate::registry::Registry;

pub(crate) struct CollectionRun<N> {
  pub run_id: String,
  pub sequence: u64,
  pub protocol: String,
  pub collection: Collection,
  pub options: RunOptions,
  pub engine: Arc<dyn RequestEngine>,
  pub registry: Arc<Registry>,
  pub notifier: Arc<N>,
  pub evictor: Evictor,
  pub retention: Duration,
}

impl<N: ExecutionNotifier> CollectionRun<N> {
  pub async fn drive(self) {
    let Self {
      run_id,
      sequence,
      protocol,
      collection,
      options,
      engine,
      registry,
      notifier,
      evictor,
      retention,
    } = self;

    if !registry.mark_running(&run_id, sequence) {
      debug!(run_id = %run_id, "collection_run_stopped_before_start");
      return;
    }

    let outcome = AssertUnwindSafe(engine.run(collection, options))
      .catch_unwind()
      .await
      .unwrap_or_else(|panic| Err(panic_message(panic)));

    match outcome {
      Ok(results) => {
        let (passed, failed) = (results.passed(), results.failed());
        if registry.complete_run(&run_id, sequence, results) {
          info!(run_id = %run_id, passed, failed, "collection_run_completed");
          evictor.schedule(&run_id, sequence, retention);
        } else {
          debug!(run_id = %run_id, "collection_run_outcome_discarded");
        }
      }
      Err(e) => {
        let message = e.to_string();
        if registry.fail_run(&run_id, sequence, message.clone()) {
          warn!(run_id = %run_id, error = %message, "collection_run_failed");
          notifier.notify(ExecutionEnvelope::run_error(&run_id, &protocol, &message));
          evictor.schedule(&run_id, sequence, retention);
        } else {
          debug!(run_id = %run_id, error = %message, "collection_run_outcome_discarded");
        }
      }
    }
  }
}

fn panic_message(panic: Box<dyn Any + Send>) -> EngineError {
  let message = panic
    .downcast_ref::<&str>()
    .map(|s| s.to_string())
    .or_else(|| panic.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic".to_string());
  EngineError::Execution {
    message: format!("engine panicked: {message}"),
  }
}
