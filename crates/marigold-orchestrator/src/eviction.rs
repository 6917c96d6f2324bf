//! Timed eviction of finished run states.
//!
//! A single background task owns a `DelayQueue` of `(run_id, sequence)` keys.
//! When a key expires the matching run generation is dropped from the
//! registry; a relaunch under the same id is left alone.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, trace};

use crate::registry::Registry;

struct Eviction {
  run_id: String,
  sequence: u64,
  after: Duration,
}

/// Handle for scheduling evictions on the background task.
#[derive(Clone)]
pub(crate) struct Evictor {
  sender: mpsc::UnboundedSender<Eviction>,
}

impl Evictor {
  /// Start the eviction task. It runs until `shutdown` fires or every
  /// `Evictor` handle is dropped.
  pub fn spawn(registry: Arc<Registry>, shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_evictions(registry, receiver, shutdown));
    (Self { sender }, handle)
  }

  pub fn schedule(&self, run_id: &str, sequence: u64, after: Duration) {
    let eviction = Eviction {
      run_id: run_id.to_string(),
      sequence,
      after,
    };
    if self.sender.send(eviction).is_err() {
      debug!(run_id = %run_id, "eviction_task_stopped");
    }
  }
}

async fn run_evictions(
  registry: Arc<Registry>,
  mut receiver: mpsc::UnboundedReceiver<Eviction>,
  shutdown: CancellationToken,
) {
  let mut queue: DelayQueue<(String, u64)> = DelayQueue::new();

  loop {
    tokio::select! {
      _ = shutdown.cancelled() => break,
      request = receiver.recv() => match request {
        Some(eviction) => {
          trace!(run_id = %eviction.run_id, after_ms = eviction.after.as_millis() as u64, "eviction_scheduled");
          queue.insert((eviction.run_id, eviction.sequence), eviction.after);
        }
        None => break,
      },
      Some(expired) = queue.next(), if !queue.is_empty() => {
        let (run_id, sequence) = expired.into_inner();
        if registry.evict_run(&run_id, sequence) {
          debug!(run_id = %run_id, "run_state_evicted");
        }
      }
    }
  }

  debug!(pending = queue.len(), "eviction_task_finished");
}
