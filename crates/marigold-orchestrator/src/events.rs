//! Observer envelopes and notifiers.
//!
//! Every engine event is republished as an [`ExecutionEnvelope`] tagged with
//! the execution (or run) id it belongs to, so a single shared channel can
//! carry many concurrent executions.

use chrono::{DateTime, Utc};
use marigold_engine::EngineEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Event type published when a collection run fails.
pub const RUN_ERROR_EVENT: &str = "collection:error";

/// Event type published when a collection run is stopped.
pub const RUN_STOPPED_EVENT: &str = "collection:stopped";

/// An event as seen by observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEnvelope {
  #[serde(rename = "type")]
  pub event_type: String,
  /// Execution id for single requests, run id for collection runs.
  pub execution_id: String,
  pub protocol: String,
  pub timestamp: DateTime<Utc>,
  pub data: serde_json::Value,
}

impl ExecutionEnvelope {
  /// Wrap an engine event.
  pub fn from_engine(execution_id: &str, protocol: &str, event: &EngineEvent) -> Self {
    Self {
      event_type: event.kind().to_string(),
      execution_id: execution_id.to_string(),
      protocol: protocol.to_string(),
      timestamp: Utc::now(),
      data: event.data(),
    }
  }

  pub(crate) fn run_error(run_id: &str, protocol: &str, message: &str) -> Self {
    Self {
      event_type: RUN_ERROR_EVENT.to_string(),
      execution_id: run_id.to_string(),
      protocol: protocol.to_string(),
      timestamp: Utc::now(),
      data: serde_json::json!({ "runId": run_id, "error": message }),
    }
  }

  pub(crate) fn run_stopped(run_id: &str, protocol: &str) -> Self {
    Self {
      event_type: RUN_STOPPED_EVENT.to_string(),
      execution_id: run_id.to_string(),
      protocol: protocol.to_string(),
      timestamp: Utc::now(),
      data: serde_json::json!({ "runId": run_id }),
    }
  }
}

/// Trait for receiving execution envelopes.
///
/// The orchestrator calls `notify` for each event and never waits on the
/// observer; implementations decide what to do with them.
pub trait ExecutionNotifier: Send + Sync {
  /// Called when an execution event occurs.
  fn notify(&self, envelope: ExecutionEnvelope);
}

/// A no-op notifier that discards all events.
///
/// Used when no observer is attached.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _envelope: ExecutionEnvelope) {}
}

/// A notifier that sends envelopes to an unbounded channel.
///
/// Unbounded so a slow consumer never stalls an engine callback.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEnvelope>,
}

impl ChannelNotifier {
  /// Create a new channel notifier.
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEnvelope>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEnvelope>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, envelope: ExecutionEnvelope) {
    // Receiver may have been dropped; events are then discarded.
    let _ = self.sender.send(envelope);
  }
}
