//! Events emitted by a request engine while it runs.
//!
//! The engine's event vocabulary is open-ended. The variants below are the
//! ones the orchestrator understands; anything else arrives as
//! [`EngineEvent::Other`] and is forwarded untouched.

use serde_json::json;

/// Events emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
  /// The run has started.
  RunStarted {
    collection_id: String,
    total_requests: usize,
  },

  /// A request has started executing.
  RequestStarted { request_id: String, iteration: u32 },

  /// A request has finished, successfully or not.
  RequestCompleted {
    request_id: String,
    iteration: u32,
    success: bool,
    result: serde_json::Value,
  },

  /// The run has finished.
  RunCompleted { summary: serde_json::Value },

  /// Something went wrong. `request_id` is set when a single request failed.
  Error {
    request_id: Option<String>,
    message: String,
  },

  /// Any event kind not listed above.
  Other {
    kind: String,
    payload: serde_json::Value,
  },
}

impl EngineEvent {
  /// The wire name of this event, e.g. `request:completed`.
  pub fn kind(&self) -> &str {
    match self {
      EngineEvent::RunStarted { .. } => "run:started",
      EngineEvent::RequestStarted { .. } => "request:started",
      EngineEvent::RequestCompleted { .. } => "request:completed",
      EngineEvent::RunCompleted { .. } => "run:completed",
      EngineEvent::Error { .. } => "error",
      EngineEvent::Other { kind, .. } => kind,
    }
  }

  /// The event payload as JSON.
  pub fn data(&self) -> serde_json::Value {
    match self {
      EngineEvent::RunStarted {
        collection_id,
        total_requests,
      } => json!({
        "collectionId": collection_id,
        "totalRequests": total_requests,
      }),
      EngineEvent::RequestStarted {
        request_id,
        iteration,
      } => json!({
        "requestId": request_id,
        "iteration": iteration,
      }),
      EngineEvent::RequestCompleted {
        request_id,
        iteration,
        success,
        result,
      } => json!({
        "requestId": request_id,
        "iteration": iteration,
        "success": success,
        "result": result,
      }),
      EngineEvent::RunCompleted { summary } => json!({ "summary": summary }),
      EngineEvent::Error {
        request_id,
        message,
      } => json!({
        "requestId": request_id,
        "message": message,
      }),
      EngineEvent::Other { payload, .. } => payload.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_known_kinds() {
    let event = EngineEvent::RequestCompleted {
      request_id: "r1".to_string(),
      iteration: 2,
      success: true,
      result: json!({ "status": 200 }),
    };
    assert_eq!(event.kind(), "request:completed");
    assert_eq!(event.data()["requestId"], "r1");
    assert_eq!(event.data()["result"]["status"], 200);
  }

  #[test]
  fn test_other_passes_through() {
    let event = EngineEvent::Other {
      kind: "sse:message".to_string(),
      payload: json!({ "chunk": "data: hi" }),
    };
    assert_eq!(event.kind(), "sse:message");
    assert_eq!(event.data(), json!({ "chunk": "data: hi" }));
  }
}
