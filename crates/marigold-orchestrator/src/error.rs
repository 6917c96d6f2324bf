//! Orchestrator errors.
//!
//! Everything here is a precondition failure reported to the caller of a
//! launch operation. Failures inside an already acknowledged collection run
//! never surface as an error value; they land in the run state and on the
//! event stream instead.

use marigold_collection::CollectionError;
use marigold_engine::EngineError;
use marigold_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
  /// The collection could not be loaded.
  #[error(transparent)]
  Store(#[from] StoreError),

  /// The tree to execute could not be derived or failed validation.
  #[error(transparent)]
  Collection(#[from] CollectionError),

  /// The engine could not be created, or a single request failed.
  #[error(transparent)]
  Engine(#[from] EngineError),

  /// An execution with this id is still in flight.
  #[error("execution '{execution_id}' is already running")]
  DuplicateExecution { execution_id: String },

  /// The engine finished without a result for the request.
  #[error("engine returned no result for request '{request_id}'")]
  NoResult { request_id: String },

  /// The orchestrator no longer accepts work.
  #[error("orchestrator is shut down")]
  ShutDown,
}
