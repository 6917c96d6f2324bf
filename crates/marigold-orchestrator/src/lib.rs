//! Marigold Orchestrator
//!
//! Turns "run this request" and "run this collection" into engine
//! invocations, tracks them while they are in flight and republishes their
//! events to a single observer.
//!
//! ```text
//! execute_request(params)                    execute_collection(params)
//!   reserve execution id                        load collection
//!   load collection                             scope to selection
//!   build ephemeral collection                  validate dependencies
//!   create engine, subscribe                    create engine, resolve variables
//!   await engine.run  ──> result                subscribe, register run
//!   release subscription + record               spawn engine.run ──> {success, runId}
//!                                                 │
//!                                                 └─> run state + events
//! ```
//!
//! Every event is wrapped in an [`ExecutionEnvelope`] tagged with the
//! execution or run id, so concurrent executions can share one
//! [`ExecutionNotifier`].

mod error;
mod events;
mod eviction;
mod orchestrator;
mod params;
mod registry;
mod run;

pub use error::OrchestratorError;
pub use events::{
  ChannelNotifier, ExecutionEnvelope, ExecutionNotifier, NoopNotifier, RUN_ERROR_EVENT,
  RUN_STOPPED_EVENT,
};
pub use orchestrator::{Orchestrator, OrchestratorConfig, Stores};
pub use params::{
  ExecuteCollectionParams, ExecuteCollectionResult, ExecuteRequestParams, ExecuteRequestResult,
  RunConfig, StopResult,
};
pub use registry::{ExecutionKind, ExecutionStatus, ExecutionSummary, RunState, RunStatus};
