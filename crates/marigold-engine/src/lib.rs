//! Marigold Engine
//!
//! The contract between the orchestrator and a request engine. The engine
//! sends requests and runs scripts; none of that lives here. This crate only
//! describes the surface the orchestrator drives:
//!
//! ```text
//! EngineFactory::create(config) -> RequestEngine   (fresh per invocation)
//! RequestEngine::subscribe_all(listener) -> Subscription
//! RequestEngine::run(collection, options) -> RunResult
//! ```
//!
//! Engines are created per invocation so a plugin installed a moment ago is
//! picked up by the next run without restarting the process.

mod emitter;
mod events;
mod options;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use marigold_collection::Collection;

pub use emitter::{EventEmitter, EventListener, Subscription};
pub use events::EngineEvent;
pub use options::{ExecutionOptions, RequestResult, RunOptions, RunResult, VariableSets, Variables};

/// Errors reported by an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// The engine could not be constructed, e.g. a plugin failed to load.
  #[error("failed to create engine: {message}")]
  Setup { message: String },

  /// No plugin handles the collection's protocol.
  #[error("unsupported protocol: {protocol}")]
  UnsupportedProtocol { protocol: String },

  /// The run itself failed.
  #[error("execution failed: {message}")]
  Execution { message: String },

  /// The run observed its cancellation token.
  #[error("run cancelled")]
  Cancelled,
}

/// Configuration passed to every engine instantiation.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
  /// Directories searched for protocol plugins.
  pub plugin_search_paths: Vec<PathBuf>,
}

/// A request engine instance.
#[async_trait]
pub trait RequestEngine: Send + Sync {
  /// Execute every request in `collection`.
  async fn run(&self, collection: Collection, options: RunOptions) -> Result<RunResult, EngineError>;

  /// Receive every event this engine emits until the subscription is dropped.
  fn subscribe_all(&self, listener: EventListener) -> Subscription;
}

/// Builds engine instances.
pub trait EngineFactory: Send + Sync {
  fn create(&self, config: &EngineConfig) -> Result<Arc<dyn RequestEngine>, EngineError>;
}
