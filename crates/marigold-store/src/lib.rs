//! Marigold Store
//!
//! Storage traits for the data an execution is built from, loaded fresh for
//! every launch:
//!
//! - [`CollectionStore`] loads a collection tree by workspace and id
//! - [`EnvironmentStore`] loads the enabled variables of a named environment
//! - [`GlobalVariableStore`] loads the enabled global variables
//!
//! [`FsStore`] reads JSON files from a data directory; [`MemoryStore`] keeps
//! everything in memory for embedding and tests.

mod fs_store;
mod memory;
mod variables;

use async_trait::async_trait;
use marigold_collection::Collection;

pub use fs_store::FsStore;
pub use memory::MemoryStore;
pub use variables::{Variable, VariableFile, Variables};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// No collection with this id exists in the workspace.
  #[error("collection '{collection_id}' not found in workspace '{workspace_id}'")]
  CollectionNotFound {
    workspace_id: String,
    collection_id: String,
  },

  /// No environment with this id exists in the workspace.
  #[error("environment '{environment_id}' not found in workspace '{workspace_id}'")]
  EnvironmentNotFound {
    workspace_id: String,
    environment_id: String,
  },

  /// An identifier that cannot be mapped to a storage location.
  #[error("invalid identifier: {0}")]
  InvalidId(String),

  /// Reading from storage failed.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Stored data could not be parsed.
  #[error("malformed data: {0}")]
  Json(#[from] serde_json::Error),
}

/// Loads persisted collections.
#[async_trait]
pub trait CollectionStore: Send + Sync {
  async fn load_collection(
    &self,
    workspace_id: &str,
    collection_id: &str,
  ) -> Result<Collection, StoreError>;
}

/// Loads environments as flat maps of their enabled variables.
#[async_trait]
pub trait EnvironmentStore: Send + Sync {
  async fn load_environment(
    &self,
    workspace_id: &str,
    environment_id: &str,
  ) -> Result<Variables, StoreError>;
}

/// Loads the enabled global variables. A store with no globals yields an empty map.
#[async_trait]
pub trait GlobalVariableStore: Send + Sync {
  async fn load_globals(&self) -> Result<Variables, StoreError>;
}
