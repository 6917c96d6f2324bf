use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use marigold_collection::Collection;

use crate::variables::Variables;
use crate::{CollectionStore, EnvironmentStore, GlobalVariableStore, StoreError};

type WorkspaceKey = (String, String);

/// In-memory store.
///
/// Collections and environments are keyed by `(workspace_id, id)`.
#[derive(Default)]
pub struct MemoryStore {
  collections: RwLock<HashMap<WorkspaceKey, Collection>>,
  environments: RwLock<HashMap<WorkspaceKey, Variables>>,
  globals: RwLock<Variables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a collection under its own `info.id`.
  pub fn insert_collection(&self, workspace_id: &str, collection: Collection) {
    let key = (workspace_id.to_string(), collection.info.id.clone());
    self
      .collections
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key, collection);
  }

  /// Store an environment's enabled variables.
  pub fn insert_environment(&self, workspace_id: &str, environment_id: &str, variables: Variables) {
    let key = (workspace_id.to_string(), environment_id.to_string());
    self
      .environments
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key, variables);
  }

  /// Replace the global variables.
  pub fn set_globals(&self, variables: Variables) {
    *self.globals.write().unwrap_or_else(PoisonError::into_inner) = variables;
  }
}

#[async_trait]
impl CollectionStore for MemoryStore {
  async fn load_collection(
    &self,
    workspace_id: &str,
    collection_id: &str,
  ) -> Result<Collection, StoreError> {
    let key = (workspace_id.to_string(), collection_id.to_string());
    self
      .collections
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
      .cloned()
      .ok_or_else(|| StoreError::CollectionNotFound {
        workspace_id: workspace_id.to_string(),
        collection_id: collection_id.to_string(),
      })
  }
}

#[async_trait]
impl EnvironmentStore for MemoryStore {
  async fn load_environment(
    &self,
    workspace_id: &str,
    environment_id: &str,
  ) -> Result<Variables, StoreError> {
    let key = (workspace_id.to_string(), environment_id.to_string());
    self
      .environments
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&key)
      .cloned()
      .ok_or_else(|| StoreError::EnvironmentNotFound {
        workspace_id: workspace_id.to_string(),
        environment_id: environment_id.to_string(),
      })
  }
}

#[async_trait]
impl GlobalVariableStore for MemoryStore {
  async fn load_globals(&self) -> Result<Variables, StoreError> {
    Ok(self.globals.read().unwrap_or_else(PoisonError::into_inner).clone())
  }
}
