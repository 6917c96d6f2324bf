use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use marigold_collection::Collection;
use tokio::fs;
use tracing::debug;

use crate::variables::{VariableFile, Variables};
use crate::{CollectionStore, EnvironmentStore, GlobalVariableStore, StoreError};

/// Filesystem-based store.
///
/// Data is laid out under a single root:
/// ```text
/// {root}/
/// ├── globals.json
/// └── workspaces/
///     └── {workspace_id}/
///         ├── collections/{collection_id}.json
///         └── environments/{environment_id}.json
/// ```
pub struct FsStore {
  root: PathBuf,
}

impl FsStore {
  /// Create a store rooted at the given data directory.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Get the root directory of the store.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn workspace_dir(&self, workspace_id: &str) -> Result<PathBuf, StoreError> {
    Ok(self.root.join("workspaces").join(checked(workspace_id)?))
  }

  fn collection_path(&self, workspace_id: &str, collection_id: &str) -> Result<PathBuf, StoreError> {
    Ok(
      self
        .workspace_dir(workspace_id)?
        .join("collections")
        .join(format!("{}.json", checked(collection_id)?)),
    )
  }

  fn environment_path(
    &self,
    workspace_id: &str,
    environment_id: &str,
  ) -> Result<PathBuf, StoreError> {
    Ok(
      self
        .workspace_dir(workspace_id)?
        .join("environments")
        .join(format!("{}.json", checked(environment_id)?)),
    )
  }

  /// List collection ids stored in a workspace, sorted.
  pub async fn list_collections(&self, workspace_id: &str) -> Result<Vec<String>, StoreError> {
    let dir = self.workspace_dir(workspace_id)?.join("collections");
    let mut entries = match fs::read_dir(&dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => return Err(e.into()),
    };

    let mut ids = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
      let path = entry.path();
      if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        continue;
      }
      if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
        ids.push(stem.to_string());
      }
    }
    ids.sort();
    Ok(ids)
  }
}

/// Reject identifiers that would escape their directory.
fn checked(id: &str) -> Result<&str, StoreError> {
  let invalid = id.is_empty()
    || id == "."
    || id == ".."
    || id.contains(['/', '\\'])
    || id.contains('\0');
  if invalid {
    return Err(StoreError::InvalidId(id.to_string()));
  }
  Ok(id)
}

/// Read a file, mapping a missing file to `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
  match fs::read_to_string(path).await {
    Ok(content) => Ok(Some(content)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e.into()),
  }
}

#[async_trait]
impl CollectionStore for FsStore {
  async fn load_collection(
    &self,
    workspace_id: &str,
    collection_id: &str,
  ) -> Result<Collection, StoreError> {
    let path = self.collection_path(workspace_id, collection_id)?;
    let content = read_optional(&path)
      .await?
      .ok_or_else(|| StoreError::CollectionNotFound {
        workspace_id: workspace_id.to_string(),
        collection_id: collection_id.to_string(),
      })?;

    debug!(path = %path.display(), "loaded collection");
    Ok(serde_json::from_str(&content)?)
  }
}

#[async_trait]
impl EnvironmentStore for FsStore {
  async fn load_environment(
    &self,
    workspace_id: &str,
    environment_id: &str,
  ) -> Result<Variables, StoreError> {
    let path = self.environment_path(workspace_id, environment_id)?;
    let content = read_optional(&path)
      .await?
      .ok_or_else(|| StoreError::EnvironmentNotFound {
        workspace_id: workspace_id.to_string(),
        environment_id: environment_id.to_string(),
      })?;

    let file: VariableFile = serde_json::from_str(&content)?;
    Ok(file.enabled())
  }
}

#[async_trait]
impl GlobalVariableStore for FsStore {
  async fn load_globals(&self) -> Result<Variables, StoreError> {
    let path = self.root.join("globals.json");
    match read_optional(&path).await? {
      Some(content) => {
        let file: VariableFile = serde_json::from_str(&content)?;
        Ok(file.enabled())
      }
      None => Ok(Variables::new()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_checked_rejects_traversal() {
    assert!(checked("abc-123").is_ok());
    assert!(checked("").is_err());
    assert!(checked("..").is_err());
    assert!(checked("../etc").is_err());
    assert!(checked("a\\b").is_err());
  }

  #[test]
  fn test_collection_path_layout() {
    let store = FsStore::new("/data");
    let path = store.collection_path("ws", "col").unwrap();
    assert_eq!(path, PathBuf::from("/data/workspaces/ws/collections/col.json"));
  }
}
