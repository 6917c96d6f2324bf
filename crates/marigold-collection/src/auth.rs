//! Authentication inheritance.
//!
//! The nearest enclosing node with a terminal auth decision wins. `inherit`
//! (or no `auth` field at all) defers to the next level up; anything else,
//! including an explicit `none`, ends the walk.

use serde::{Deserialize, Serialize};

use crate::error::CollectionError;
use crate::model::{Auth, AuthConfig, Collection, Item};
use crate::navigator::find_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSourceKind {
  Collection,
  Folder,
  Request,
}

/// The node that produced a terminal auth decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSource {
  pub kind: AuthSourceKind,
  pub id: String,
  pub name: String,
}

/// Outcome of an auth resolution.
///
/// | `auth`  | `source` | meaning                                  |
/// |---------|----------|------------------------------------------|
/// | `Some`  | `Some`   | concrete auth decided by `source`        |
/// | `None`  | `Some`   | explicit `none` decided by `source`      |
/// | `None`  | `None`   | nothing configured anywhere in the chain |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAuth {
  pub auth: Option<AuthConfig>,
  pub source: Option<AuthSource>,
}

impl ResolvedAuth {
  fn unconfigured() -> Self {
    Self {
      auth: None,
      source: None,
    }
  }

  fn decided(auth: &Auth, source: AuthSource) -> Self {
    let auth = match auth {
      Auth::Config(config) => Some(config.clone()),
      Auth::None | Auth::Inherit => None,
    };
    Self {
      auth,
      source: Some(source),
    }
  }

  /// An explicit `none` somewhere in the chain suppressed authentication.
  pub fn is_explicit_none(&self) -> bool {
    self.auth.is_none() && self.source.is_some()
  }

  /// No node in the chain made any decision.
  pub fn is_unconfigured(&self) -> bool {
    self.auth.is_none() && self.source.is_none()
  }
}

fn terminal(auth: Option<&Auth>) -> Option<&Auth> {
  auth.filter(|auth| auth.is_terminal())
}

fn item_source(item: &Item) -> AuthSource {
  let kind = match item {
    Item::Folder(_) => AuthSourceKind::Folder,
    Item::Request(_) => AuthSourceKind::Request,
  };
  AuthSource {
    kind,
    id: item.id().to_string(),
    name: item.name().to_string(),
  }
}

/// Resolve what `item_id` inherits from its enclosing folders and the collection.
///
/// The item's own `auth` is not consulted; see [`effective_auth`] for that.
pub fn resolve_inherited_auth(
  collection: &Collection,
  item_id: &str,
) -> Result<ResolvedAuth, CollectionError> {
  let path = find_path(&collection.items, item_id).ok_or_else(|| CollectionError::ItemNotFound {
    item_id: item_id.to_string(),
  })?;

  let ancestors = &path[..path.len() - 1];
  for folder in ancestors.iter().rev() {
    if let Some(auth) = terminal(folder.auth()) {
      return Ok(ResolvedAuth::decided(auth, item_source(folder)));
    }
  }

  if let Some(auth) = terminal(collection.auth.as_ref()) {
    let source = AuthSource {
      kind: AuthSourceKind::Collection,
      id: collection.info.id.clone(),
      name: collection.info.name.clone(),
    };
    return Ok(ResolvedAuth::decided(auth, source));
  }

  Ok(ResolvedAuth::unconfigured())
}

/// Resolve the auth that will actually apply to `item_id`.
///
/// A terminal auth on the item itself wins; otherwise falls back to
/// [`resolve_inherited_auth`].
pub fn effective_auth(collection: &Collection, item_id: &str) -> Result<ResolvedAuth, CollectionError> {
  let path = find_path(&collection.items, item_id).ok_or_else(|| CollectionError::ItemNotFound {
    item_id: item_id.to_string(),
  })?;

  if let Some(item) = path.last()
    && let Some(auth) = terminal(item.auth())
  {
    return Ok(ResolvedAuth::decided(auth, item_source(item)));
  }

  resolve_inherited_auth(collection, item_id)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{bearer, collection, folder, folder_with_auth, request};

  #[test]
  fn test_folder_bearer_is_inherited() {
    let col = collection(vec![folder_with_auth(
      "f",
      bearer("folder-token"),
      vec![request("r")],
    )]);

    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    let auth = resolved.auth.clone().unwrap();
    assert_eq!(auth.auth_type, "bearer");
    assert_eq!(auth.data["token"], "folder-token");

    let source = resolved.source.unwrap();
    assert_eq!(source.kind, AuthSourceKind::Folder);
    assert_eq!(source.id, "f");
    assert_eq!(source.name, "Folder f");
  }

  #[test]
  fn test_folder_none_is_terminal_and_distinct() {
    let col = collection(vec![folder_with_auth("f", Auth::None, vec![request("r")])]);

    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    assert!(resolved.auth.is_none());
    assert!(resolved.is_explicit_none());
    assert!(!resolved.is_unconfigured());
    assert_eq!(resolved.source.unwrap().kind, AuthSourceKind::Folder);
  }

  #[test]
  fn test_nothing_configured() {
    let col = collection(vec![folder("f", vec![request("r")])]);
    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    assert!(resolved.is_unconfigured());
  }

  #[test]
  fn test_nearest_ancestor_wins() {
    let col = collection(vec![folder_with_auth(
      "outer",
      bearer("outer"),
      vec![folder_with_auth("inner", bearer("inner"), vec![request("r")])],
    )]);

    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    assert_eq!(resolved.auth.unwrap().data["token"], "inner");
  }

  #[test]
  fn test_inherit_folder_defers_to_collection() {
    let mut col = collection(vec![folder_with_auth(
      "f",
      Auth::Inherit,
      vec![request("r")],
    )]);
    col.auth = Some(bearer("root"));

    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    assert_eq!(resolved.auth.unwrap().data["token"], "root");
    assert_eq!(resolved.source.unwrap().kind, AuthSourceKind::Collection);
  }

  #[test]
  fn test_none_overrides_collection_auth() {
    let mut col = collection(vec![folder_with_auth(
      "outer",
      Auth::None,
      vec![folder("inner", vec![request("r")])],
    )]);
    col.auth = Some(bearer("root"));

    let resolved = resolve_inherited_auth(&col, "r").unwrap();
    assert!(resolved.is_explicit_none());
    assert_eq!(resolved.source.unwrap().id, "outer");
  }

  #[test]
  fn test_resolution_is_deterministic() {
    let mut col = collection(vec![folder("f", vec![request("r")])]);
    col.auth = Some(bearer("root"));

    let first = resolve_inherited_auth(&col, "r").unwrap();
    let second = resolve_inherited_auth(&col, "r").unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_unknown_item() {
    let col = collection(vec![request("r")]);
    let err = resolve_inherited_auth(&col, "missing").unwrap_err();
    assert!(matches!(err, CollectionError::ItemNotFound { .. }));
  }

  #[test]
  fn test_effective_auth_prefers_own() {
    let mut r = request("r");
    if let Item::Request(req) = &mut r {
      req.auth = Some(bearer("own"));
    }
    let col = collection(vec![folder_with_auth("f", bearer("folder"), vec![r])]);

    let resolved = effective_auth(&col, "r").unwrap();
    assert_eq!(resolved.auth.unwrap().data["token"], "own");
    assert_eq!(resolved.source.unwrap().kind, AuthSourceKind::Request);

    let inherited = resolve_inherited_auth(&col, "r").unwrap();
    assert_eq!(inherited.auth.unwrap().data["token"], "folder");
  }
}
