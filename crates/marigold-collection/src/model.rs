//! Collection tree types.
//!
//! These mirror the persisted JSON form of a collection. Optional fields stay
//! `Option` all the way through so that "unset" survives a round trip and is
//! never confused with "empty".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identifying metadata of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// A concrete authentication configuration, e.g. `bearer` with a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
  #[serde(rename = "type")]
  pub auth_type: String,
  #[serde(default)]
  pub data: serde_json::Value,
}

/// Authentication as written on a collection, folder or request.
///
/// An absent `auth` field deserializes to `None` on the owning struct and is
/// treated exactly like [`Auth::Inherit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAuth", into = "RawAuth")]
pub enum Auth {
  /// Explicitly no authentication. Stops inheritance.
  None,
  /// Take whatever the enclosing folder or collection decides.
  Inherit,
  /// A concrete configuration.
  Config(AuthConfig),
}

impl Auth {
  /// Whether this value settles the effective auth, i.e. is not `inherit`.
  pub fn is_terminal(&self) -> bool {
    !matches!(self, Auth::Inherit)
  }
}

#[derive(Serialize, Deserialize)]
struct RawAuth {
  #[serde(rename = "type")]
  auth_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  data: Option<serde_json::Value>,
}

impl From<RawAuth> for Auth {
  fn from(raw: RawAuth) -> Self {
    match raw.auth_type.as_str() {
      "none" => Auth::None,
      "inherit" => Auth::Inherit,
      _ => Auth::Config(AuthConfig {
        auth_type: raw.auth_type,
        data: raw.data.unwrap_or(serde_json::Value::Null),
      }),
    }
  }
}

impl From<Auth> for RawAuth {
  fn from(auth: Auth) -> Self {
    match auth {
      Auth::None => RawAuth {
        auth_type: "none".to_string(),
        data: None,
      },
      Auth::Inherit => RawAuth {
        auth_type: "inherit".to_string(),
        data: None,
      },
      Auth::Config(config) => RawAuth {
        auth_type: config.auth_type,
        data: Some(config.data),
      },
    }
  }
}

/// Scripts attached to a request or to the collection root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scripts {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pre_request: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub post_request: Option<String>,
}

/// The four script slots a folder can carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderScripts {
  /// Runs once when execution enters the folder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pre_folder: Option<String>,
  /// Runs once when execution leaves the folder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub post_folder: Option<String>,
  /// Runs before every request inside the folder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pre_request: Option<String>,
  /// Runs after every request inside the folder.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub post_request: Option<String>,
}

/// A folder node. Child order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auth: Option<Auth>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scripts: Option<FolderScripts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<serde_json::Value>,
  #[serde(default)]
  pub items: Vec<Item>,
}

impl Folder {
  /// Copy of this folder's own configuration with no children.
  pub(crate) fn clone_without_items(&self) -> Folder {
    Folder {
      id: self.id.clone(),
      name: self.name.clone(),
      auth: self.auth.clone(),
      scripts: self.scripts.clone(),
      options: self.options.clone(),
      items: Vec::new(),
    }
  }
}

/// A request node. `data` is the protocol-specific payload and is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub data: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auth: Option<Auth>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scripts: Option<Scripts>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub depends_on: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<serde_json::Value>,
}

/// A node in the collection tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
  Folder(Folder),
  Request(Request),
}

impl Item {
  pub fn id(&self) -> &str {
    match self {
      Item::Folder(folder) => &folder.id,
      Item::Request(request) => &request.id,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Item::Folder(folder) => &folder.name,
      Item::Request(request) => &request.name,
    }
  }

  pub fn kind(&self) -> ItemKind {
    match self {
      Item::Folder(_) => ItemKind::Folder,
      Item::Request(_) => ItemKind::Request,
    }
  }

  pub fn auth(&self) -> Option<&Auth> {
    match self {
      Item::Folder(folder) => folder.auth.as_ref(),
      Item::Request(request) => request.auth.as_ref(),
    }
  }

  /// Children of a folder; requests have none.
  pub fn children(&self) -> &[Item] {
    match self {
      Item::Folder(folder) => &folder.items,
      Item::Request(_) => &[],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
  Folder,
  Request,
}

/// A persisted collection: metadata, inherited configuration and the item tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
  pub info: CollectionInfo,
  pub protocol: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub auth: Option<Auth>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variables: Option<HashMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scripts: Option<Scripts>,
  #[serde(default)]
  pub items: Vec<Item>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub test_data: Option<serde_json::Value>,
}

impl Collection {
  /// Look up a request anywhere in the tree.
  pub fn find_request(&self, request_id: &str) -> Option<&Request> {
    match crate::navigator::find_item(&self.items, request_id) {
      Some(Item::Request(request)) => Some(request),
      _ => None,
    }
  }

  /// Number of requests in the tree.
  pub fn request_count(&self) -> usize {
    fn count(items: &[Item]) -> usize {
      items
        .iter()
        .map(|item| match item {
          Item::Folder(folder) => count(&folder.items),
          Item::Request(_) => 1,
        })
        .sum()
    }
    count(&self.items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_auth_from_json() {
    let none: Auth = serde_json::from_value(json!({"type": "none"})).unwrap();
    assert_eq!(none, Auth::None);

    let inherit: Auth = serde_json::from_value(json!({"type": "inherit"})).unwrap();
    assert_eq!(inherit, Auth::Inherit);
    assert!(!inherit.is_terminal());

    let bearer: Auth =
      serde_json::from_value(json!({"type": "bearer", "data": {"token": "abc"}})).unwrap();
    assert_eq!(
      bearer,
      Auth::Config(AuthConfig {
        auth_type: "bearer".to_string(),
        data: json!({"token": "abc"}),
      })
    );
    assert!(bearer.is_terminal());
  }

  #[test]
  fn test_collection_parses_nested_items() {
    let collection: Collection = serde_json::from_value(json!({
      "info": {"id": "c1", "name": "Demo"},
      "protocol": "http",
      "items": [
        {"type": "request", "id": "a", "name": "A", "data": {"url": "https://a"}},
        {"type": "folder", "id": "f", "name": "F", "auth": {"type": "none"}, "items": [
          {"type": "request", "id": "b", "name": "B", "dependsOn": ["a"]}
        ]}
      ]
    }))
    .unwrap();

    assert_eq!(collection.request_count(), 2);
    assert!(collection.variables.is_none());
    assert!(collection.test_data.is_none());

    let b = collection.find_request("b").unwrap();
    assert_eq!(b.depends_on.as_deref(), Some(&["a".to_string()][..]));
    assert!(collection.find_request("f").is_none());
  }

  #[test]
  fn test_absent_fields_are_not_serialized() {
    let collection = Collection {
      info: CollectionInfo {
        id: "c1".to_string(),
        name: "Demo".to_string(),
        version: None,
        description: None,
      },
      protocol: "http".to_string(),
      auth: None,
      variables: None,
      scripts: None,
      items: vec![],
      options: None,
      test_data: None,
    };

    let value = serde_json::to_value(&collection).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("auth"));
    assert!(!object.contains_key("variables"));
    assert!(!object.contains_key("testData"));
  }
}
