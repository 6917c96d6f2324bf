//! Tree builders shared by unit tests.

use serde_json::json;

use crate::model::{Auth, AuthConfig, Collection, CollectionInfo, Folder, Item, Request};

pub(crate) fn request(id: &str) -> Item {
  Item::Request(Request {
    id: id.to_string(),
    name: format!("Request {}", id),
    data: json!({ "url": format!("https://example.test/{}", id) }),
    auth: None,
    scripts: None,
    depends_on: None,
    condition: None,
    options: None,
  })
}

pub(crate) fn request_depending(id: &str, depends_on: &[&str]) -> Item {
  match request(id) {
    Item::Request(mut r) => {
      r.depends_on = Some(depends_on.iter().map(|s| s.to_string()).collect());
      Item::Request(r)
    }
    other => other,
  }
}

pub(crate) fn folder(id: &str, items: Vec<Item>) -> Item {
  Item::Folder(Folder {
    id: id.to_string(),
    name: format!("Folder {}", id),
    auth: None,
    scripts: None,
    options: None,
    items,
  })
}

pub(crate) fn folder_with_auth(id: &str, auth: Auth, items: Vec<Item>) -> Item {
  match folder(id, items) {
    Item::Folder(mut f) => {
      f.auth = Some(auth);
      Item::Folder(f)
    }
    other => other,
  }
}

pub(crate) fn bearer(token: &str) -> Auth {
  Auth::Config(AuthConfig {
    auth_type: "bearer".to_string(),
    data: json!({ "token": token }),
  })
}

pub(crate) fn collection(items: Vec<Item>) -> Collection {
  Collection {
    info: CollectionInfo {
      id: "col".to_string(),
      name: "Demo".to_string(),
      version: Some("1.0.0".to_string()),
      description: None,
    },
    protocol: "http".to_string(),
    auth: None,
    variables: None,
    scripts: None,
    items,
    options: None,
    test_data: None,
  }
}
