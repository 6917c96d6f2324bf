//! Single-request collections.
//!
//! An ephemeral collection runs one request with the configuration it would
//! inherit inside its real collection (folder auth, folder scripts, folder
//! options, collection-level settings) and nothing else.

use crate::error::CollectionError;
use crate::model::{Collection, CollectionInfo, Folder, Item, Request};
use crate::navigator::find_path;

/// Suffix appended to the source collection id.
pub const EPHEMERAL_ID_SUFFIX: &str = "-ephemeral";

/// Build a throwaway collection that contains only `request` and its folder chain.
///
/// `request` may carry unsaved edits; only its id is looked up in `collection`.
/// Collection-level optional fields are copied verbatim, so anything unset on
/// the source stays unset here.
pub fn build_ephemeral_collection(
  collection: &Collection,
  request: &Request,
) -> Result<Collection, CollectionError> {
  let not_found = || CollectionError::RequestNotFound {
    collection_id: collection.info.id.clone(),
    request_id: request.id.clone(),
  };

  let path = find_path(&collection.items, &request.id).ok_or_else(not_found)?;
  let Some((Item::Request(_), ancestors)) = path.split_last() else {
    return Err(not_found());
  };

  let mut leaf = Item::Request(request.clone());
  for ancestor in ancestors.iter().rev() {
    if let Item::Folder(folder) = ancestor {
      leaf = Item::Folder(Folder {
        items: vec![leaf],
        ..folder.clone_without_items()
      });
    }
  }

  Ok(Collection {
    info: CollectionInfo {
      id: format!("{}{}", collection.info.id, EPHEMERAL_ID_SUFFIX),
      name: format!("{} (Single Request)", collection.info.name),
      version: collection.info.version.clone(),
      description: collection.info.description.clone(),
    },
    protocol: collection.protocol.clone(),
    auth: collection.auth.clone(),
    variables: collection.variables.clone(),
    scripts: collection.scripts.clone(),
    items: vec![leaf],
    options: collection.options.clone(),
    test_data: collection.test_data.clone(),
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use serde_json::json;

  use super::*;
  use crate::model::{Auth, FolderScripts, Scripts};
  use crate::testing::{bearer, collection, folder, folder_with_auth, request};

  fn edited(id: &str) -> Request {
    Request {
      id: id.to_string(),
      name: "Edited".to_string(),
      data: json!({ "url": "https://example.test/edited" }),
      auth: None,
      scripts: None,
      depends_on: None,
      condition: None,
      options: None,
    }
  }

  fn depth_and_requests(items: &[Item]) -> (usize, Vec<Request>) {
    let mut depth = 0;
    let mut current = items;
    let mut found = Vec::new();
    loop {
      assert_eq!(current.len(), 1, "each level holds a single item");
      match &current[0] {
        Item::Folder(f) => {
          depth += 1;
          current = &f.items;
        }
        Item::Request(r) => {
          found.push(r.clone());
          return (depth, found);
        }
      }
    }
  }

  #[test]
  fn test_keeps_folder_chain_and_drops_siblings() {
    let mut scripted = folder("inner", vec![request("r"), request("sibling")]);
    if let Item::Folder(f) = &mut scripted {
      f.scripts = Some(FolderScripts {
        pre_folder: Some("enter()".to_string()),
        post_folder: None,
        pre_request: Some("before()".to_string()),
        post_request: None,
      });
      f.options = Some(json!({ "timeout": 10 }));
    }
    let col = collection(vec![
      request("top"),
      folder_with_auth("outer", bearer("t"), vec![scripted, request("other")]),
    ]);

    let eph = build_ephemeral_collection(&col, &edited("r")).unwrap();
    let (depth, requests) = depth_and_requests(&eph.items);
    assert_eq!(depth, 2);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, "Edited");

    let Item::Folder(outer) = &eph.items[0] else {
      panic!("expected folder");
    };
    assert_eq!(outer.id, "outer");
    assert_eq!(outer.auth, Some(bearer("t")));

    let Item::Folder(inner) = &outer.items[0] else {
      panic!("expected folder");
    };
    assert_eq!(inner.scripts.as_ref().unwrap().pre_folder.as_deref(), Some("enter()"));
    assert_eq!(inner.options, Some(json!({ "timeout": 10 })));
  }

  #[test]
  fn test_top_level_request_has_no_folders() {
    let col = collection(vec![request("r"), request("s")]);
    let eph = build_ephemeral_collection(&col, &edited("r")).unwrap();
    let (depth, requests) = depth_and_requests(&eph.items);
    assert_eq!(depth, 0);
    assert_eq!(requests[0].id, "r");
  }

  #[test]
  fn test_info_is_derived() {
    let col = collection(vec![request("r")]);
    let eph = build_ephemeral_collection(&col, &edited("r")).unwrap();
    assert_eq!(eph.info.id, "col-ephemeral");
    assert_eq!(eph.info.name, "Demo (Single Request)");
    assert_eq!(eph.protocol, "http");
  }

  #[test]
  fn test_absent_fields_stay_absent() {
    let col = collection(vec![request("r")]);
    let eph = build_ephemeral_collection(&col, &edited("r")).unwrap();
    assert!(eph.auth.is_none());
    assert!(eph.variables.is_none());
    assert!(eph.scripts.is_none());
    assert!(eph.options.is_none());
    assert!(eph.test_data.is_none());
  }

  #[test]
  fn test_present_fields_are_carried() {
    let mut col = collection(vec![request("r")]);
    col.auth = Some(Auth::None);
    col.variables = Some(HashMap::new());
    col.scripts = Some(Scripts::default());
    col.options = Some(json!({}));
    col.test_data = Some(json!([{ "row": 1 }]));

    let eph = build_ephemeral_collection(&col, &edited("r")).unwrap();
    assert_eq!(eph.auth, Some(Auth::None));
    assert_eq!(eph.variables, Some(HashMap::new()));
    assert_eq!(eph.scripts, Some(Scripts::default()));
    assert_eq!(eph.options, Some(json!({})));
    assert_eq!(eph.test_data, Some(json!([{ "row": 1 }])));
  }

  #[test]
  fn test_unknown_request_fails() {
    let col = collection(vec![request("r")]);
    let err = build_ephemeral_collection(&col, &edited("missing")).unwrap_err();
    assert!(matches!(err, CollectionError::RequestNotFound { .. }));
  }

  #[test]
  fn test_folder_id_is_not_a_request() {
    let col = collection(vec![folder("f", vec![request("r")])]);
    let err = build_ephemeral_collection(&col, &edited("f")).unwrap_err();
    assert!(matches!(err, CollectionError::RequestNotFound { .. }));
  }

  #[test]
  fn test_source_is_untouched() {
    let col = collection(vec![folder("f", vec![request("r"), request("s")])]);
    let before = col.clone();
    let _ = build_ephemeral_collection(&col, &edited("r")).unwrap();
    assert_eq!(col, before);
  }
}
