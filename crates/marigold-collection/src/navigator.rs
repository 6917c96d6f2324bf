//! Path finding and subtree extraction over the item tree.
//!
//! All lookups return `None` for an unknown id. Callers decide whether that is
//! an error; nothing here falls back to a default.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Item, ItemKind};

/// Flattened view of a node, used to populate dependency pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
  pub id: String,
  pub name: String,
  pub kind: ItemKind,
}

impl From<&Item> for NodeSummary {
  fn from(item: &Item) -> Self {
    Self {
      id: item.id().to_string(),
      name: item.name().to_string(),
      kind: item.kind(),
    }
  }
}

/// Depth-first search for `target_id`.
///
/// Returns the chain of nodes from the top level down to and including the
/// target, so every element but the last is an enclosing folder.
pub fn find_path<'a>(items: &'a [Item], target_id: &str) -> Option<Vec<&'a Item>> {
  for item in items {
    if item.id() == target_id {
      return Some(vec![item]);
    }
    if let Item::Folder(folder) = item
      && let Some(mut path) = find_path(&folder.items, target_id)
    {
      path.insert(0, item);
      return Some(path);
    }
  }
  None
}

/// Find a single node anywhere in the tree.
pub fn find_item<'a>(items: &'a [Item], target_id: &str) -> Option<&'a Item> {
  find_path(items, target_id).and_then(|path| path.last().copied())
}

/// Every id strictly below `target_id`. Requests have an empty subtree.
pub fn collect_descendant_ids(items: &[Item], target_id: &str) -> Option<HashSet<String>> {
  let target = find_item(items, target_id)?;
  let mut ids = HashSet::new();
  collect_ids(target.children(), &mut ids);
  Some(ids)
}

fn collect_ids(items: &[Item], ids: &mut HashSet<String>) {
  for item in items {
    ids.insert(item.id().to_string());
    collect_ids(item.children(), ids);
  }
}

/// Flatten the tree in pre-order, folders before their children.
pub fn collect_all_node_summaries(items: &[Item]) -> Vec<NodeSummary> {
  let mut summaries = Vec::new();
  walk(items, &mut |item| summaries.push(NodeSummary::from(item)));
  summaries
}

/// Visit every node in pre-order.
pub(crate) fn walk<'a>(items: &'a [Item], visit: &mut impl FnMut(&'a Item)) {
  for item in items {
    visit(item);
    walk(item.children(), visit);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{folder, request};

  fn tree() -> Vec<Item> {
    vec![
      request("a"),
      folder(
        "x",
        vec![request("b"), folder("y", vec![request("c")]), request("d")],
      ),
      request("e"),
    ]
  }

  fn ids(path: &[&Item]) -> Vec<String> {
    path.iter().map(|item| item.id().to_string()).collect()
  }

  #[test]
  fn test_find_path_top_level() {
    let items = tree();
    let path = find_path(&items, "a").unwrap();
    assert_eq!(ids(&path), vec!["a"]);
  }

  #[test]
  fn test_find_path_nested_ends_at_target() {
    let items = tree();
    let path = find_path(&items, "c").unwrap();
    assert_eq!(ids(&path), vec!["x", "y", "c"]);
  }

  #[test]
  fn test_find_path_every_request() {
    let items = tree();
    for id in ["a", "b", "c", "d", "e"] {
      let path = find_path(&items, id).unwrap();
      assert_eq!(path.last().unwrap().id(), id);
    }
  }

  #[test]
  fn test_find_path_missing() {
    let items = tree();
    assert!(find_path(&items, "missing").is_none());
    assert!(find_path(&[], "a").is_none());
  }

  #[test]
  fn test_descendants_of_folder() {
    let items = tree();
    let descendants = collect_descendant_ids(&items, "x").unwrap();
    let expected: HashSet<String> = ["b", "y", "c", "d"].iter().map(|s| s.to_string()).collect();
    assert_eq!(descendants, expected);
  }

  #[test]
  fn test_descendants_of_request_is_empty() {
    let items = tree();
    assert!(collect_descendant_ids(&items, "b").unwrap().is_empty());
    assert!(collect_descendant_ids(&items, "nope").is_none());
  }

  #[test]
  fn test_summaries_preserve_order() {
    let items = tree();
    let summaries = collect_all_node_summaries(&items);
    let order: Vec<&str> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(order, vec!["a", "x", "b", "y", "c", "d", "e"]);
    assert_eq!(summaries[1].kind, ItemKind::Folder);
    assert_eq!(summaries[2].kind, ItemKind::Request);
  }
}
