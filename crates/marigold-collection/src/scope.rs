//! Pruning a collection down to a selection of requests.

use std::collections::HashSet;

use crate::model::{Collection, Folder, Item};

/// Rebuild `items` keeping only the selected requests and the folders that
/// still contain something afterwards.
///
/// An empty selection means "run everything" and returns the tree unchanged.
pub fn filter_items(items: &[Item], selected_ids: &HashSet<String>) -> Vec<Item> {
  if selected_ids.is_empty() {
    return items.to_vec();
  }
  prune(items, selected_ids)
}

fn prune(items: &[Item], selected_ids: &HashSet<String>) -> Vec<Item> {
  items
    .iter()
    .filter_map(|item| match item {
      Item::Request(request) => selected_ids
        .contains(&request.id)
        .then(|| item.clone()),
      Item::Folder(folder) => {
        let children = prune(&folder.items, selected_ids);
        (!children.is_empty()).then(|| {
          Item::Folder(Folder {
            items: children,
            ..folder.clone_without_items()
          })
        })
      }
    })
    .collect()
}

/// Copy of `collection` whose tree is restricted to `selected_ids`.
pub fn scoped_collection(collection: &Collection, selected_ids: &HashSet<String>) -> Collection {
  Collection {
    items: filter_items(&collection.items, selected_ids),
    ..collection.clone()
  }
}
