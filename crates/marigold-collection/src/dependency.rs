//! Dependency scoping and validation.
//!
//! [`available_targets`] keeps the containment structure out of `dependsOn`:
//! an item may never depend on itself, an ancestor, or a descendant.
//! [`validate_dependencies`] re-checks that rule on a whole tree and also
//! rejects cycles formed purely through `dependsOn` edges between siblings.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::CollectionError;
use crate::model::{Collection, Item, Request};
use crate::navigator::{NodeSummary, collect_descendant_ids, find_item, find_path, walk};

/// Ids an item must not depend on: itself, its ancestors and its descendants.
pub fn excluded_targets(items: &[Item], item_id: &str) -> Result<HashSet<String>, CollectionError> {
  let not_found = || CollectionError::ItemNotFound {
    item_id: item_id.to_string(),
  };
  let path = find_path(items, item_id).ok_or_else(not_found)?;
  let mut excluded: HashSet<String> = path.iter().map(|item| item.id().to_string()).collect();
  excluded.extend(collect_descendant_ids(items, item_id).ok_or_else(not_found)?);
  Ok(excluded)
}

/// Filter `all_items` down to the legal `dependsOn` targets for `item_id`.
///
/// Order of `all_items` is preserved.
pub fn available_targets(
  collection: &Collection,
  item_id: &str,
  all_items: &[NodeSummary],
) -> Result<Vec<NodeSummary>, CollectionError> {
  let excluded = excluded_targets(&collection.items, item_id)?;
  Ok(
    all_items
      .iter()
      .filter(|summary| !excluded.contains(&summary.id))
      .cloned()
      .collect(),
  )
}

fn requests(items: &[Item]) -> Vec<&Request> {
  let mut found = Vec::new();
  walk(items, &mut |item| {
    if let Item::Request(request) = item {
      found.push(request);
    }
  });
  found
}

/// Check containment rules and acyclicity of every `dependsOn` in the tree.
///
/// Targets that are not part of `items` are ignored: derived trees (filtered
/// runs, ephemeral collections) legitimately drop them.
pub fn validate_dependencies(items: &[Item]) -> Result<(), CollectionError> {
  dependency_order(items).map(|_| ())
}

/// Request ids ordered so that each request comes after everything it depends on.
///
/// Ties are broken by tree order, so a tree without dependencies comes back in
/// its original order.
pub fn dependency_order(items: &[Item]) -> Result<Vec<String>, CollectionError> {
  let requests = requests(items);
  let index: HashMap<&str, usize> = requests
    .iter()
    .enumerate()
    .map(|(i, request)| (request.id.as_str(), i))
    .collect();

  // Edges point from a dependency to its dependent.
  let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); requests.len()];
  let mut in_degree: Vec<usize> = vec![0; requests.len()];

  for (i, request) in requests.iter().enumerate() {
    let Some(depends_on) = &request.depends_on else {
      continue;
    };

    let excluded = excluded_targets(items, &request.id)?;
    let mut upstream: BTreeSet<usize> = BTreeSet::new();

    for target in depends_on {
      if excluded.contains(target) {
        return Err(CollectionError::InvalidDependency {
          request_id: request.id.clone(),
          target: target.clone(),
          relation: relation(items, &request.id, target),
        });
      }

      match find_item(items, target) {
        Some(Item::Request(dep)) => {
          upstream.insert(index[dep.id.as_str()]);
        }
        // A folder dependency waits on every request inside it.
        Some(folder @ Item::Folder(_)) => {
          for dep in requests_under(folder) {
            upstream.insert(index[dep.id.as_str()]);
          }
        }
        None => {}
      }
    }

    for up in upstream {
      dependents[up].push(i);
      in_degree[i] += 1;
    }
  }

  let mut ready: BTreeSet<usize> = (0..requests.len()).filter(|&i| in_degree[i] == 0).collect();
  let mut order = Vec::with_capacity(requests.len());

  while let Some(next) = ready.pop_first() {
    order.push(requests[next].id.clone());
    for &dependent in &dependents[next] {
      in_degree[dependent] -= 1;
      if in_degree[dependent] == 0 {
        ready.insert(dependent);
      }
    }
  }

  if order.len() < requests.len() {
    let involved = (0..requests.len())
      .filter(|&i| in_degree[i] > 0)
      .map(|i| requests[i].id.clone())
      .collect();
    return Err(CollectionError::DependencyCycle { involved });
  }

  Ok(order)
}

fn requests_under(folder: &Item) -> Vec<&Request> {
  requests(folder.children())
}

fn relation(items: &[Item], item_id: &str, target: &str) -> &'static str {
  if item_id == target {
    return "self";
  }
  let is_ancestor = find_path(items, item_id)
    .map(|path| path.iter().any(|item| item.id() == target))
    .unwrap_or(false);
  if is_ancestor { "ancestor" } else { "descendant" }
}
