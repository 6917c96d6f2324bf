//! Marigold Collection
//!
//! This crate provides the collection tree model and every derived view the
//! orchestrator needs before handing a tree to a request engine:
//!
//! - [`navigator`] finds paths, subtrees and flattened node lists
//! - [`auth`] resolves inherited authentication up the folder chain
//! - [`dependency`] scopes legal `dependsOn` targets and rejects cycles
//! - [`ephemeral`] carves a single-request collection out of a full one
//! - [`scope`] prunes a collection to a selection of requests
//!
//! Nothing here mutates its input. Every derived tree is a fresh value so the
//! same `Collection` can be shared across concurrent executions.

pub mod auth;
pub mod dependency;
pub mod ephemeral;
mod error;
mod model;
pub mod navigator;
pub mod scope;

#[cfg(test)]
mod testing;

pub use auth::{AuthSource, AuthSourceKind, ResolvedAuth, effective_auth, resolve_inherited_auth};
pub use dependency::{available_targets, dependency_order, excluded_targets, validate_dependencies};
pub use ephemeral::build_ephemeral_collection;
pub use error::CollectionError;
pub use model::{
  Auth, AuthConfig, Collection, CollectionInfo, Folder, FolderScripts, Item, ItemKind, Request,
  Scripts,
};
pub use navigator::{
  NodeSummary, collect_all_node_summaries, collect_descendant_ids, find_item, find_path,
};
pub use scope::{filter_items, scoped_collection};
