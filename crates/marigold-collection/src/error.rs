use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectionError {
  #[error("item not found in collection: {item_id}")]
  ItemNotFound { item_id: String },

  #[error("request '{request_id}' not found in collection '{collection_id}'")]
  RequestNotFound {
    collection_id: String,
    request_id: String,
  },

  #[error("request '{request_id}' cannot depend on '{target}': target is its {relation}")]
  InvalidDependency {
    request_id: String,
    target: String,
    relation: &'static str,
  },

  #[error("dependency cycle between requests: {}", involved.join(", "))]
  DependencyCycle { involved: Vec<String> },
}
