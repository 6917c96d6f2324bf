//! Run options handed to an engine and the results it returns.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Variables by name.
pub type Variables = HashMap<String, String>;

/// Variable sets visible to a run, from lowest to highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSets {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub collection: Option<Variables>,
  #[serde(default)]
  pub environment: Variables,
  #[serde(default)]
  pub global: Variables,
}

/// Scheduling knobs for a collection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
  /// Pause between consecutive requests.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delay_ms: Option<u64>,
  /// Stop the run at the first failed request.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bail: Option<bool>,
  /// Upper bound on requests in flight at once.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<u32>,
}

impl ExecutionOptions {
  pub fn is_empty(&self) -> bool {
    self.delay_ms.is_none() && self.bail.is_none() && self.max_concurrency.is_none()
  }
}

/// Everything an engine needs besides the collection itself.
///
/// Unset fields mean "engine default".
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub variables: VariableSets,
  pub iterations: Option<u32>,
  pub data_file: Option<PathBuf>,
  pub ignore_collection_test_data: Option<bool>,
  pub execution: Option<ExecutionOptions>,
  pub timeout_ms: Option<u64>,
  pub validate_certificates: Option<bool>,
  /// Advisory: the engine should stop promptly once this fires.
  pub cancel: Option<CancellationToken>,
}

/// Outcome of one request in one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResult {
  pub request_id: String,
  #[serde(default)]
  pub iteration: u32,
  pub success: bool,
  #[serde(default)]
  pub response: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
  pub results: Vec<RequestResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summary: Option<serde_json::Value>,
}

impl RunResult {
  pub fn passed(&self) -> usize {
    self.results.iter().filter(|r| r.success).count()
  }

  pub fn failed(&self) -> usize {
    self.results.len() - self.passed()
  }
}
