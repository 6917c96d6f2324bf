//! Inputs and outputs of the public operations.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use marigold_collection::Request;
use marigold_engine::{ExecutionOptions, RequestResult, RunOptions, VariableSets, Variables};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Parameters for running one request in the context of its collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequestParams {
  pub execution_id: String,
  pub protocol: String,
  pub workspace_id: String,
  pub collection_id: String,
  /// The request to run, possibly with unsaved edits.
  pub request: Request,
  #[serde(default)]
  pub collection_variables: Option<Variables>,
  #[serde(default)]
  pub environment_variables: Variables,
  #[serde(default)]
  pub global_variables: Variables,
}

/// Response of a single-request execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequestResult {
  pub execution_id: String,
  pub protocol: String,
  pub response: RequestResult,
  pub timestamp: DateTime<Utc>,
}

/// Configuration of a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
  #[serde(default = "default_iterations")]
  pub iterations: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub environment_id: Option<String>,
  /// CSV/JSON file providing per-iteration data.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data_file: Option<PathBuf>,
  /// Ignore test data embedded in the collection.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ignore_collection_test_data: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delay_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bail: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub validate_certificates: Option<bool>,
}

fn default_iterations() -> u32 {
  1
}

impl Default for RunConfig {
  fn default() -> Self {
    Self {
      iterations: default_iterations(),
      environment_id: None,
      data_file: None,
      ignore_collection_test_data: None,
      delay_ms: None,
      bail: None,
      max_concurrency: None,
      timeout_ms: None,
      validate_certificates: None,
    }
  }
}

impl RunConfig {
  /// Derive engine run options.
  ///
  /// Execution sub-options are only set when at least one of them was given.
  pub fn to_run_options(&self, variables: VariableSets, cancel: CancellationToken) -> RunOptions {
    let execution = ExecutionOptions {
      delay_ms: self.delay_ms,
      bail: self.bail,
      max_concurrency: self.max_concurrency,
    };

    RunOptions {
      variables,
      iterations: Some(self.iterations.max(1)),
      data_file: self.data_file.clone(),
      ignore_collection_test_data: self.ignore_collection_test_data,
      execution: (!execution.is_empty()).then_some(execution),
      timeout_ms: self.timeout_ms,
      validate_certificates: self.validate_certificates,
      cancel: Some(cancel),
    }
  }
}

/// Parameters for launching a collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCollectionParams {
  pub run_id: String,
  pub workspace_id: String,
  pub collection_id: String,
  /// Requests to run. Empty means every request in the collection.
  #[serde(default)]
  pub selected_request_ids: Vec<String>,
  #[serde(default)]
  pub config: RunConfig,
}

/// Immediate acknowledgement of a collection launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCollectionResult {
  pub success: bool,
  pub run_id: String,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResult {
  pub success: bool,
}
