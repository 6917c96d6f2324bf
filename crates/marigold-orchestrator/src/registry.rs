//! Execution and run-state registries.
//!
//! Both maps live behind one mutex so a stop racing a completion sees a
//! consistent pair. No lock is held across an await point.
//!
//! ```text
//! execution:  Created -> Running -> Completed | Failed | Cancelled
//! run:        Pending -> Running -> Completed | Error  | Stopped
//! ```
//!
//! Every execution takes a fresh sequence number. Completions, removals and
//! evictions carry the sequence they were issued for, so a late outcome from
//! a stopped run can never overwrite a relaunch under the same id.
//!
//! A collection run's event subscription is owned by its execution record.
//! It is dropped the moment the run stops or finishes, so an engine that
//! keeps going after cancellation publishes into nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use marigold_engine::{RequestEngine, RunResult, Subscription};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::OrchestratorError;
use crate::params::RunConfig;

/// What an execution is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
  Request,
  Collection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  Created,
  Running,
  Completed,
  Failed,
  Cancelled,
}

impl ExecutionStatus {
  pub fn is_active(self) -> bool {
    matches!(self, Self::Created | Self::Running)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Pending,
  Running,
  Completed,
  Stopped,
  Error,
}

impl RunStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Stopped | Self::Error)
  }
}

/// Status of a collection run as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
  pub run_id: String,
  /// Distinguishes relaunches under the same run id.
  pub sequence: u64,
  pub collection_id: String,
  pub collection_name: String,
  pub protocol: String,
  pub selected_request_ids: Vec<String>,
  pub config: RunConfig,
  pub status: RunStatus,
  pub started_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub results: Option<RunResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

/// Public view of a live execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
  pub id: String,
  pub kind: ExecutionKind,
  /// Request id for single requests, collection id for runs.
  pub source_id: String,
  pub status: ExecutionStatus,
  pub started_at: DateTime<Utc>,
}

struct ExecutionRecord {
  kind: ExecutionKind,
  source_id: String,
  status: ExecutionStatus,
  started_at: DateTime<Utc>,
  // Held so the engine lives as long as the execution is tracked.
  #[allow(dead_code)]
  engine: Option<Arc<dyn RequestEngine>>,
  cancel: Option<CancellationToken>,
  // Collection runs only. Dropping it unsubscribes the run's forwarder.
  #[allow(dead_code)]
  subscription: Option<Subscription>,
  sequence: u64,
}

impl ExecutionRecord {
  fn summary(&self, id: &str) -> ExecutionSummary {
    ExecutionSummary {
      id: id.to_string(),
      kind: self.kind,
      source_id: self.source_id.clone(),
      status: self.status,
      started_at: self.started_at,
    }
  }

  /// Release the engine and unsubscribe once the execution is over.
  ///
  /// Runs under the registry lock, so nobody sees the final status while the
  /// run can still publish. Unsubscribing only touches the engine's emitter.
  fn retire(&mut self, status: ExecutionStatus) {
    self.status = status;
    self.engine = None;
    self.subscription = None;
  }
}

/// Everything needed to register a collection run.
pub(crate) struct NewRun {
  pub run_id: String,
  pub collection_id: String,
  pub collection_name: String,
  pub protocol: String,
  pub selected_request_ids: Vec<String>,
  pub config: RunConfig,
  pub engine: Arc<dyn RequestEngine>,
  pub subscription: Subscription,
  pub cancel: CancellationToken,
}

/// A run that was just stopped.
#[derive(Debug)]
pub(crate) struct StoppedRun {
  pub run_id: String,
  pub sequence: u64,
  pub protocol: String,
}

#[derive(Default)]
struct Inner {
  executions: HashMap<String, ExecutionRecord>,
  runs: HashMap<String, RunState>,
  next_sequence: u64,
  closed: bool,
}

impl Inner {
  fn check_available(&self, id: &str) -> Result<(), OrchestratorError> {
    if self.closed {
      return Err(OrchestratorError::ShutDown);
    }
    let busy_execution = self.executions.get(id).is_some_and(|r| r.status.is_active());
    let busy_run = self.runs.get(id).is_some_and(|r| !r.status.is_terminal());
    if busy_execution || busy_run {
      return Err(OrchestratorError::DuplicateExecution {
        execution_id: id.to_string(),
      });
    }
    Ok(())
  }

  fn take_sequence(&mut self) -> u64 {
    let sequence = self.next_sequence;
    self.next_sequence += 1;
    sequence
  }

  /// Stop the collection run registered under `run_id`, if it is in flight.
  ///
  /// Dropping the removed execution record unsubscribes the run.
  fn stop(&mut self, run_id: &str) -> Option<StoppedRun> {
    let active = self
      .executions
      .get(run_id)
      .is_some_and(|r| r.kind == ExecutionKind::Collection && r.status.is_active());
    if !active || !self.runs.contains_key(run_id) {
      return None;
    }

    let record = self.executions.remove(run_id)?;
    if let Some(cancel) = &record.cancel {
      cancel.cancel();
    }

    let state = self.runs.get_mut(run_id)?;
    state.status = RunStatus::Stopped;
    state.completed_at = Some(Utc::now());

    let stopped = StoppedRun {
      run_id: run_id.to_string(),
      sequence: state.sequence,
      protocol: state.protocol.clone(),
    };
    drop(record);
    Some(stopped)
  }
}

#[derive(Default)]
pub(crate) struct Registry {
  inner: Mutex<Inner>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Fail if `id` names an execution or run that is still in flight.
  pub fn ensure_available(&self, id: &str) -> Result<(), OrchestratorError> {
    self.lock().check_available(id)
  }

  /// Register a single-request execution in the `Created` state.
  ///
  /// Returns the sequence that [`remove_request`](Self::remove_request)
  /// must present.
  pub fn reserve_request(&self, execution_id: &str, request_id: &str) -> Result<u64, OrchestratorError> {
    let mut inner = self.lock();
    inner.check_available(execution_id)?;
    let sequence = inner.take_sequence();
    inner.executions.insert(
      execution_id.to_string(),
      ExecutionRecord {
        kind: ExecutionKind::Request,
        source_id: request_id.to_string(),
        status: ExecutionStatus::Created,
        started_at: Utc::now(),
        engine: None,
        cancel: None,
        subscription: None,
        sequence,
      },
    );
    Ok(sequence)
  }

  /// Attach the engine driving `execution_id` and mark it running.
  pub fn attach_engine(&self, execution_id: &str, engine: Arc<dyn RequestEngine>) {
    if let Some(record) = self.lock().executions.get_mut(execution_id) {
      record.engine = Some(engine);
      record.status = ExecutionStatus::Running;
    }
  }

  pub fn set_execution_status(&self, execution_id: &str, status: ExecutionStatus) {
    if let Some(record) = self.lock().executions.get_mut(execution_id) {
      record.status = status;
    }
  }

  /// Drop a single-request record, unless the id has since been taken by
  /// another execution.
  pub fn remove_request(&self, execution_id: &str, sequence: u64) -> bool {
    let mut inner = self.lock();
    let owned = inner
      .executions
      .get(execution_id)
      .is_some_and(|r| r.kind == ExecutionKind::Request && r.sequence == sequence);
    owned && inner.executions.remove(execution_id).is_some()
  }

  /// Register a collection run: a `Pending` run state plus a `Created`
  /// execution holding the engine, its subscription and the cancellation
  /// token.
  ///
  /// Returns the sequence number of this run. On rejection the subscription
  /// is dropped with `run`.
  pub fn start_run(&self, run: NewRun) -> Result<u64, OrchestratorError> {
    let mut inner = self.lock();
    inner.check_available(&run.run_id)?;

    let sequence = inner.take_sequence();
    let started_at = Utc::now();

    inner.executions.insert(
      run.run_id.clone(),
      ExecutionRecord {
        kind: ExecutionKind::Collection,
        source_id: run.collection_id.clone(),
        status: ExecutionStatus::Created,
        started_at,
        engine: Some(run.engine),
        cancel: Some(run.cancel),
        subscription: Some(run.subscription),
        sequence,
      },
    );
    inner.runs.insert(
      run.run_id.clone(),
      RunState {
        run_id: run.run_id,
        sequence,
        collection_id: run.collection_id,
        collection_name: run.collection_name,
        protocol: run.protocol,
        selected_request_ids: run.selected_request_ids,
        config: run.config,
        status: RunStatus::Pending,
        started_at,
        completed_at: None,
        results: None,
        error: None,
      },
    );

    Ok(sequence)
  }

  /// Move a pending run to `Running`. Returns false if it was stopped first.
  pub fn mark_running(&self, run_id: &str, sequence: u64) -> bool {
    let mut inner = self.lock();
    let Some(state) = inner.runs.get_mut(run_id) else {
      return false;
    };
    if state.sequence != sequence || state.status != RunStatus::Pending {
      return false;
    }
    state.status = RunStatus::Running;
    if let Some(record) = Self::run_execution(&mut inner, run_id, sequence) {
      record.status = ExecutionStatus::Running;
    }
    true
  }

  /// Record a successful outcome. Ignored unless the run is still in flight.
  pub fn complete_run(&self, run_id: &str, sequence: u64, results: RunResult) -> bool {
    let mut inner = self.lock();
    let Some(state) = Self::live_run(&mut inner, run_id, sequence) else {
      return false;
    };
    state.status = RunStatus::Completed;
    state.completed_at = Some(Utc::now());
    state.results = Some(results);
    if let Some(record) = Self::run_execution(&mut inner, run_id, sequence) {
      record.retire(ExecutionStatus::Completed);
    }
    true
  }

  /// Record a failed outcome. Ignored unless the run is still in flight.
  pub fn fail_run(&self, run_id: &str, sequence: u64, error: String) -> bool {
    let mut inner = self.lock();
    let Some(state) = Self::live_run(&mut inner, run_id, sequence) else {
      return false;
    };
    state.status = RunStatus::Error;
    state.completed_at = Some(Utc::now());
    state.error = Some(error);
    if let Some(record) = Self::run_execution(&mut inner, run_id, sequence) {
      record.retire(ExecutionStatus::Failed);
    }
    true
  }

  /// Stop an in-flight run.
  ///
  /// Requires an active execution record and a run state. Fires the
  /// cancellation token, marks the run `Stopped`, drops the execution record
  /// and with it the run's event subscription. The run state stays for the
  /// caller to evict later.
  pub fn stop_run(&self, run_id: &str) -> Option<StoppedRun> {
    self.lock().stop(run_id)
  }

  /// Stop every in-flight collection run and refuse new executions.
  pub fn close(&self) -> Vec<StoppedRun> {
    let mut inner = self.lock();
    inner.closed = true;
    let run_ids: Vec<String> = inner
      .executions
      .iter()
      .filter(|(_, r)| r.kind == ExecutionKind::Collection && r.status.is_active())
      .map(|(id, _)| id.clone())
      .collect();
    let mut stopped: Vec<StoppedRun> = run_ids.iter().filter_map(|id| inner.stop(id)).collect();
    stopped.sort_by_key(|run| run.sequence);
    stopped
  }

  pub fn run_state(&self, run_id: &str) -> Option<RunState> {
    self.lock().runs.get(run_id).cloned()
  }

  /// Drop a finished run and its execution record.
  ///
  /// Returns false for unknown or still running runs.
  pub fn release_run(&self, run_id: &str) -> bool {
    let mut inner = self.lock();
    let Some(sequence) = inner
      .runs
      .get(run_id)
      .filter(|state| state.status.is_terminal())
      .map(|state| state.sequence)
    else {
      return false;
    };
    inner.runs.remove(run_id);
    if inner.executions.get(run_id).is_some_and(|r| r.sequence == sequence) {
      inner.executions.remove(run_id);
    }
    true
  }

  /// Timed eviction of a finished run, scoped to the run generation.
  pub fn evict_run(&self, run_id: &str, sequence: u64) -> bool {
    let mut inner = self.lock();
    let matches = inner
      .runs
      .get(run_id)
      .is_some_and(|state| state.sequence == sequence && state.status.is_terminal());
    if !matches {
      return false;
    }
    inner.runs.remove(run_id);
    if inner.executions.get(run_id).is_some_and(|r| r.sequence == sequence) {
      inner.executions.remove(run_id);
    }
    true
  }

  /// Executions that are created or running, oldest first.
  pub fn active_executions(&self) -> Vec<ExecutionSummary> {
    let inner = self.lock();
    let mut active: Vec<ExecutionSummary> = inner
      .executions
      .iter()
      .filter(|(_, record)| record.status.is_active())
      .map(|(id, record)| record.summary(id))
      .collect();
    active.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
    active
  }

  fn live_run<'a>(inner: &'a mut Inner, run_id: &str, sequence: u64) -> Option<&'a mut RunState> {
    inner
      .runs
      .get_mut(run_id)
      .filter(|state| state.sequence == sequence && !state.status.is_terminal())
  }

  fn run_execution<'a>(
    inner: &'a mut Inner,
    run_id: &str,
    sequence: u64,
  ) -> Option<&'a mut ExecutionRecord> {
    inner
      .executions
      .get_mut(run_id)
      .filter(|record| record.kind == ExecutionKind::Collection && record.sequence == sequence)
  }
}
