//! The execution orchestrator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use marigold_collection::{Collection, build_ephemeral_collection, scoped_collection, validate_dependencies};
use marigold_engine::{
  EngineConfig, EngineEvent, EngineFactory, EventListener, RunOptions, VariableSets, Variables,
};
use marigold_store::{CollectionStore, EnvironmentStore, GlobalVariableStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::OrchestratorError;
use crate::events::{ExecutionEnvelope, ExecutionNotifier, NoopNotifier};
use crate::eviction::Evictor;
use crate::params::{
  ExecuteCollectionParams, ExecuteCollectionResult, ExecuteRequestParams, ExecuteRequestResult,
  RunConfig, StopResult,
};
use crate::registry::{ExecutionStatus, ExecutionSummary, NewRun, Registry, RunState, StoppedRun};
use crate::run::CollectionRun;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
  /// Handed to the engine factory on every instantiation.
  pub engine: EngineConfig,
  /// How long a stopped run's state stays queryable.
  pub stop_retention: Duration,
  /// How long a completed or failed run's state stays queryable.
  pub completed_retention: Duration,
}

impl Default for OrchestratorConfig {
  fn default() -> Self {
    Self {
      engine: EngineConfig::default(),
      stop_retention: Duration::from_secs(5),
      completed_retention: Duration::from_secs(5 * 60),
    }
  }
}

/// The storage collaborators.
#[derive(Clone)]
pub struct Stores {
  pub collections: Arc<dyn CollectionStore>,
  pub environments: Arc<dyn EnvironmentStore>,
  pub globals: Arc<dyn GlobalVariableStore>,
}

impl Stores {
  /// Use one store for all three roles.
  pub fn from_shared<S>(store: Arc<S>) -> Self
  where
    S: CollectionStore + EnvironmentStore + GlobalVariableStore + 'static,
  {
    Self {
      collections: store.clone(),
      environments: store.clone(),
      globals: store,
    }
  }
}

/// Drives single-request executions and collection runs.
///
/// Generic over `N: ExecutionNotifier` to allow different notification strategies.
/// Use `Orchestrator::new()` for an orchestrator that discards events,
/// or `Orchestrator::with_notifier()` to provide a custom notifier.
///
/// Construction spawns the eviction task, so it must happen inside a tokio
/// runtime.
pub struct Orchestrator<N: ExecutionNotifier = NoopNotifier> {
  config: OrchestratorConfig,
  stores: Stores,
  factory: Arc<dyn EngineFactory>,
  notifier: Arc<N>,
  registry: Arc<Registry>,
  evictor: Evictor,
  shutdown: CancellationToken,
}

impl Orchestrator<NoopNotifier> {
  /// Create an orchestrator with no-op notifications.
  pub fn new(config: OrchestratorConfig, stores: Stores, factory: Arc<dyn EngineFactory>) -> Self {
    Self::with_notifier(config, stores, factory, NoopNotifier)
  }
}

impl<N: ExecutionNotifier + 'static> Orchestrator<N> {
  /// Create an orchestrator with a custom notifier.
  pub fn with_notifier(
    config: OrchestratorConfig,
    stores: Stores,
    factory: Arc<dyn EngineFactory>,
    notifier: N,
  ) -> Self {
    let registry = Arc::new(Registry::new());
    let shutdown = CancellationToken::new();
    let (evictor, _handle) = Evictor::spawn(Arc::clone(&registry), shutdown.child_token());

    Self {
      config,
      stores,
      factory,
      notifier: Arc::new(notifier),
      registry,
      evictor,
      shutdown,
    }
  }

  /// Run one request inside the context of its collection and wait for it.
  ///
  /// The request runs in an ephemeral collection carrying only its folder
  /// chain, so inherited auth, scripts and options apply while siblings are
  /// skipped. The execution record and the event subscription are released on
  /// every exit path.
  #[instrument(
    name = "execute_request",
    skip(self, params),
    fields(
      execution_id = %params.execution_id,
      request_id = %params.request.id,
    )
  )]
  pub async fn execute_request(
    &self,
    params: ExecuteRequestParams,
  ) -> Result<ExecuteRequestResult, OrchestratorError> {
    self.ensure_open()?;
    let _guard = ExecutionGuard::reserve(&self.registry, &params.execution_id, &params.request.id)?;

    let collection = self
      .stores
      .collections
      .load_collection(&params.workspace_id, &params.collection_id)
      .await?;
    let ephemeral = build_ephemeral_collection(&collection, &params.request)?;
    validate_dependencies(&ephemeral.items)?;

    let engine = self.factory.create(&self.config.engine)?;
    self.registry.attach_engine(&params.execution_id, Arc::clone(&engine));
    let _subscription = engine.subscribe_all(self.forwarder(&params.execution_id, &params.protocol));

    info!(execution_id = %params.execution_id, "request_execution_started");

    let options = RunOptions {
      variables: VariableSets {
        collection: params.collection_variables,
        environment: params.environment_variables,
        global: params.global_variables,
      },
      ..Default::default()
    };

    let results = match engine.run(ephemeral, options).await {
      Ok(results) => results,
      Err(e) => {
        self.registry.set_execution_status(&params.execution_id, ExecutionStatus::Failed);
        warn!(execution_id = %params.execution_id, error = %e, "request_execution_failed");
        return Err(e.into());
      }
    };
    self.registry.set_execution_status(&params.execution_id, ExecutionStatus::Completed);

    let request_id = params.request.id;
    let response = results
      .results
      .iter()
      .find(|r| r.request_id == request_id)
      .or_else(|| results.results.first())
      .cloned()
      .ok_or(OrchestratorError::NoResult { request_id })?;

    info!(
      execution_id = %params.execution_id,
      success = response.success,
      "request_execution_completed"
    );

    Ok(ExecuteRequestResult {
      execution_id: params.execution_id,
      protocol: params.protocol,
      response,
      timestamp: Utc::now(),
    })
  }

  /// Launch a collection run and return as soon as it is registered.
  ///
  /// Failures before registration are returned. Anything afterwards is
  /// reported through [`get_run_status`](Self::get_run_status) and the event
  /// stream.
  #[instrument(
    name = "execute_collection",
    skip(self, params),
    fields(
      run_id = %params.run_id,
      collection_id = %params.collection_id,
    )
  )]
  pub async fn execute_collection(
    &self,
    params: ExecuteCollectionParams,
  ) -> Result<ExecuteCollectionResult, OrchestratorError> {
    self.ensure_open()?;
    self.registry.ensure_available(&params.run_id)?;

    let collection = self
      .stores
      .collections
      .load_collection(&params.workspace_id, &params.collection_id)
      .await?;

    let selected: HashSet<String> = params.selected_request_ids.iter().cloned().collect();
    let scoped = scoped_collection(&collection, &selected);
    validate_dependencies(&scoped.items)?;

    let engine = self.factory.create(&self.config.engine)?;
    let variables = self
      .resolve_variables(&params.workspace_id, &params.config, &scoped)
      .await;

    let protocol = scoped.protocol.clone();
    let cancel = self.shutdown.child_token();
    let options = params.config.to_run_options(variables, cancel.clone());

    let subscription = engine.subscribe_all(self.forwarder(&params.run_id, &protocol));
    let sequence = self.registry.start_run(NewRun {
      run_id: params.run_id.clone(),
      collection_id: scoped.info.id.clone(),
      collection_name: scoped.info.name.clone(),
      protocol: protocol.clone(),
      selected_request_ids: params.selected_request_ids,
      config: params.config,
      engine: Arc::clone(&engine),
      subscription,
      cancel,
    })?;

    info!(
      run_id = %params.run_id,
      requests = scoped.request_count(),
      "collection_run_started"
    );

    let run = CollectionRun {
      run_id: params.run_id.clone(),
      sequence,
      protocol,
      collection: scoped,
      options,
      engine,
      registry: Arc::clone(&self.registry),
      notifier: Arc::clone(&self.notifier),
      evictor: self.evictor.clone(),
      retention: self.config.completed_retention,
    };
    tokio::spawn(run.drive());

    Ok(ExecuteCollectionResult {
      success: true,
      run_id: params.run_id,
    })
  }

  /// Stop an active collection run.
  ///
  /// Unknown or already finished runs yield `success: false` and change
  /// nothing.
  pub fn stop_run(&self, run_id: &str) -> StopResult {
    let Some(stopped) = self.registry.stop_run(run_id) else {
      debug!(run_id = %run_id, "stop_ignored_no_active_run");
      return StopResult { success: false };
    };

    self.announce_stopped(&stopped);
    self
      .evictor
      .schedule(run_id, stopped.sequence, self.config.stop_retention);
    StopResult { success: true }
  }

  /// Current state of a run, if still retained.
  pub fn get_run_status(&self, run_id: &str) -> Option<RunState> {
    self.registry.run_state(run_id)
  }

  /// Drop a finished run's state ahead of its scheduled eviction.
  pub fn release_run(&self, run_id: &str) -> bool {
    self.registry.release_run(run_id)
  }

  pub fn active_executions(&self) -> Vec<ExecutionSummary> {
    self.registry.active_executions()
  }

  fn ensure_open(&self) -> Result<(), OrchestratorError> {
    if self.shutdown.is_cancelled() {
      return Err(OrchestratorError::ShutDown);
    }
    Ok(())
  }

  /// Globals and the configured environment. Either failing to load leaves
  /// that set empty.
  async fn resolve_variables(
    &self,
    workspace_id: &str,
    config: &RunConfig,
    collection: &Collection,
  ) -> VariableSets {
    let global = match self.stores.globals.load_globals().await {
      Ok(variables) => variables,
      Err(e) => {
        warn!(error = %e, "global_variables_unavailable");
        Variables::new()
      }
    };

    let environment = match &config.environment_id {
      Some(environment_id) => {
        match self
          .stores
          .environments
          .load_environment(workspace_id, environment_id)
          .await
        {
          Ok(variables) => variables,
          Err(e) => {
            warn!(environment_id = %environment_id, error = %e, "environment_unavailable");
            Variables::new()
          }
        }
      }
      None => Variables::new(),
    };

    VariableSets {
      collection: collection.variables.clone(),
      environment,
      global,
    }
  }

  /// Republish every engine event tagged with `execution_id` and `protocol`.
  fn forwarder(&self, execution_id: &str, protocol: &str) -> EventListener {
    let notifier = Arc::clone(&self.notifier);
    let execution_id = execution_id.to_string();
    let protocol = protocol.to_string();
    Arc::new(move |event: EngineEvent| {
      notifier.notify(ExecutionEnvelope::from_engine(&execution_id, &protocol, &event));
    })
  }
}

impl<N: ExecutionNotifier> Orchestrator<N> {
  /// Stop every active run and the eviction task.
  ///
  /// Each run ends `Stopped` with a `collection:stopped` event, as if
  /// [`stop_run`](Self::stop_run) had been called on it. Further launches fail
  /// with [`OrchestratorError::ShutDown`].
  pub fn shutdown(&self) {
    if self.shutdown.is_cancelled() {
      return;
    }
    let stopped = self.registry.close();
    self.shutdown.cancel();
    for run in &stopped {
      self.announce_stopped(run);
    }
    info!(stopped = stopped.len(), "orchestrator_shutdown");
  }

  fn announce_stopped(&self, stopped: &StoppedRun) {
    self
      .notifier
      .notify(ExecutionEnvelope::run_stopped(&stopped.run_id, &stopped.protocol));
    info!(run_id = %stopped.run_id, "collection_run_stopped");
  }
}

impl<N: ExecutionNotifier> Drop for Orchestrator<N> {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// Removes a single-request execution record when dropped.
struct ExecutionGuard<'a> {
  registry: &'a Registry,
  execution_id: String,
  sequence: u64,
}

impl<'a> ExecutionGuard<'a> {
  fn reserve(
    registry: &'a Registry,
    execution_id: &str,
    request_id: &str,
  ) -> Result<Self, OrchestratorError> {
    let sequence = registry.reserve_request(execution_id, request_id)?;
    Ok(Self {
      registry,
      execution_id: execution_id.to_string(),
      sequence,
    })
  }
}

impl Drop for ExecutionGuard<'_> {
  fn drop(&mut self) {
    self.registry.remove_request(&self.execution_id, self.sequence);
  }
}
