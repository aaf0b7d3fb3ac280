//! Package Manager - Entry point the presentation layer calls into
//!
//! Manages the lifecycle of every package operation:
//! - Command building and request validation
//! - Credential prompting for elevated operations
//! - One worker task per install, remove, or update
//! - Audit recording, then result dispatch
//! - Progress visibility while anything is in flight

use crate::core::command::CommandBuilder;
use crate::core::config::FkConfig;
use crate::core::error::OperationError;
use crate::core::traits::{
    Backend, ExecutionResult, FailureCause, Operation, OperationKind, ResultDispatcher,
};
use crate::orchestration::audit::AuditLogger;
use crate::orchestration::search::parse_search_output;
use crate::security::command_executor::{OperationHandle, SafeCommandExecutor};
use crate::security::credential::{self, CredentialPrompt};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Façade over command building, execution, auditing, and dispatch
pub struct PackageManager {
    builder: CommandBuilder,
    executor: SafeCommandExecutor,
    audit: AuditLogger,
    prompt: Arc<dyn CredentialPrompt>,
    dispatcher: Arc<dyn ResultDispatcher>,
    progress: Arc<ProgressTracker>,
}

impl PackageManager {
    /// Create a manager wired from configuration
    pub fn new(
        config: &FkConfig,
        prompt: Arc<dyn CredentialPrompt>,
        dispatcher: Arc<dyn ResultDispatcher>,
    ) -> Self {
        Self::with_parts(
            CommandBuilder::new(config.backend_commands()),
            SafeCommandExecutor::from_config(config),
            AuditLogger::from_config(config),
            prompt,
            dispatcher,
        )
    }

    /// Create a manager from explicitly constructed components
    pub fn with_parts(
        builder: CommandBuilder,
        executor: SafeCommandExecutor,
        audit: AuditLogger,
        prompt: Arc<dyn CredentialPrompt>,
        dispatcher: Arc<dyn ResultDispatcher>,
    ) -> Self {
        Self {
            builder,
            executor,
            audit,
            progress: Arc::new(ProgressTracker::new(Arc::clone(&dispatcher))),
            prompt,
            dispatcher,
        }
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Search the backend's package index
    ///
    /// Runs on a worker task. A non-zero exit with empty stderr is how the
    /// backends report "no matches" and yields an empty list.
    ///
    /// # Errors
    ///
    /// - `OperationError::InvalidOperation` - Empty query
    /// - `OperationError::LaunchFailure` - The backend could not be started
    /// - `OperationError::ProcessFailure` - The backend exited non-zero and
    ///   wrote to stderr
    pub async fn search(
        &self,
        query: &str,
        backend: Backend,
    ) -> Result<Vec<String>, OperationError> {
        let operation = Operation::search(query, backend);
        let spec = self.builder.build(&operation)?;
        let program = spec.program().to_string();

        let executor = self.executor.clone();
        let argv = spec.argv;
        let output = tokio::spawn(async move { executor.run(&argv, None).await })
            .await
            .map_err(|e| OperationError::LaunchFailure {
                program: program.clone(),
                message: e.to_string(),
            })??;

        if !output.status.success() {
            let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if !diagnostic.is_empty() {
                return Err(OperationError::ProcessFailure {
                    program,
                    code: output.status.code(),
                    diagnostic,
                });
            }
        }

        let names = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        tracing::info!(query = %query.trim(), matches = names.len(), "search finished");
        Ok(names)
    }

    pub async fn install(
        &self,
        package: &str,
        backend: Backend,
    ) -> Result<OperationHandle, OperationError> {
        self.submit(Operation::install(package, backend)).await
    }

    /// Remove a package, always through the primary backend
    pub async fn remove(&self, package: &str) -> Result<OperationHandle, OperationError> {
        self.submit(Operation::remove(package)).await
    }

    pub async fn update(&self, backend: Backend) -> Result<OperationHandle, OperationError> {
        self.submit(Operation::update(backend)).await
    }

    /// Launch a mutating operation on its own worker task
    ///
    /// Returns once the process is handed to the worker; the caller is never
    /// blocked on the package manager itself. The worker executes, writes
    /// the audit record, then notifies the dispatcher.
    ///
    /// If execution or auditing dies, an `Aborted` failure is audited and
    /// dispatched in its place. A panic inside the dispatcher's own
    /// `on_result` cannot be reported back to it: the progress indicator is
    /// still hidden and only [`OperationHandle::wait`] sees `Aborted`.
    ///
    /// # Errors
    ///
    /// - `OperationError::InvalidOperation` - Missing target, or a search
    ///   (use [`search`](Self::search))
    /// - `OperationError::CredentialDeclined` - The prompt was cancelled;
    ///   nothing was spawned or audited
    pub async fn submit(&self, operation: Operation) -> Result<OperationHandle, OperationError> {
        if operation.kind() == OperationKind::Search {
            return Err(OperationError::InvalidOperation {
                kind: OperationKind::Search,
                reason: "search does not run as a background operation".to_string(),
            });
        }

        let spec = self.builder.build(&operation)?;

        let credential = if spec.needs_credential {
            let answer = self.prompt.prompt_for_credential(&operation).await;
            match credential::accept(answer) {
                Some(secret) => Some(secret),
                None => {
                    tracing::debug!(operation = %operation, "credential declined");
                    return Err(OperationError::CredentialDeclined {
                        kind: operation.kind(),
                    });
                }
            }
        } else {
            None
        };

        let guard = self.progress.start();
        let executor = self.executor.clone();
        let audit = self.audit.clone();
        let dispatcher = Arc::clone(&self.dispatcher);

        tracing::info!(operation = %operation, backend = ?operation.backend(), "operation started");

        Ok(OperationHandle::spawn(async move {
            let _guard = guard;
            let work = {
                let audit = audit.clone();
                let operation = operation.clone();
                tokio::spawn(async move {
                    let result = executor.execute(&spec.argv, credential).await;
                    audit.record_result(&operation, &result).await;
                    result
                })
            };
            report(work, &operation, &audit, dispatcher.as_ref()).await
        }))
    }
}

/// Wait for the execute-and-audit task, then notify the dispatcher
///
/// A task that died is audited and dispatched as `Aborted`.
async fn report(
    work: JoinHandle<ExecutionResult>,
    operation: &Operation,
    audit: &AuditLogger,
    dispatcher: &dyn ResultDispatcher,
) -> ExecutionResult {
    let result = match work.await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(operation = %operation, error = %e, "operation worker aborted");
            let result = ExecutionResult::failure(
                format!("operation worker aborted: {}", e),
                FailureCause::Aborted,
            );
            audit.record_result(operation, &result).await;
            result
        }
    };
    dispatcher.on_result(operation, &result);
    result
}

/// Counts in-flight operations and toggles the progress indicator on the
/// first start and the last finish
struct ProgressTracker {
    in_flight: Mutex<usize>,
    dispatcher: Arc<dyn ResultDispatcher>,
}

impl ProgressTracker {
    fn new(dispatcher: Arc<dyn ResultDispatcher>) -> Self {
        Self {
            in_flight: Mutex::new(0),
            dispatcher,
        }
    }

    fn start(self: &Arc<Self>) -> ProgressGuard {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight += 1;
        if *in_flight == 1 {
            self.dispatcher.set_progress_visible(true);
        }
        ProgressGuard {
            tracker: Arc::clone(self),
        }
    }

    fn finish(&self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.dispatcher.set_progress_visible(false);
        }
    }
}

/// Released when the worker finishes, including by panic
struct ProgressGuard {
    tracker: Arc<ProgressTracker>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}
