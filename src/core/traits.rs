//! Core traits and types for package operations
//!
//! This module defines the value objects that flow through the execution
//! pipeline (operations and their results) and the seams the presentation
//! layer plugs into.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Operations
// ============================================================================

/// Kind of package action requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Search,
    Install,
    Remove,
    Update,
}

impl OperationKind {
    /// Whether this kind operates on a named package
    pub fn needs_target(&self) -> bool {
        !matches!(self, Self::Update)
    }

    /// Whether this kind mutates system state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Search)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Install => "install",
            Self::Remove => "remove",
            Self::Update => "update",
        };
        f.write_str(name)
    }
}

/// Package manager backend an operation targets
///
/// `Primary` requires explicit elevation on every call; `Alternate` is
/// expected to elevate on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Primary,
    Alternate,
}

impl Backend {
    /// Parse a backend from user input ("primary", "pacman", "alternate", "yay")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "primary" | "pacman" => Some(Self::Primary),
            "alternate" | "yay" => Some(Self::Alternate),
            _ => None,
        }
    }
}

/// One requested package action
///
/// Operations are immutable once created and consumed exactly once by the
/// executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    kind: OperationKind,
    backend: Backend,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

impl Operation {
    /// Create an operation from its parts
    ///
    /// Removal is pinned to the primary backend whatever `backend` says,
    /// and an update never carries a target.
    pub fn new(kind: OperationKind, backend: Backend, target: Option<String>) -> Self {
        let backend = match kind {
            OperationKind::Remove => Backend::Primary,
            _ => backend,
        };
        let target = target.filter(|_| kind.needs_target());
        Self {
            kind,
            backend,
            target,
        }
    }

    pub fn search(query: impl Into<String>, backend: Backend) -> Self {
        Self::new(OperationKind::Search, backend, Some(query.into()))
    }

    pub fn install(package: impl Into<String>, backend: Backend) -> Self {
        Self::new(OperationKind::Install, backend, Some(package.into()))
    }

    /// Removal always goes through the primary backend.
    pub fn remove(package: impl Into<String>) -> Self {
        Self::new(OperationKind::Remove, Backend::Primary, Some(package.into()))
    }

    pub fn update(backend: Backend) -> Self {
        Self::new(OperationKind::Update, backend, None)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// True iff the primary backend is asked to mutate system state
    pub fn requires_credential(&self) -> bool {
        self.backend == Backend::Primary
            && matches!(
                self.kind,
                OperationKind::Install | OperationKind::Remove | OperationKind::Update
            )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} {}", self.kind, target),
            None => write!(f, "{}", self.kind),
        }
    }
}

// ============================================================================
// Execution results
// ============================================================================

/// Why an operation ended in failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// The process could not be started
    Launch,
    /// The credential could not be delivered to the process
    CredentialWrite,
    /// The process ran and exited unsuccessfully
    NonZeroExit { code: Option<i32> },
    /// The worker running the process died before reporting
    Aborted,
}

/// Terminal outcome of one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionResult {
    Success { output: Vec<u8> },
    Failure {
        diagnostic: Vec<u8>,
        cause: FailureCause,
    },
}

impl ExecutionResult {
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn failure(diagnostic: impl Into<Vec<u8>>, cause: FailureCause) -> Self {
        Self::Failure {
            diagnostic: diagnostic.into(),
            cause,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Captured bytes: stdout on success, the diagnostic on failure
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Success { output } => output,
            Self::Failure { diagnostic, .. } => diagnostic,
        }
    }

    /// Captured bytes decoded lossily for display
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }
}

// ============================================================================
// Result Dispatcher
// ============================================================================

/// Receiver of operation outcomes on the presentation side
///
/// The core only talks to the UI through this trait; it never holds a
/// reference to a presentation object.
pub trait ResultDispatcher: Send + Sync {
    /// Called once per launched operation, after its audit record is written
    fn on_result(&self, operation: &Operation, result: &ExecutionResult);

    /// Show or hide the progress indicator
    fn set_progress_visible(&self, visible: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_has_no_target() {
        let op = Operation::update(Backend::Alternate);
        assert_eq!(op.kind(), OperationKind::Update);
        assert!(op.target().is_none());
        assert!(!op.kind().needs_target());

        let stray = Operation::new(OperationKind::Update, Backend::Primary, Some("vim".into()));
        assert!(stray.target().is_none());
        assert_eq!(stray.to_string(), "update");
    }

    #[test]
    fn test_requires_credential_matrix() {
        assert!(Operation::install("vim", Backend::Primary).requires_credential());
        assert!(!Operation::install("vim", Backend::Alternate).requires_credential());
        assert!(Operation::update(Backend::Primary).requires_credential());
        assert!(!Operation::update(Backend::Alternate).requires_credential());
        assert!(Operation::remove("vim").requires_credential());
        assert!(!Operation::search("vim", Backend::Primary).requires_credential());
        assert!(!Operation::search("vim", Backend::Alternate).requires_credential());
    }

    #[test]
    fn test_remove_targets_primary_backend() {
        assert_eq!(Operation::remove("htop").backend(), Backend::Primary);
        let pinned = Operation::new(OperationKind::Remove, Backend::Alternate, Some("htop".into()));
        assert_eq!(pinned.backend(), Backend::Primary);
        assert!(pinned.requires_credential());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(Backend::parse("pacman"), Some(Backend::Primary));
        assert_eq!(Backend::parse(" YAY "), Some(Backend::Alternate));
        assert_eq!(Backend::parse("apt"), None);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::install("vim", Backend::Primary).to_string(), "install vim");
        assert_eq!(Operation::update(Backend::Primary).to_string(), "update");
    }

    #[test]
    fn test_execution_result_accessors() {
        let ok = ExecutionResult::success(b"ok".to_vec());
        assert!(ok.is_success());
        assert_eq!(ok.bytes(), b"ok");

        let failed = ExecutionResult::failure(
            b"denied".to_vec(),
            FailureCause::NonZeroExit { code: Some(1) },
        );
        assert!(!failed.is_success());
        assert_eq!(failed.text(), "denied");
    }

    #[test]
    fn test_execution_result_serialization() {
        let result = ExecutionResult::failure(b"x".to_vec(), FailureCause::Launch);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""status":"failure""#));
        assert!(json.contains(r#""cause":"launch""#));
    }
}
