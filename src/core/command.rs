//! Command builder for package manager invocations
//!
//! Turns an [`Operation`] into the exact argument vector handed to the
//! executor, along with whether an elevation credential has to be streamed
//! to the process.

use crate::core::config::BackendCommands;
use crate::core::error::OperationError;
use crate::core::traits::{Backend, Operation, OperationKind};

/// Fully resolved invocation for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program followed by its arguments
    pub argv: Vec<String>,
    /// Whether a credential must be written to stdin
    pub needs_credential: bool,
}

impl CommandSpec {
    /// Program name (first element of argv)
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program name
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// Builds argument vectors from the configured backend commands
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    commands: BackendCommands,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(BackendCommands::default())
    }
}

impl CommandBuilder {
    pub fn new(commands: BackendCommands) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &BackendCommands {
        &self.commands
    }

    /// Build the invocation for an operation
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidOperation` if the operation needs a
    /// target and none (or only whitespace) was given.
    pub fn build(&self, operation: &Operation) -> Result<CommandSpec, OperationError> {
        let kind = operation.kind();
        let target = operation.target().map(str::trim).unwrap_or_default();
        if kind.needs_target() && target.is_empty() {
            return Err(OperationError::InvalidOperation {
                kind,
                reason: "a package name or query is required".to_string(),
            });
        }

        let primary = self.commands.primary.as_str();
        let alternate = self.commands.alternate.as_str();
        let elevation = self.commands.elevation.as_str();
        let backend_cmd = match operation.backend() {
            Backend::Primary => primary,
            Backend::Alternate => alternate,
        };

        let argv: Vec<&str> = match (kind, operation.backend()) {
            (OperationKind::Search, _) => vec![backend_cmd, "-Ss", target],
            (OperationKind::Install, Backend::Primary) => {
                vec![elevation, "-S", primary, "-S", "--noconfirm", target]
            }
            (OperationKind::Install, Backend::Alternate) => {
                vec![alternate, "-S", "--noconfirm", target]
            }
            // Removal is always routed through the primary manager.
            (OperationKind::Remove, _) => vec![elevation, primary, "-Rcc", "--noconfirm", target],
            (OperationKind::Update, Backend::Primary) => {
                vec![elevation, "-S", primary, "-Syu", "--noconfirm"]
            }
            (OperationKind::Update, Backend::Alternate) => vec![alternate, "-Syu", "--noconfirm"],
        };

        Ok(CommandSpec {
            argv: argv.into_iter().map(str::to_string).collect(),
            needs_credential: operation.requires_credential(),
        })
    }
}
