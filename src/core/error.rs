//! Error handling for package operations
//!
//! This module provides the error taxonomy of the execution pipeline with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use crate::core::traits::OperationKind;
use thiserror::Error;

/// Main error type for package operations
#[derive(Error, Debug)]
pub enum OperationError {
    // Request errors
    #[error("[{kind}] invalid operation: {reason}")]
    InvalidOperation { kind: OperationKind, reason: String },

    // Credential errors
    #[error("[{kind}] credential prompt was declined")]
    CredentialDeclined { kind: OperationKind },

    #[error("[{program}] failed to deliver credential: {message}")]
    CredentialWrite { program: String, message: String },

    // Process errors
    #[error("[{program}] failed to launch: {message}")]
    LaunchFailure { program: String, message: String },

    #[error("[{program}] exited with {}: {diagnostic}", exit_label(.code))]
    ProcessFailure {
        program: String,
        code: Option<i32>,
        diagnostic: String,
    },

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

impl OperationError {
    /// Check if this error should be shown to the user
    ///
    /// A declined credential abandons the operation silently.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::CredentialDeclined { .. })
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidOperation { .. } => vec!["Specify a non-empty package name or query"],
            Self::CredentialDeclined { .. } => vec![],
            Self::CredentialWrite { .. } => vec![
                "Check that the elevation command accepts a password on stdin (sudo -S)",
                "Retry the operation",
            ],
            Self::LaunchFailure { .. } => vec![
                "Check that the package manager is installed and on PATH",
                "Check the backend commands in settings.yaml",
            ],
            Self::ProcessFailure { .. } => vec![
                "Review the diagnostic output above",
                "Check that the password is correct",
                "Check that the package name exists in the enabled repositories",
            ],
            Self::Config(_) => vec![
                "Check ~/.config/fkinstall/settings.yaml for syntax errors",
                "Remove the file to fall back to defaults",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOperation { .. } => "INVALID_OPERATION",
            Self::CredentialDeclined { .. } => "CREDENTIAL_DECLINED",
            Self::CredentialWrite { .. } => "CREDENTIAL_WRITE",
            Self::LaunchFailure { .. } => "LAUNCH_FAILURE",
            Self::ProcessFailure { .. } => "PROCESS_FAILURE",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_operation_error() {
        let error = OperationError::InvalidOperation {
            kind: OperationKind::Install,
            reason: "package name is empty".to_string(),
        };

        assert_eq!(error.code(), "INVALID_OPERATION");
        assert!(error.is_user_visible());
        assert!(error.to_string().contains("install"));
        assert!(error.to_string().contains("package name is empty"));
    }

    #[test]
    fn test_credential_declined_is_silent() {
        let error = OperationError::CredentialDeclined {
            kind: OperationKind::Update,
        };

        assert!(!error.is_user_visible());
        assert!(error.suggested_actions().is_empty());
        assert_eq!(error.code(), "CREDENTIAL_DECLINED");
    }

    #[test]
    fn test_launch_failure_error() {
        let error = OperationError::LaunchFailure {
            program: "yay".to_string(),
            message: "No such file or directory".to_string(),
        };

        assert_eq!(error.code(), "LAUNCH_FAILURE");
        assert!(error.to_string().contains("No such file"));
        assert!(error.suggested_actions().iter().any(|a| a.contains("PATH")));
    }

    #[test]
    fn test_process_failure_display() {
        let error = OperationError::ProcessFailure {
            program: "sudo".to_string(),
            code: Some(1),
            diagnostic: "target not found: nope".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "[sudo] exited with status 1: target not found: nope"
        );

        let signalled = OperationError::ProcessFailure {
            program: "pacman".to_string(),
            code: None,
            diagnostic: String::new(),
        };
        assert!(signalled.to_string().contains("a signal"));
    }

    #[test]
    fn test_config_error() {
        let error = OperationError::Config("bad yaml".to_string());
        assert_eq!(error.code(), "CONFIG_ERROR");
        assert!(error.to_string().contains("bad yaml"));
    }
}
