//! SafeCommandExecutor: asynchronous package manager execution
//!
//! # Security Features
//!
//! - **Allow-list validation**: Only the configured backend programs can execute
//! - **Injection prevention**: Arguments are passed as a vector to
//!   `tokio::process::Command`, never interpolated into a shell string
//! - **Credential isolation**: The elevation secret is written once to the
//!   child's stdin, stdin is closed, and the secret is zeroized on drop
//! - **Output redaction**: Captured bytes are scrubbed of the secret and of
//!   elevation prompts before leaving the executor
//!
//! # Example
//!
//! ```rust,no_run
//! use fkinstall::SafeCommandExecutor;
//!
//! # async fn demo() {
//! let executor = SafeCommandExecutor::new(["pacman"]);
//! let argv = vec!["pacman".to_string(), "-Ss".to_string(), "vim".to_string()];
//! let result = executor.execute(&argv, None).await;
//! println!("{}", result.text());
//! # }
//! ```

use crate::core::config::FkConfig;
use crate::core::error::OperationError;
use crate::core::traits::{ExecutionResult, FailureCause};
use crate::security::redaction;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Safe command executor with an allow-list of launchable programs
///
/// Cloning is cheap enough to hand one copy to every worker task.
#[derive(Debug, Clone)]
pub struct SafeCommandExecutor {
    allowed_commands: Vec<String>,
}

impl SafeCommandExecutor {
    /// Create an executor that may launch exactly the given programs
    ///
    /// # Example
    ///
    /// ```rust
    /// use fkinstall::SafeCommandExecutor;
    ///
    /// let executor = SafeCommandExecutor::new(["sudo", "pacman", "yay"]);
    /// assert!(executor.is_allowed("pacman"));
    /// assert!(!executor.is_allowed("rm"));
    /// ```
    pub fn new<I, S>(allowed_commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_commands: allowed_commands.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an executor allowing the configured backend programs
    pub fn from_config(config: &FkConfig) -> Self {
        Self::new(config.allowed_commands())
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allowed_commands.iter().any(|allowed| allowed == program)
    }

    /// Run a command to completion and return its raw captured output
    ///
    /// The exit status is not interpreted here; callers that need the
    /// Success/Failure mapping use [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// - `OperationError::LaunchFailure` - Empty argv, program not allowed,
    ///   binary missing, or permission denied at exec time
    /// - `OperationError::CredentialWrite` - The secret could not be written
    ///   to the child's stdin
    pub async fn run(
        &self,
        argv: &[String],
        credential: Option<SecretString>,
    ) -> Result<Output, OperationError> {
        self.run_with(argv, credential.as_ref()).await
    }

    /// Execute a command and map its outcome to an [`ExecutionResult`]
    ///
    /// Exit status 0 yields `Success` with stdout; anything else yields
    /// `Failure` with stderr. Launch and credential delivery problems are
    /// reported as `Failure` as well, so every call resolves to exactly one
    /// result.
    pub async fn execute(
        &self,
        argv: &[String],
        credential: Option<SecretString>,
    ) -> ExecutionResult {
        let result = match self.run_with(argv, credential.as_ref()).await {
            Ok(output) if output.status.success() => ExecutionResult::success(output.stdout),
            Ok(output) => ExecutionResult::failure(
                output.stderr,
                FailureCause::NonZeroExit {
                    code: output.status.code(),
                },
            ),
            Err(e @ OperationError::CredentialWrite { .. }) => {
                ExecutionResult::failure(e.to_string(), FailureCause::CredentialWrite)
            }
            Err(e) => ExecutionResult::failure(e.to_string(), FailureCause::Launch),
        };

        let result = redaction::scrub_result(result, credential.as_ref());
        drop(credential);

        tracing::info!(
            program = argv.first().map(String::as_str).unwrap_or_default(),
            success = result.is_success(),
            "command finished"
        );
        result
    }

    /// Execute a command on its own worker task
    ///
    /// The caller is not blocked; the outcome is collected from the
    /// returned handle.
    pub fn spawn(&self, argv: Vec<String>, credential: Option<SecretString>) -> OperationHandle {
        let executor = self.clone();
        OperationHandle::spawn(async move { executor.execute(&argv, credential).await })
    }

    async fn run_with(
        &self,
        argv: &[String],
        credential: Option<&SecretString>,
    ) -> Result<Output, OperationError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(OperationError::LaunchFailure {
                program: String::new(),
                message: "empty command line".to_string(),
            });
        };

        // Allow-list validation: only configured backend programs
        if !self.is_allowed(program) {
            return Err(OperationError::LaunchFailure {
                program: program.clone(),
                message: "command is not in the allowed list".to_string(),
            });
        }

        tracing::debug!(
            program = %program,
            args = ?args,
            with_credential = credential.is_some(),
            "spawning command"
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(if credential.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OperationError::LaunchFailure {
                program: program.clone(),
                message: e.to_string(),
            })?;

        if let Some(secret) = credential {
            // The pipe is closed when `stdin` goes out of scope.
            let write_result = match child.stdin.take() {
                Some(mut stdin) => write_credential(&mut stdin, secret).await,
                None => Err(std::io::Error::other("stdin was not captured")),
            };

            if let Err(e) = write_result {
                // Reap the child so it does not linger as a zombie.
                let _ = child.wait_with_output().await;
                return Err(OperationError::CredentialWrite {
                    program: program.clone(),
                    message: e.to_string(),
                });
            }
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| OperationError::LaunchFailure {
                program: program.clone(),
                message: e.to_string(),
            })
    }
}

/// Write the secret followed by a newline, then close the stream
async fn write_credential(
    stdin: &mut tokio::process::ChildStdin,
    secret: &SecretString,
) -> std::io::Result<()> {
    stdin.write_all(secret.expose_secret().as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    stdin.shutdown().await
}

/// Handle to one in-flight operation running on its own worker task
#[derive(Debug)]
pub struct OperationHandle {
    task: JoinHandle<ExecutionResult>,
}

impl OperationHandle {
    /// Run a future producing an [`ExecutionResult`] on a fresh worker task
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ExecutionResult> + Send + 'static,
    {
        Self {
            task: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the operation's terminal result
    ///
    /// A worker that panicked still resolves, as `Failure` with
    /// [`FailureCause::Aborted`].
    pub async fn wait(self) -> ExecutionResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => ExecutionResult::failure(
                format!("operation worker aborted: {}", e),
                FailureCause::Aborted,
            ),
        }
    }
}
