//! Credential prompts
//!
//! The core asks a [`CredentialPrompt`] for the elevation secret right before
//! an operation that needs one is launched. Returning `None` (or an empty
//! secret) abandons the operation without spawning anything.

use crate::core::traits::Operation;
use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use secrecy::zeroize::Zeroizing;
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Source of elevation secrets
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Ask the user for the secret needed by `operation`
    ///
    /// `None` means the user declined.
    async fn prompt_for_credential(&self, operation: &Operation) -> Option<SecretString>;
}

/// Treat an empty secret the same as a declined prompt
pub(crate) fn accept(secret: Option<SecretString>) -> Option<SecretString> {
    secret.filter(|s| !s.expose_secret().is_empty())
}

/// Prompt on the controlling terminal without echoing input
///
/// Falls back to reading one line from stdin when stdin is not a terminal,
/// e.g. `echo "$PASS" | fkinstall install vim`.
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    message: String,
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new("Enter your sudo password: ")
    }
}

impl TerminalPrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    async fn read_piped_line() -> Option<SecretString> {
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut line = Zeroizing::new(String::new());

        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(SecretString::from(
                line.trim_end_matches(['\r', '\n']).to_string(),
            )),
        }
    }
}

#[async_trait]
impl CredentialPrompt for TerminalPrompt {
    async fn prompt_for_credential(&self, operation: &Operation) -> Option<SecretString> {
        tracing::debug!(operation = %operation, "prompting for credential");

        if !io::stdin().is_terminal() {
            return accept(Self::read_piped_line().await);
        }

        let message = self.message.clone();
        let secret = tokio::task::spawn_blocking(move || read_hidden_line(&message))
            .await
            .ok()
            .and_then(|read| match read {
                Ok(secret) => secret,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read from terminal");
                    None
                }
            });

        accept(secret)
    }
}

/// Read a line in raw mode so nothing is echoed; Esc or Ctrl-C declines
fn read_hidden_line(message: &str) -> io::Result<Option<SecretString>> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", message)?;
    stderr.flush()?;

    terminal::enable_raw_mode()?;
    let result = read_keys();
    let restored = terminal::disable_raw_mode();
    writeln!(stderr)?;

    restored?;
    result
}

fn read_keys() -> io::Result<Option<SecretString>> {
    let mut buffer = Zeroizing::new(String::new());

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Enter => return Ok(Some(SecretString::from(buffer.as_str().to_string()))),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
    }
}

/// Prompt with a fixed answer, for embedding and tests
///
/// Counts how many times it was asked.
#[derive(Debug, Default)]
pub struct StaticPrompt {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl StaticPrompt {
    /// Always answer with `secret`
    pub fn answering(secret: impl Into<String>) -> Self {
        Self {
            answer: Some(secret.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always decline
    pub fn declining() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialPrompt for StaticPrompt {
    async fn prompt_for_credential(&self, _operation: &Operation) -> Option<SecretString> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        accept(self.answer.clone().map(SecretString::from))
    }
}
