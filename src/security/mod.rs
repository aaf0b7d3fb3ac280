pub mod command_executor;
pub mod credential;
pub mod redaction;

pub use command_executor::{OperationHandle, SafeCommandExecutor};
pub use credential::{CredentialPrompt, StaticPrompt, TerminalPrompt};
