//! Package operation execution core for pacman-style package managers
//!
//! Runs search, install, remove, and full-system update commands on worker
//! tasks, streams the elevation secret over stdin without persisting it,
//! records an audit trail, and reports results back through a dispatcher.

pub mod core;
pub mod orchestration;
pub mod security;

pub use self::core::*;
pub use orchestration::{
    AuditLogger, AuditRecord, ChannelDispatcher, DispatchEvent, PackageManager,
};
pub use security::{
    CredentialPrompt, OperationHandle, SafeCommandExecutor, StaticPrompt, TerminalPrompt,
};
