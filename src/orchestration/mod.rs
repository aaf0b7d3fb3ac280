//! Orchestration layer for package operations
//!
//! Ties command building, execution, auditing, and result dispatch together
//! behind the [`PackageManager`] façade.

pub mod audit;
pub mod dispatcher;
pub mod package_manager;
pub mod search;

// Re-export main types for convenience
pub use audit::{AuditLogger, AuditRecord};
pub use dispatcher::{ChannelDispatcher, DispatchEvent};
pub use package_manager::PackageManager;
pub use search::parse_search_output;
