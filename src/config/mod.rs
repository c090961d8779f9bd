//! Configuration for the engine and the session log store.
//!
//! This module provides:
//!
//! - [`EngineConfig`] and [`EngineConfigBuilder`] for configuring the engine
//! - [`ReadinessCheck`] for gating spawns on setup state
//! - Type-safe options like [`Model`], [`PermissionMode`], and [`SessionId`]
//!
//! # Example
//!
//! ```no_run
//! use claude_relay::config::{EngineConfig, PermissionMode};
//!
//! let config = EngineConfig::builder()
//!     .worker_path("/opt/claude-worker/index.js")
//!     .permission_mode(PermissionMode::Default)
//!     .build()?;
//! # Ok::<(), claude_relay::Error>(())
//! ```

pub mod builder;
pub mod options;
pub mod readiness;

pub use builder::{default_claude_home, EngineConfig, EngineConfigBuilder};
pub use options::{Model, PermissionMode, SessionId};
pub use readiness::{AlwaysReady, ReadinessCheck, WorkerPathExists};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_exports_accessible() {
        let _: Model = Model::Sonnet;
        let _: PermissionMode = PermissionMode::Default;
        let _: SessionId = SessionId::new("test");
        let _: &dyn ReadinessCheck = &AlwaysReady;
        let _ = EngineConfig::builder();
    }
}
