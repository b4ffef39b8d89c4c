//! Core vocabulary for OAK plugins
//!
//! This crate provides the shared building blocks of the action runtime:
//! - Action and parameter descriptors exposed to callers
//! - The invocation request/response envelope
//! - Per-call context with credential bags
//! - Constants for parameter typing, wire formats and environment keys
//! - Gzip helpers for prod-mode bundles

pub mod action;
pub mod consts;
pub mod context;
pub mod error;
pub mod gzip;

// Re-exports
pub use action::{
    Action, ActionParameter, CallResult, Connection, CredentialsValidationResponse, Description,
    ExecuteActionRequest, ExecuteActionResponse,
};
pub use context::{ActionContext, Credentials};
pub use error::{Error, Result};

use async_trait::async_trait;
use std::sync::Arc;

/// The surface every action plugin exposes to its host.
#[async_trait]
pub trait ActionRuntime: Send + Sync {
    /// Static description of the plugin.
    fn describe(&self) -> Description;

    /// All actions the plugin currently exposes.
    fn get_actions(&self) -> Vec<Action>;

    /// Validate a connection, typically by issuing a cheap authenticated call.
    async fn test_credentials(&self, ctx: Arc<ActionContext>)
        -> Result<CredentialsValidationResponse>;

    /// Execute one action; invocation failures are reported through the
    /// response envelope, never as an `Err`.
    async fn execute_action(
        &self,
        ctx: Arc<ActionContext>,
        request: &ExecuteActionRequest,
    ) -> Result<ExecuteActionResponse>;
}
