//! Per-call context carrying the credential bags handed to a plugin.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// A credential bag: header-candidate names mapped to their values.
pub type Credentials = HashMap<String, String>;

/// Context of a single action invocation.
///
/// Connections are keyed by provider name; each entry is a call-scoped
/// `string -> string` credential bag. The context is read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    connections: HashMap<String, Credentials>,
}

impl ActionContext {
    pub fn new(connections: HashMap<String, Credentials>) -> Self {
        Self { connections }
    }

    /// Fetch the credential bag for a provider.
    pub fn get_credentials(&self, provider: &str) -> Result<Credentials> {
        self.connections
            .get(provider)
            .cloned()
            .ok_or_else(|| Error::MissingConnection(provider.to_string()))
    }

    pub fn has_connection(&self, provider: &str) -> bool {
        self.connections.contains_key(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_provider_is_an_error() {
        let ctx = ActionContext::default();
        assert!(ctx.get_credentials("grafana").is_err());
    }

    #[test]
    fn known_provider_returns_bag() {
        let mut connections = HashMap::new();
        let mut bag = Credentials::new();
        bag.insert("TOKEN".to_string(), "t0k3n".to_string());
        connections.insert("grafana".to_string(), bag);

        let ctx = ActionContext::new(connections);
        let creds = ctx.get_credentials("grafana").unwrap();
        assert_eq!(creds["TOKEN"], "t0k3n");
    }
}
