//! Allow-list gate for connecting clients.
//!
//! A client is accepted when it runs under the host's own uid or its package
//! is on the configured allow-list. Anything else gets an empty root and
//! every later call on its connection is refused.

use bridge_traits::ClientIdentity;
use core_runtime::CoreConfig;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    host_uid: Option<u32>,
    allowed: HashSet<String>,
}

impl AccessGate {
    pub fn new(host_uid: Option<u32>, allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            host_uid,
            allowed: allowed
                .into_iter()
                .map(|package| package.trim().to_string())
                .collect(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.host_uid, config.allowed_clients.iter().cloned())
    }

    pub fn is_allowed(&self, client: &ClientIdentity) -> bool {
        if self.host_uid == Some(client.uid) {
            debug!(%client, "Accepted host client");
            return true;
        }
        self.allowed.contains(&client.package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AccessGate {
        AccessGate::new(
            Some(1000),
            vec![" com.example.car ".to_string(), "com.example.watch".to_string()],
        )
    }

    #[test]
    fn test_host_uid_is_trusted() {
        assert!(gate().is_allowed(&ClientIdentity::new("com.example.self", 1000)));
    }

    #[test]
    fn test_allow_list_matches_package() {
        let gate = gate();
        assert!(gate.is_allowed(&ClientIdentity::new("com.example.car", 2001)));
        assert!(gate.is_allowed(&ClientIdentity::new("com.example.watch", 2002)));
        assert!(!gate.is_allowed(&ClientIdentity::new("com.example.rogue", 2003)));
    }

    #[test]
    fn test_empty_gate_rejects_everyone() {
        let gate = AccessGate::default();
        assert!(!gate.is_allowed(&ClientIdentity::new("com.example.car", 0)));
    }
}
