//! Persistent application state
//!
//! Remembers which routers the user added and which view was open last, so the
//! next session can reconnect and restore it. Credentials other than the login
//! name are kept elsewhere.

use super::{app_data_dir, ensure_app_data_dir, API_PORT};
use crate::device::ConnectionTarget;
use crate::error::{Result, RouterViewError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// A router the user has added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownRouter {
    /// Host name or address, without port
    pub host: String,
    /// Use the TLS API port
    #[serde(default)]
    pub ssl: bool,
    /// Login name
    pub user: String,
}

impl KnownRouter {
    pub fn new(host: impl Into<String>, ssl: bool, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ssl,
            user: user.into(),
        }
    }

    /// Connection parameters for this router
    pub fn target(&self, password: impl Into<String>) -> ConnectionTarget {
        ConnectionTarget::new(self.host.clone(), self.ssl, self.user.clone(), password)
    }
}

/// Strip the plain API port that older state files stored as part of the host
fn strip_legacy_port(host: &str) -> Option<&str> {
    host.strip_suffix(&format!(":{}", API_PORT))
}

/// Persistent application state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Routers in the order they were added
    #[serde(default)]
    pub routers: Vec<KnownRouter>,

    /// Host that was selected last
    #[serde(default)]
    pub current_host: Option<String>,

    /// Catalog section that was open last
    #[serde(default)]
    pub current_tab: Option<String>,

    /// Resource path of the table that was open last
    #[serde(default)]
    pub current_view: Option<String>,

    /// Dial through the tailnet instead of the local network
    #[serde(default)]
    pub use_tailscale: bool,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            routers: Vec::new(),
            current_host: None,
            current_tab: None,
            current_view: None,
            use_tailscale: false,
        }
    }
}

impl AppState {
    /// Get the path to the app state file
    pub fn default_path() -> Option<PathBuf> {
        app_data_dir().map(|p| p.join(APP_STATE_FILE))
    }

    /// Load app state from a file; a missing file yields the defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| RouterViewError::Config(format!("Failed to read app state: {}", e)))?;

        let mut state: Self = serde_json::from_str(&content)
            .map_err(|e| RouterViewError::Config(format!("Failed to parse app state: {}", e)))?;
        if state.migrate_legacy_hosts() {
            tracing::info!("Migrated legacy router host entries");
        }
        Ok(state)
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to a file
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RouterViewError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| RouterViewError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    /// Add a router or replace the entry with the same host
    pub fn add_router(&mut self, router: KnownRouter) {
        match self.routers.iter_mut().find(|r| r.host == router.host) {
            Some(existing) => *existing = router,
            None => self.routers.push(router),
        }
    }

    /// Remove a router by host; returns whether it was known
    pub fn remove_router(&mut self, host: &str) -> bool {
        let before = self.routers.len();
        self.routers.retain(|r| r.host != host);
        if self.current_host.as_deref() == Some(host) {
            self.current_host = None;
        }
        self.routers.len() != before
    }

    /// Find a router by host
    pub fn router(&self, host: &str) -> Option<&KnownRouter> {
        self.routers.iter().find(|r| r.host == host)
    }

    /// Rewrite hosts saved with the plain API port suffix
    ///
    /// Returns whether anything changed. When both forms exist the bare host wins.
    pub fn migrate_legacy_hosts(&mut self) -> bool {
        let mut changed = false;
        // Each entry is paired with whether it came from a legacy host.
        let mut migrated: Vec<(KnownRouter, bool)> = Vec::with_capacity(self.routers.len());
        for router in self.routers.drain(..) {
            let stripped = strip_legacy_port(&router.host).map(str::to_string);
            let legacy = stripped.is_some();
            let router = match stripped {
                Some(host) => {
                    changed = true;
                    KnownRouter { host, ..router }
                }
                None => router,
            };
            match migrated.iter_mut().find(|(r, _)| r.host == router.host) {
                Some(slot) => {
                    changed = true;
                    if slot.1 && !legacy {
                        *slot = (router, false);
                    }
                }
                None => migrated.push((router, legacy)),
            }
        }
        self.routers = migrated.into_iter().map(|(r, _)| r).collect();
        let current = self
            .current_host
            .as_deref()
            .and_then(strip_legacy_port)
            .map(str::to_string);
        if let Some(host) = current {
            self.current_host = Some(host);
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_default() {
        let state = AppState::default();
        assert!(state.routers.is_empty());
        assert!(state.current_host.is_none());
        assert_eq!(state.version, 1);
    }

    #[test]
    fn test_add_router_replaces_same_host() {
        let mut state = AppState::default();
        state.add_router(KnownRouter::new("192.168.88.1", false, "admin"));
        state.add_router(KnownRouter::new("10.0.0.1", true, "ops"));
        state.add_router(KnownRouter::new("192.168.88.1", true, "admin"));

        assert_eq!(state.routers.len(), 2);
        assert!(state.router("192.168.88.1").unwrap().ssl);
        assert_eq!(state.routers[1].host, "10.0.0.1");
    }

    #[test]
    fn test_remove_router_clears_current() {
        let mut state = AppState::default();
        state.add_router(KnownRouter::new("gw", false, "admin"));
        state.current_host = Some("gw".to_string());

        assert!(state.remove_router("gw"));
        assert!(!state.remove_router("gw"));
        assert!(state.current_host.is_none());
    }

    #[test]
    fn test_migrate_keeps_bare_host_entry() {
        let mut state = AppState::default();
        state.routers.push(KnownRouter::new("gw:8728", false, "olduser"));
        state.routers.push(KnownRouter::new("gw", true, "admin"));
        state.routers.push(KnownRouter::new("lab", false, "ops"));
        state.routers.push(KnownRouter::new("lab:8728", true, "legacy"));

        assert!(state.migrate_legacy_hosts());
        assert_eq!(state.routers.len(), 2);
        let gw = state.router("gw").unwrap();
        assert!(gw.ssl);
        assert_eq!(gw.user, "admin");
        let lab = state.router("lab").unwrap();
        assert!(!lab.ssl);
        assert_eq!(lab.user, "ops");
        assert_eq!(state.routers[0].host, "gw");
    }

    #[test]
    fn test_migrate_legacy_hosts() {
        let mut state = AppState::default();
        state.routers.push(KnownRouter::new("gw:8728", false, "admin"));
        state.routers.push(KnownRouter::new("gw", true, "admin"));
        state.routers.push(KnownRouter::new("core:8729", true, "admin"));
        state.current_host = Some("gw:8728".to_string());

        assert!(state.migrate_legacy_hosts());
        let hosts: Vec<_> = state.routers.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["gw", "core:8729"]);
        assert_eq!(state.current_host.as_deref(), Some("gw"));
        assert!(!state.migrate_legacy_hosts());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_STATE_FILE);

        let mut state = AppState::default();
        state.add_router(KnownRouter::new("gw", true, "admin"));
        state.current_tab = Some("IP".to_string());
        state.current_view = Some("/ip/arp".to_string());
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppState::load_from(dir.path().join("missing.json")).unwrap();
        assert_eq!(loaded, AppState::default());
    }

    #[test]
    fn test_target_uses_tls_port() {
        let router = KnownRouter::new("gw", true, "admin");
        let target = router.target("secret");
        assert_eq!(target.address(), "gw:8729");
    }
}
