use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use protolab_guard::GuardConfig;
use protolab_harness::{AncestorMode, HarnessConfig};
use protolab_merge::{MergeConfig, DEFAULT_MAX_DEPTH};
use protolab_oracle::{OracleConfig, DEFAULT_WATCHED};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Guard applied to every merge request. Absent by default.
    pub guard: GuardConfig,
    pub ancestor_mode: AncestorMode,
    pub max_depth: usize,
    pub watched: Vec<String>,
    /// Attribute reported as `watchedAttribute` in merge responses.
    pub primary_watched: String,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            guard: GuardConfig::absent(),
            ancestor_mode: AncestorMode::Shared,
            max_depth: DEFAULT_MAX_DEPTH,
            watched: DEFAULT_WATCHED.iter().map(|s| s.to_string()).collect(),
            primary_watched: "isAdmin".into(),
            request_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Replace the bind port with `port`, as given by the `PORT` variable.
    pub fn override_port(&mut self, port: &str) -> ServerResult<()> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ServerError::Config(format!("invalid PORT value: {port:?}")))?;
        self.bind_addr.set_port(port);
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> ServerResult<Self> {
        if let Ok(port) = std::env::var("PORT") {
            self.override_port(&port)?;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Harness configuration for this server. The primary watched attribute
    /// is always probed.
    pub fn harness_config(&self) -> HarnessConfig {
        let mut watched = self.watched.clone();
        if !watched.contains(&self.primary_watched) {
            watched.push(self.primary_watched.clone());
        }
        HarnessConfig {
            merge: MergeConfig::with_max_depth(self.max_depth),
            guard: self.guard.clone(),
            oracle: OracleConfig { watched },
            mode: self.ancestor_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert!(!c.guard.enabled);
        assert_eq!(c.ancestor_mode, AncestorMode::Shared);
        assert_eq!(c.max_depth, 1000);
        assert_eq!(c.primary_watched, "isAdmin");
        assert_eq!(c.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            ancestor_mode = "scoped"

            [guard]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.ancestor_mode, AncestorMode::Scoped);
        assert!(c.guard.enabled);
        assert_eq!(c.guard.segments.len(), 3);
        assert_eq!(c.watched.len(), 4);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ServerConfig::from_toml_str("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_depth = 64").unwrap();
        writeln!(file, "primary_watched = \"role\"").unwrap();

        let c = ServerConfig::load(file.path()).unwrap();
        assert_eq!(c.max_depth, 64);
        assert_eq!(c.primary_watched, "role");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }

    #[test]
    fn port_override() {
        let mut c = ServerConfig::default();
        c.override_port("4100").unwrap();
        assert_eq!(c.bind_addr, "127.0.0.1:4100".parse::<SocketAddr>().unwrap());
        assert!(c.override_port("http").is_err());
    }

    #[test]
    fn harness_config_watches_primary() {
        let c = ServerConfig {
            primary_watched: "role".into(),
            max_depth: 12,
            ..ServerConfig::default()
        };
        let harness = c.harness_config();
        assert!(harness.oracle.watched.contains(&"role".to_string()));
        assert_eq!(harness.oracle.watched.len(), 5);
        assert_eq!(harness.merge.max_depth, 12);
    }
}
