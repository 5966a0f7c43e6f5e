use std::path::Path;

use serde::Deserialize;

/// Wiring-only configuration for the server binary. The core (C1-C5) takes
/// no CLI flags and no environment variables (spec §6) — everything here is
/// process-level plumbing: where to listen, where the SQLite file lives,
/// how often to sweep idle sessions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub sqlite_path: String,
    pub idle_eviction_seconds: i64,
    pub idle_sweep_interval_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            sqlite_path: "collab.sqlite3".to_string(),
            idle_eviction_seconds: 900,
            idle_sweep_interval_seconds: 60,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then overlays a TOML file at `path` if one exists.
    /// A missing file is not an error — the binary is runnable with zero
    /// configuration.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn idle_eviction_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_eviction_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_with_no_file() {
        let config = ServerConfig::load("/nonexistent/path/collab.toml").unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3001");
    }

    #[test]
    fn toml_overlay_parses() {
        let toml_str = "bind_address = \"127.0.0.1:4000\"\nidle_eviction_seconds = 60\n";
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:4000");
        assert_eq!(config.idle_eviction_seconds, 60);
        // Fields absent from the overlay keep their struct default.
        assert_eq!(config.sqlite_path, "collab.sqlite3");
    }
}
