use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub donor: DonorConfig,
  #[serde(default)]
  pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonorConfig {
  /// Base URL of the Donor Management DB, e.g. https://donors.example.org
  pub url: String,
  /// Seconds before the cached snapshot expires (default 300)
  pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Address the HTTP API listens on
  #[serde(default = "default_listen")]
  pub listen: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      listen: default_listen(),
    }
  }
}

fn default_listen() -> String {
  "127.0.0.1:8080".to_string()
}

impl DonorConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_seconds.unwrap_or(300))
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./donor-bridge.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/donor-bridge/config.yaml
  /// 4. ~/.config/donor-bridge/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/donor-bridge/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("donor-bridge.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("donor-bridge").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Shared secret sent as X-API-Key on every outbound donor DB call.
  /// The header is omitted entirely when unset.
  pub fn get_donor_api_key() -> Option<String> {
    std::env::var("DONOR_DB_API_KEY")
      .ok()
      .filter(|key| !key.is_empty())
  }

  /// Local API key required on inbound requests.
  /// Authentication is disabled when unset (local development).
  pub fn get_local_api_key() -> Option<String> {
    std::env::var("GTD_API_KEY").ok().filter(|key| !key.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parses_minimal_config() {
    let config: Config = serde_yaml::from_str("donor:\n  url: http://localhost:9000\n").unwrap();
    assert_eq!(config.donor.url, "http://localhost:9000");
    assert_eq!(config.donor.cache_ttl(), Duration::from_secs(300));
    assert_eq!(config.server.listen, "127.0.0.1:8080");
  }

  #[test]
  fn test_parses_overrides() {
    let yaml =
      "donor:\n  url: http://localhost:9000\n  cache_ttl_seconds: 60\nserver:\n  listen: 0.0.0.0:9090\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.donor.cache_ttl(), Duration::from_secs(60));
    assert_eq!(config.server.listen, "0.0.0.0:9090");
  }
}
