// ABOUTME: Deployment configuration loaded from flotilla.yml.
// ABOUTME: Discovery walks upward from the working directory.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::AppName;

pub const CONFIG_FILE: &str = "flotilla.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// App whose machines this deployment replaces.
    pub app: AppName,

    /// Base URL of the fleet API.
    #[serde(default = "default_fleet_url")]
    pub fleet_url: String,

    /// Signal sent to blue machines in the stop phase.
    #[serde(default = "default_stop_signal")]
    pub stop_signal: String,

    /// Per-wait deadline; applies independently to start-wait and
    /// health-wait.
    #[serde(default = "default_wait_timeout", with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Disable ANSI styling in progress output.
    #[serde(default)]
    pub no_color: bool,
}

fn default_fleet_url() -> String {
    "http://127.0.0.1:4280".to_string()
}

fn default_stop_signal() -> String {
    "SIGINT".to_string()
}

fn default_wait_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Config {
    /// Load from an explicit path.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Find `flotilla.yml` in `dir` or any ancestor.
    pub fn discover(dir: &Path) -> Result<Self> {
        for candidate in dir.ancestors() {
            let path = candidate.join(CONFIG_FILE);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "app: my-app\n";

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.app.as_str(), "my-app");
        assert_eq!(config.stop_signal, "SIGINT");
        assert_eq!(config.wait_timeout, Duration::from_secs(120));
        assert!(!config.no_color);
    }

    #[test]
    fn wait_timeout_parses_humantime() {
        let config: Config =
            serde_yaml::from_str("app: my-app\nwait_timeout: 5m\n").unwrap();
        assert_eq!(config.wait_timeout, Duration::from_secs(300));
    }

    #[test]
    fn invalid_app_name_is_rejected() {
        let err = serde_yaml::from_str::<Config>("app: Not-Valid\n");
        assert!(err.is_err());
    }

    #[test]
    fn discover_walks_up_to_the_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let nested = dir.path().join("services").join("api");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.app.as_str(), "my-app");
    }

    #[test]
    fn discover_fails_without_a_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::discover(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
