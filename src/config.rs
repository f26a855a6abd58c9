use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::election::ElectionConfig;

/// Startup parameters for a node, JSON-loadable.
///
/// Broker parameters are carried for transport implementations that need
/// them; the election core itself never reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_id_file")]
    pub id_file: String,
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
    #[serde(default)]
    pub election: ElectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_id_file() -> String {
    "node-id.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_file: default_id_file(),
            broker: None,
            election: ElectionConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_default_values_are_sensible() {
        let cfg = Config::default();
        assert_eq!(cfg.id_file, "node-id.txt");
        assert!(cfg.broker.is_none());
        assert_eq!(cfg.election.election_timeout_ms, 5_000);
    }

    #[test]
    fn load_fills_in_missing_sections() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"broker": {{"url": "tcp://broker.local:1883", "username": "db"}}}}"#
        )
        .expect("write");

        let cfg = Config::load(file.path()).expect("load");
        let broker = cfg.broker.expect("broker section");
        assert_eq!(broker.url, "tcp://broker.local:1883");
        assert_eq!(broker.username.as_deref(), Some("db"));
        assert!(broker.password.is_none());
        assert_eq!(cfg.id_file, "node-id.txt");
        assert_eq!(cfg.election.stale_threshold_ms, 90_000);
    }

    #[test]
    fn load_rejects_invalid_json() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, "not json").expect("write");
        assert!(Config::load(file.path()).is_err());
    }
}
