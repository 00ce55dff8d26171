use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_ttl_secs() -> u64 {
    6
}

/// Cache settings, usually read from a JSON file.
///
/// ```json
/// { "ttl_secs": 6, "max_entries": 10000, "sweep_interval_secs": 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// How long a computed result is served
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound on stored entries, unbounded when absent
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Period of the background purge, none when absent
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: None,
            sweep_interval_secs: None,
        }
    }
}

impl CacheConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: CacheConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            return Err(Error::InvalidConfig("ttl_secs must be positive".into()));
        }
        if self.max_entries == Some(0) {
            return Err(Error::InvalidConfig("max_entries must be at least 1".into()));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(Error::InvalidConfig(
                "sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = CacheConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
        assert_eq!(config.ttl(), Duration::from_secs(6));
        assert_eq!(config.sweep_interval(), None);
    }

    #[test]
    fn reads_all_fields() {
        let config = CacheConfig::from_json_str(
            r#"{ "ttl_secs": 30, "max_entries": 100, "sweep_interval_secs": 5 }"#,
        )
        .unwrap();
        assert_eq!(config.ttl(), Duration::from_secs(30));
        assert_eq!(config.max_entries, Some(100));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_invalid_values() {
        for raw in [
            r#"{ "ttl_secs": 0 }"#,
            r#"{ "max_entries": 0 }"#,
            r#"{ "sweep_interval_secs": 0 }"#,
        ] {
            assert!(matches!(
                CacheConfig::from_json_str(raw),
                Err(Error::InvalidConfig(_))
            ));
        }
        assert!(matches!(
            CacheConfig::from_json_str(r#"{ "ttl": 3 }"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ttl_secs": 2 }}"#).unwrap();

        let config = CacheConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.ttl_secs, 2);

        assert!(matches!(
            CacheConfig::from_json_file(file.path().with_extension("missing")),
            Err(Error::Io(_))
        ));
    }
}
