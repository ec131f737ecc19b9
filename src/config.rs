//! Runtime configuration for door I/O

use serde::{Deserialize, Serialize};

/// Tunable timeouts and buffer sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Grace period between bytes of an ambiguous key sequence (ms)
    pub escape_timeout_ms: u64,
    /// Bytes pulled from the keyboard descriptor per read
    pub read_chunk_size: usize,
    /// Maximum bytes read from the control channel per poll
    pub poll_max_bytes: usize,
    /// Recognize function and paging keys, not just arrows/Home/End
    pub extended_keys: bool,
    /// Mailbox used by the inbox helpers
    pub default_box: String,
    /// Upper bound for the blocking nodes-info query (ms)
    pub nodes_info_wait_ms: u64,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            escape_timeout_ms: crate::input::DEFAULT_ESCAPE_TIMEOUT_MS,
            read_chunk_size: 1024,
            poll_max_bytes: 4096,
            extended_keys: false,
            default_box: "TEMP".to_string(),
            nodes_info_wait_ms: 1000,
        }
    }
}

impl DoorConfig {
    /// Defaults overlaid with `DOORKIT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    ///
    /// Values that fail to parse leave the default in place.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("DOORKIT_ESCAPE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.escape_timeout_ms = v;
        }
        if let Some(v) = get("DOORKIT_READ_CHUNK_SIZE").and_then(|v| v.parse::<usize>().ok()) {
            if v > 0 {
                config.read_chunk_size = v;
            }
        }
        if let Some(v) = get("DOORKIT_POLL_MAX_BYTES").and_then(|v| v.parse::<usize>().ok()) {
            if v > 0 {
                config.poll_max_bytes = v;
            }
        }
        if let Some(v) = get("DOORKIT_EXTENDED_KEYS") {
            config.extended_keys = parse_flag(&v);
        }
        if let Some(v) = get("DOORKIT_DEFAULT_BOX") {
            config.default_box = v;
        }
        if let Some(v) = get("DOORKIT_NODES_INFO_WAIT_MS").and_then(|v| v.parse().ok()) {
            config.nodes_info_wait_ms = v;
        }
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = DoorConfig::default();
        assert_eq!(config.escape_timeout_ms, 250);
        assert_eq!(config.read_chunk_size, 1024);
        assert_eq!(config.poll_max_bytes, 4096);
        assert!(!config.extended_keys);
        assert_eq!(config.default_box, "TEMP");
        assert_eq!(config.nodes_info_wait_ms, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let config = DoorConfig::from_lookup(lookup(&[
            ("DOORKIT_ESCAPE_TIMEOUT_MS", "100"),
            ("DOORKIT_EXTENDED_KEYS", "Yes"),
            ("DOORKIT_DEFAULT_BOX", " MAIN "),
            ("DOORKIT_POLL_MAX_BYTES", "512"),
        ]));
        assert_eq!(config.escape_timeout_ms, 100);
        assert!(config.extended_keys);
        assert_eq!(config.default_box, "MAIN");
        assert_eq!(config.poll_max_bytes, 512);
        assert_eq!(config.read_chunk_size, 1024);
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = DoorConfig::from_lookup(lookup(&[
            ("DOORKIT_ESCAPE_TIMEOUT_MS", "soon"),
            ("DOORKIT_READ_CHUNK_SIZE", "0"),
            ("DOORKIT_EXTENDED_KEYS", "nah"),
            ("DOORKIT_DEFAULT_BOX", "   "),
        ]));
        assert_eq!(config, DoorConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let json = r#"{"escape_timeout_ms": 50, "extended_keys": true}"#;
        let config: DoorConfig = serde_json::from_str(json).expect("parse");
        assert_eq!(config.escape_timeout_ms, 50);
        assert!(config.extended_keys);
        assert_eq!(config.default_box, "TEMP");
    }
}
