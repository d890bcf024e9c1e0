use std::path::Path;

use anyhow::Context;
use attr_buffer::MAX_FRAME_BODY_LEN;
use attr_tree::{IgnoredAttributes, MAX_DECODE_DEPTH};
use serde::{Deserialize, Serialize};

/// Settings read from `--config`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Nesting ceiling applied when decoding snapshots.
    pub max_depth: usize,
    /// Keys skipped by `subset`.
    pub ignored_attributes: IgnoredAttributes,
    /// Compress snapshots written by `merge`.
    pub compress: bool,
    /// Largest body a compressed snapshot may inflate to.
    pub max_body_len: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DECODE_DEPTH,
            ignored_attributes: IgnoredAttributes::default(),
            compress: false,
            max_body_len: MAX_FRAME_BODY_LEN,
        }
    }
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.max_depth, 30);
        assert!(config.ignored_attributes.contains("temperature"));
        assert!(!config.compress);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attr.toml");
        std::fs::write(&path, "ignored_attributes = [\"age\"]\ncompress = true\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_depth, 30);
        assert!(config.ignored_attributes.contains("age"));
        assert!(!config.ignored_attributes.contains("temperature"));
        assert!(config.compress);
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attr.toml");
        std::fs::write(&path, "max_depth = \"deep\"").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }
}
