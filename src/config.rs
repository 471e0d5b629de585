//! Optional JSON configuration file.
//!
//! ```json
//! {
//!   "types_root": "node_modules/@vendor/sdk/dist/types",
//!   "default_discriminator": "provider",
//!   "discriminators": { "ProviderConfig": "provider" }
//! }
//! ```
//! Command-line flags override what the file says.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::path_de::{from_str_with_path, PathError};
use crate::validate::SynthOptions;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub types_root: Option<PathBuf>,
    pub default_discriminator: String,
    pub discriminators: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let synth = SynthOptions::default();
        Self {
            types_root: None,
            default_discriminator: synth.default_discriminator,
            discriminators: synth.discriminators,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse { path: PathBuf, #[source] source: PathError },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: Config = from_str_with_path(&source)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        // relative roots are relative to the config file
        if let (Some(root), Some(dir)) = (config.types_root.as_ref(), path.parent()) {
            if root.is_relative() {
                config.types_root = Some(dir.join(root));
            }
        }
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn synth(&self) -> SynthOptions {
        SynthOptions {
            default_discriminator: self.default_discriminator.clone(),
            discriminators: self.discriminators.clone(),
        }
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::DEFAULT_DISCRIMINATOR;

    #[test]
    fn defaults_when_fields_are_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dts-guard.json");
        std::fs::write(&path, "{}").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.types_root, None);
        assert_eq!(config.synth().default_discriminator, DEFAULT_DISCRIMINATOR);
    }

    #[test]
    fn reads_discriminators_and_resolves_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dts-guard.json");
        std::fs::write(&path, r#"{ "types_root": "types", "default_discriminator": "kind", "discriminators": { "Llm": "vendor" } }"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.types_root, Some(dir.path().join("types")));
        assert_eq!(config.synth().default_discriminator, "kind");
        assert_eq!(config.synth().discriminators["Llm"], "vendor");
    }

    #[test]
    fn parse_errors_carry_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "discriminators": { "Llm": false } }"#).unwrap();
        let err = Config::load(&path).unwrap_err();
        let ConfigError::Parse { source, .. } = err else { panic!("{err:?}") };
        assert_eq!(source.path, "discriminators.Llm");
    }
}
