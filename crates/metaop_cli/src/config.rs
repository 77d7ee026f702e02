// SPDX-License-Identifier: MIT OR Apache-2.0
//! `metaop.ron` configuration.
//!
//! ```ron
//! (
//!     version: 1,
//!     log_filter: "metaop_graph=debug",
//!     format: Json,
//!     pretty: true,
//!     presets: {
//!         "blue-stars": (
//!             operation: "gegl:sparkle",
//!             values: { "color": "#3366ff", "iterations": "4" },
//!         ),
//!     },
//! )
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "metaop.ron";

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Serialization used for command output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    /// Rusty Object Notation
    #[default]
    Ron,
    /// JSON
    Json,
}

/// Named set of property values for one meta-operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Meta-operation the preset applies to
    pub operation: String,
    /// Property values, written as on the command line
    #[serde(default)]
    pub values: IndexMap<String, String>,
}

/// Command line configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Configuration format version
    pub version: u32,
    /// `tracing` filter directives, overridden by `--log` / `METAOP_LOG`
    pub log_filter: String,
    /// Output format, overridden by `--format`
    pub format: OutputFormat,
    /// Pretty-print output
    pub pretty: bool,
    /// Property presets by name
    pub presets: IndexMap<String, Preset>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            log_filter: "warn,metaop_graph=info".to_string(),
            format: OutputFormat::Ron,
            pretty: true,
            presets: IndexMap::new(),
        }
    }
}

impl CliConfig {
    /// Parse a configuration from RON text
    pub fn from_ron(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: CliConfig = ron::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text, path)
    }

    /// Load `path` if given, otherwise `metaop.ron` when it exists,
    /// otherwise the defaults. An explicitly named file must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Look up a preset, checking it targets `operation`
    pub fn preset(&self, name: &str, operation: &str) -> Result<&Preset, ConfigError> {
        let preset = self
            .presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
        if preset.operation != operation {
            return Err(ConfigError::PresetMismatch {
                preset: name.to_string(),
                expected: preset.operation.clone(),
                found: operation.to_string(),
            });
        }
        Ok(preset)
    }
}

/// Error when loading the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        /// Configuration path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid RON for the configuration
    #[error("Cannot parse {}: {source}", .path.display())]
    Parse {
        /// Configuration path
        path: PathBuf,
        /// Underlying error
        source: ron::error::SpannedError,
    },

    /// Written by a newer version
    #[error("Configuration version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version understood
        supported: u32,
    },

    /// No preset with this name
    #[error("Unknown preset `{0}`")]
    UnknownPreset(String),

    /// Preset belongs to another meta-operation
    #[error("Preset `{preset}` is for `{expected}`, not `{found}`")]
    PresetMismatch {
        /// Preset name
        preset: String,
        /// Meta-operation named by the preset
        expected: String,
        /// Meta-operation being instantiated
        found: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"(
        log_filter: "metaop_graph=debug",
        format: Json,
        presets: {
            "blue-stars": (
                operation: "gegl:sparkle",
                values: { "color": "#3366ff", "iterations": "4" },
            ),
        },
    )"##;

    #[test]
    fn test_parse_sample() {
        let config = CliConfig::from_ron(SAMPLE, Path::new("metaop.ron")).unwrap();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.pretty);
        let preset = config.preset("blue-stars", "gegl:sparkle").unwrap();
        assert_eq!(preset.values.get("iterations").map(String::as_str), Some("4"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = CliConfig::from_ron("()", Path::new("metaop.ron")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            CliConfig::from_ron("(version: 99)", Path::new("metaop.ron")),
            Err(ConfigError::UnsupportedVersion { found: 99, .. })
        ));
        assert!(matches!(
            CliConfig::from_ron("(format: Yaml)", Path::new("metaop.ron")),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            CliConfig::load(Path::new("/nonexistent/metaop.ron")),
            Err(ConfigError::Io { .. })
        ));

        let config = CliConfig::from_ron(SAMPLE, Path::new("metaop.ron")).unwrap();
        assert!(matches!(config.preset("red", "gegl:sparkle"), Err(ConfigError::UnknownPreset(_))));
        assert!(matches!(
            config.preset("blue-stars", "lb:sparkle2"),
            Err(ConfigError::PresetMismatch { .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        let config = CliConfig::from_ron(SAMPLE, Path::new("metaop.ron")).unwrap();
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(CliConfig::from_ron(&text, Path::new("metaop.ron")).unwrap(), config);
    }
}
