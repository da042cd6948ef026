//! Run configuration
//!
//! A JSON file naming the source meshes to apply:
//!
//! ```json
//! {
//!   "parts": [{ "name": "parts/cube.stl" }],
//!   "paths": ["parts/rotor/*.glb"],
//!   "save_document": true
//! }
//! ```
//!
//! Every key is optional. The target of a `parts` entry is the text after the
//! final `/` of its `name`; the target of a file matched by a `paths` pattern
//! is the file's base name. Targets keep their extension, which selects the
//! import format.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration error types (fatal to a run)
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path:?}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("Malformed configuration: {0}")]
    Parse(String),
    #[error("Part {0} has an empty name")]
    EmptyPartName(usize),
    #[error("Part '{0}' does not name a file")]
    EmptyTargetName(String),
    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// An explicitly listed source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartSpec {
    /// Source file path
    pub name: String,
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateConfig {
    #[serde(default)]
    pub parts: Vec<PartSpec>,
    /// Glob patterns
    #[serde(default)]
    pub paths: Vec<String>,
    /// Save the document next to the configuration after the run
    #[serde(default)]
    pub save_document: bool,
    /// Keep a renamed import for targets that cannot be merged
    #[serde(default)]
    pub legacy_rename_fallback: bool,
}

/// One source file paired with the entity it replaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceEntry {
    pub source: PathBuf,
    pub target: String,
}

impl std::fmt::Display for ReplaceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <- {}", self.target, self.source.display())
    }
}

impl UpdateConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json(&content)?;

        tracing::info!("Configuration file: {:?}", path);
        for part in &config.parts {
            tracing::info!("Parts: {}", part.name);
        }
        for pattern in &config.paths {
            tracing::info!("Paths: {}", pattern);
        }
        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: UpdateConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject entries that could never be processed
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, part) in self.parts.iter().enumerate() {
            if part.name.is_empty() {
                return Err(ConfigError::EmptyPartName(index));
            }
            if part_target_name(&part.name).is_empty() {
                return Err(ConfigError::EmptyTargetName(part.name.clone()));
            }
        }
        for pattern in &self.paths {
            glob::Pattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Expand into the ordered list of replacements: parts first, then patterns
    pub fn entries(&self) -> Vec<ReplaceEntry> {
        let mut entries: Vec<ReplaceEntry> = self
            .parts
            .iter()
            .map(|part| ReplaceEntry {
                source: PathBuf::from(&part.name),
                target: part_target_name(&part.name).to_string(),
            })
            .collect();

        for pattern in &self.paths {
            let paths = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!("Skipping pattern '{}': {}", pattern, e);
                    continue;
                }
            };
            let before = entries.len();
            for path in paths {
                match path {
                    Ok(path) => {
                        let Some(target) = path.file_name().and_then(|n| n.to_str()) else {
                            continue;
                        };
                        let target = target.to_string();
                        entries.push(ReplaceEntry {
                            source: path,
                            target,
                        });
                    }
                    Err(e) => tracing::warn!("Skipping unreadable match of '{}': {}", pattern, e),
                }
            }
            if entries.len() == before {
                tracing::info!("Pattern '{}' matched no files", pattern);
            }
        }

        entries
    }
}

/// Text after the final `/`
fn part_target_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
