//! Orchestration: apply every configured replacement to a document
//!
//! Entries are processed one after another. A failing entry is logged and
//! recorded, and the run moves on to the next one; nothing already done is
//! rolled back.

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, ReplaceEntry, UpdateConfig};
use crate::document::Document;
use crate::import::{ImportError, import};
use crate::merge::{MergeError, MergeOptions, merge};

/// Why a single replacement was skipped
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReplaceError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Result of one configured replacement
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub entry: ReplaceEntry,
    pub result: Result<String, ReplaceError>,
}

/// Per-entry results of a run
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub outcomes: Vec<EntryOutcome>,
}

impl UpdateReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_clean(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Applies a configuration to documents
#[derive(Debug, Clone)]
pub struct Updater {
    config: UpdateConfig,
    config_path: Option<PathBuf>,
    options: MergeOptions,
}

impl Updater {
    pub fn new(config: UpdateConfig) -> Self {
        let options = MergeOptions {
            legacy_rename_fallback: config.legacy_rename_fallback,
        };
        Self {
            config,
            config_path: None,
            options,
        }
    }

    /// Load the configuration file; failures here abort before any entity is touched
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut updater = Self::new(UpdateConfig::load(path)?);
        updater.config_path = Some(path.to_path_buf());
        Ok(updater)
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MergeOptions) {
        self.options = options;
    }

    /// Where the document goes when the configuration asks for saving:
    /// `<config dir>/<config name up to the first '.'>.scene.ron`
    pub fn save_path(&self) -> Option<PathBuf> {
        let path = self.config_path.as_ref()?;
        let folder = path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.split('.').next().unwrap_or(file_name);
        Some(folder.join(format!("{}.scene.ron", stem)))
    }

    /// Replace the geometry of `target` with the contents of `file`
    pub fn replace_from_file(
        &self,
        doc: &mut Document,
        file: impl AsRef<Path>,
        target: &str,
    ) -> Result<String, ReplaceError> {
        let imported = import(doc, file, target)?;
        Ok(merge(doc, target, &imported, &self.options)?)
    }

    /// Process every configured entry, in order
    pub fn update_all(&self, doc: &mut Document) -> UpdateReport {
        let entries = self.config.entries();
        tracing::info!("Generating model: {} entries", entries.len());

        let mut report = UpdateReport::default();
        for entry in entries {
            let result = self.replace_from_file(doc, &entry.source, &entry.target);
            if let Err(e) = &result {
                tracing::warn!("Skipped {}: {}", entry, e);
            }
            report.outcomes.push(EntryOutcome { entry, result });
        }

        tracing::info!(
            "Done: {} updated, {} skipped",
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }
}
