//! Command surface: select a configuration file, then run the update

use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::document::{Document, DocumentError};
use crate::updater::{UpdateReport, Updater};

/// Errors that cancel a run
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Please select a configuration file first")]
    NoConfigSelected,
    #[error("Configuration file not found: {0:?}")]
    ConfigNotFound(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to save document: {0}")]
    Save(#[from] DocumentError),
}

/// Holds the selected configuration between commands
#[derive(Debug, Clone, Default)]
pub struct UpdaterSession {
    config_path: Option<PathBuf>,
}

impl UpdaterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the configuration file used by [`run_update`](Self::run_update)
    pub fn select_config(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!("Selected config: {:?}", path);
        self.config_path = Some(path);
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Run every configured replacement against `doc`
    ///
    /// Only a missing or invalid configuration (or a failed save) is an error;
    /// skipped entries are reported in the returned [`UpdateReport`]. The
    /// document is saved when the configuration sets `save_document`.
    pub fn run_update(&self, doc: &mut Document) -> Result<UpdateReport, SessionError> {
        let path = self.config_path.as_ref().ok_or(SessionError::NoConfigSelected)?;
        if !path.exists() {
            return Err(SessionError::ConfigNotFound(path.clone()));
        }

        let updater = Updater::from_config_file(path)?;
        let report = updater.update_all(doc);

        if updater.config().save_document
            && let Some(save_path) = updater.save_path()
        {
            doc.save(&save_path)?;
        }

        tracing::info!("Mesh update completed");
        Ok(report)
    }
}
