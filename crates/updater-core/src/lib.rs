//! Scene Updater Core
//!
//! Replaces mesh geometry inside an existing scene document while keeping
//! everything else attached to the replaced objects:
//! - document: Scene document with named entities, meshes and UV layers
//! - import: STL and glTF/GLB loading into temporary entities
//! - merge: Geometry replacement that preserves target properties
//! - config: JSON run configuration
//! - updater: Orchestration over the configured entries
//! - session: Select-config / run-update command surface

pub mod config;
pub mod document;
pub mod import;
pub mod merge;
pub mod session;
pub mod updater;

pub use config::*;
pub use document::*;
pub use import::{ImportError, MeshFormat, STL_UNIT_SCALE, import};
pub use merge::{MergeError, MergeOptions, merge, replace_geometry};
pub use session::*;
pub use updater::*;
