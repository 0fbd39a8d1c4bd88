//! Session store configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Bundled in-memory store configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// YAML file with users and sessions loaded at startup
    pub seed_file: Option<PathBuf>,
}
