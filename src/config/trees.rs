//! Call-flow tree loading configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Where YAML tree documents are read from at startup
#[derive(Debug, Clone, Deserialize)]
pub struct TreesConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
}

impl Default for TreesConfig {
    fn default() -> Self {
        Self { dir: default_dir() }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("trees")
}
