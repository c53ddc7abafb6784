use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Remembered between runs. The shader lock is never stored, so every
/// session starts unlocked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub last_shader: Option<PathBuf>,
    pub debug_enabled: bool,
}

impl AppState {
    /// A missing file is a first run; anything unreadable or malformed is an
    /// error for the caller to report.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("cannot read {}", path.display()));
            }
        };
        toml::from_str(&contents).with_context(|| format!("{} is not valid state", path.display()))
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let rendered = toml::to_string_pretty(self).context("cannot render state as TOML")?;
        fs::write(path, rendered).with_context(|| format!("cannot write {}", path.display()))
    }
}
