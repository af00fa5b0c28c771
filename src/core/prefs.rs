//! Persisted boolean/long flags shared with the configuration surface.
//!
//! Plain TOML file, last-write-wins. The watcher re-reads the file at every
//! decision point instead of caching, so an external writer (the companion
//! config UI) takes effect on the very next tick.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Prefs {
    /// Set while the configuration UI is visible; suppresses auto-launches.
    pub suppress_launch_for_config: bool,
    /// Boot epoch (ms) during which the boot-time launch last fired.
    pub boot_launch_marker_ms: i64,
}

impl Prefs {
    /// Missing or unreadable file degrades to defaults. A corrupt prefs
    /// file must never take the daemon down.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!(target: "tivohome::prefs", "Ignoring corrupt {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create {}", dir.display()))?;
        }
        let content = toml::to_string(self).context("Failed to serialize prefs")?;
        std::fs::write(path, content).context(format!("Failed to write {}", path.display()))
    }
}

/// One-call read of the suppression flag at a launch decision point.
pub fn launch_suppressed() -> bool {
    Prefs::load(crate::core::config::prefs_path()).suppress_launch_for_config
}

/// Writer side of the suppression flag, used by the `suppress` subcommand
/// (standing in for the configuration UI's enter/leave hooks).
pub fn set_suppressed(on: bool) -> Result<()> {
    let path = crate::core::config::prefs_path();
    let mut prefs = Prefs::load(&path);
    prefs.suppress_launch_for_config = on;
    prefs.store(&path)
}
