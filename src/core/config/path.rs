use std::path::PathBuf;

pub use crate::common::constants::CONFIG_DIR;
use crate::common::constants::{PREFS_FILE, SETTINGS_FILE};

pub fn settings_path() -> PathBuf {
    PathBuf::from(SETTINGS_FILE)
}

pub fn prefs_path() -> PathBuf {
    PathBuf::from(PREFS_FILE)
}
