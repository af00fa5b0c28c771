pub const CONFIG_DIR: &str = "/data/adb/.config/tivohome";
pub const SETTINGS_FILE: &str = "/data/adb/.config/tivohome/settings.toml";
pub const PREFS_FILE: &str = "/data/adb/.config/tivohome/prefs.toml";
pub const UI_DUMP_FILE: &str = "/data/local/tmp/tivohome-window.xml";
