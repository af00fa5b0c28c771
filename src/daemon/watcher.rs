use crate::core::config::{CONFIG_DIR, settings_path};
use notify::{EventKind, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Watch the config directory and signal the daemon loop whenever
/// settings.toml changes. The directory (not the file) is watched so a
/// settings file created after daemon start is still picked up.
pub fn start_settings_watcher() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel::<()>(4);

    std::thread::spawn(move || {
        let settings_name = settings_path();
        let settings_name = settings_name.file_name().map(OsStr::to_os_string);

        let mut watcher = match notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else { return };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                let is_settings = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(OsStr::to_os_string) == settings_name);
                if is_settings {
                    let _ = tx.blocking_send(());
                }
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                error!(target: "tivohome::daemon", "Failed to create settings watcher: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::create_dir_all(CONFIG_DIR) {
            error!(target: "tivohome::daemon", "Failed to create {}: {}", CONFIG_DIR, e);
            return;
        }
        if let Err(e) = watcher.watch(Path::new(CONFIG_DIR), RecursiveMode::NonRecursive) {
            error!(target: "tivohome::daemon", "Failed to watch {}: {}", CONFIG_DIR, e);
            return;
        }

        debug!(target: "tivohome::daemon", "Settings watcher started");
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    });

    rx
}
