use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub daemon: DaemonSection,
    pub target: TargetSection,
    pub keys: KeySection,
    pub oem: OemSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonSection {
    pub log_level: String,
    /// Foreground poll tick.
    pub poll_interval_ms: u64,
    /// Trailing window handed to the usage-event query.
    pub lookback_ms: u64,
    /// How long a matching package must stay foreground before we act.
    pub persistence_ms: u64,
    /// Minimum spacing between two automatic launches.
    pub launch_cooldown_ms: u64,
    /// With no usage events for this long the watcher shuts itself down.
    pub no_usage_timeout_ms: u64,
    /// Launch the replacement app once per boot on daemon start.
    pub boot_launch: bool,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            poll_interval_ms: 1000,
            lookback_ms: 5000,
            persistence_ms: 1500,
            launch_cooldown_ms: 5000,
            no_usage_timeout_ms: 5 * 60 * 1000,
            boot_launch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetSection {
    /// Case-insensitive substring that marks a foreground package as TiVo.
    pub match_substring: String,
    /// Exact package to match even if the substring ever stops applying.
    pub fallback_guess: String,
    /// Where the foreground watcher redirects to (Google TV home).
    pub redirect_package: String,
    /// Where the remote-key shortcuts go (Channels DVR).
    pub channels_package: String,
    /// Player activity inside the Channels package, for live TV.
    pub player_component: String,
    /// Never treated as TiVo even when they match (the companion config
    /// app's package lives here so opening it does not trigger a redirect).
    pub ignore_packages: Vec<String>,
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            match_substring: "tivo".into(),
            fallback_guess: "com.tivostream.app".into(),
            redirect_package: "com.google.android.apps.tv.launcherx".into(),
            channels_package: "com.getchannels.dvr.app".into(),
            player_component: "com.getchannels.android.PlayerActivity".into(),
            ignore_packages: vec!["com.fiospace.tivochannelshome".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeySection {
    /// Duplicate-press window for the pause/break key.
    pub debounce_ms: u64,
    /// Specific /dev/input node to read; all devices when unset.
    pub input_device: Option<String>,
}

impl Default for KeySection {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            input_device: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OemSection {
    pub packages: Vec<String>,
    pub silent_timeout_ms: u64,
    pub removal_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for OemSection {
    fn default() -> Self {
        Self {
            packages: [
                "com.tivo.atom",
                "com.amazon.freevee",
                "com.sling",
                "com.amazon.amazonvideo.livingroom",
                "com.amazon.avod",
                "com.google.android.play.games",
                "com.google.android.videos",
                "com.bydeluxe.d3.android.program.starz",
                "com.netflix.ninja",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            silent_timeout_ms: 15_000,
            removal_timeout_ms: 60_000,
            poll_interval_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings; a missing file yields the defaults so a bare install
    /// runs without any provisioning step.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;

        toml::from_str(&content).context("Failed to parse settings.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_per_section() {
        let s: Settings = toml::from_str(
            r#"
            [daemon]
            persistence_ms = 2000

            [target]
            match_substring = "TiVo"
            "#,
        )
        .unwrap();

        assert_eq!(s.daemon.persistence_ms, 2000);
        assert_eq!(s.daemon.launch_cooldown_ms, 5000);
        assert_eq!(s.target.match_substring, "TiVo");
        assert_eq!(s.keys.debounce_ms, 300);
        assert_eq!(s.oem.packages.len(), 9);
    }

    #[test]
    fn missing_file_is_defaults() {
        let s = Settings::load("/nonexistent/does-not-exist.toml").unwrap();
        assert_eq!(s.daemon.poll_interval_ms, 1000);
        assert!(s.daemon.boot_launch);
    }
}
