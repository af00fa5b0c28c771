use crate::core::config::{Settings, prefs_path, settings_path};
use crate::core::dumpsys::usage::ResumedActivitySource;
use crate::core::input::KeyEvent;
use crate::core::prefs::{self, Prefs};
use crate::core::{cmd, launch, notice, ui};
use crate::daemon::config::WatcherConfig;
use crate::daemon::keys::{KeyAction, KeyInterceptor};
use crate::daemon::state::{ForegroundState, ScheduledLaunch};
use crate::daemon::tick::TickFlow;
use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::{signal, time};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Keywords identifying the on-screen playback control.
const PLAYBACK_KEYWORDS: &[&str] = &["pause", "play"];

/// KEYCODE_BACK
const BACK_KEYEVENT: &str = "4";

#[inline]
pub(crate) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|_| {
            warn!(target: "tivohome::daemon", "System clock before epoch, using 0");
            0
        })
}

/// Wall-clock instant of the current boot, derived from /proc/uptime.
/// Stable across the boot (modulo clock sync jitter), different each boot.
pub(crate) fn boot_epoch_ms() -> i64 {
    let uptime_ms = std::fs::read_to_string("/proc/uptime")
        .ok()
        .and_then(|s| {
            s.split_whitespace()
                .next()
                .and_then(|v| v.parse::<f64>().ok())
        })
        .map(|secs| (secs * 1000.0) as i64)
        .unwrap_or(0);
    now_ms() - uptime_ms
}

pub type ReloadHandle =
    tracing_subscriber::reload::Handle<EnvFilter, tracing_subscriber::Registry>;

pub struct Daemon {
    pub(crate) cfg: WatcherConfig,
    pub(crate) settings: Settings,
    pub(crate) state: ForegroundState,
    pub(crate) scheduled: Option<ScheduledLaunch>,
    pub(crate) interceptor: KeyInterceptor,
    pub(crate) source: ResumedActivitySource,
    pub(crate) fire_tx: mpsc::Sender<String>,
    pub(crate) last_error: Option<(String, i64)>,
    pub(crate) error_debounce_ms: i64,
    pub(crate) tick_count: u64,
}

impl Daemon {
    pub fn new(settings: Settings, fire_tx: mpsc::Sender<String>) -> Self {
        let cfg = WatcherConfig::from_settings(&settings);
        let interceptor = KeyInterceptor::new(settings.keys.debounce_ms);
        Self {
            cfg,
            settings,
            state: ForegroundState {
                last_event_seen_ms: now_ms(),
                ..Default::default()
            },
            scheduled: None,
            interceptor,
            source: ResumedActivitySource,
            fire_tx,
            last_error: None,
            error_debounce_ms: 30_000,
            tick_count: 0,
        }
    }

    /// Idempotent: aborting an already-finished timer is a no-op.
    pub(crate) fn cancel_scheduled(&mut self) {
        if let Some(s) = self.scheduled.take() {
            s.handle.abort();
            debug!(target: "tivohome::daemon", "Cancelled scheduled launch for {}", s.package);
        }
    }

    /// Arm the one launch slot; whatever was pending is aborted first.
    pub(crate) fn schedule_launch(&mut self, package: String, delay_ms: u64) {
        self.cancel_scheduled();
        debug!(
            target: "tivohome::daemon",
            "Scheduling redirect for {} in {}ms", package, delay_ms
        );
        let tx = self.fire_tx.clone();
        let pkg = package.clone();
        let handle = tokio::spawn(async move {
            time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = tx.send(pkg).await;
        });
        self.scheduled = Some(ScheduledLaunch { package, handle });
    }

    /// Timer expiry lands back on the loop thread; re-validate and launch.
    pub(crate) async fn fire_scheduled(&mut self, package: String) {
        self.scheduled = None;

        let now = now_ms();
        let suppressed = prefs::launch_suppressed();
        if !crate::daemon::tick::validate_fire(&self.state, &package, suppressed, now, &self.cfg)
        {
            return;
        }

        info!(
            target: "tivohome::daemon",
            "{} stable for {}ms, launching {}",
            package,
            now - self.state.first_seen_ms,
            self.cfg.redirect_package
        );
        if launch::launch_package(&self.cfg.redirect_package, &[]).await {
            self.state.last_launch_ms = now_ms();
        } else {
            warn!(target: "tivohome::daemon", "Redirect launch did not succeed");
        }
    }

    pub(crate) async fn handle_key(&mut self, ev: KeyEvent) {
        let decision = self.interceptor.on_key(&ev, now_ms());
        let Some(action) = decision.action else {
            return;
        };

        match action {
            KeyAction::GlobalBack => {
                info!(target: "tivohome::keys", "Escape released, sending Back");
                global_back().await;
            }
            KeyAction::ClickPlayPause => {
                info!(target: "tivohome::keys", "Pause key, clicking the on-screen control");
                match ui::click_first_match(PLAYBACK_KEYWORDS).await {
                    Ok(true) => info!(target: "tivohome::keys", "Clicked play/pause"),
                    Ok(false) => {
                        warn!(target: "tivohome::keys", "No play/pause control on screen")
                    }
                    Err(e) => warn!(target: "tivohome::keys", "Play/pause click failed: {:#}", e),
                }
            }
            KeyAction::Launch(view) => {
                info!(target: "tivohome::keys", "Shortcut launch: {:?}", view);
                launch::launch_view(&self.settings.target, view).await;
            }
        }
    }

    fn reload_settings(&mut self, filter_handle: &ReloadHandle) {
        match Settings::load(settings_path()) {
            Ok(new_settings) => {
                if new_settings.daemon.log_level != self.settings.daemon.log_level
                    && let Err(e) =
                        filter_handle.reload(EnvFilter::new(&new_settings.daemon.log_level))
                {
                    warn!(target: "tivohome::daemon", "Failed to switch log level: {}", e);
                }
                self.cfg = WatcherConfig::from_settings(&new_settings);
                self.interceptor = KeyInterceptor::new(new_settings.keys.debounce_ms);
                self.settings = new_settings;
                info!(target: "tivohome::daemon", "Settings reloaded");
            }
            Err(e) => {
                warn!(target: "tivohome::daemon", "Settings reload failed: {:#}", e);
            }
        }
    }
}

async fn global_back() {
    match cmd::run_cmd_timeout_async("/system/bin/input", &["keyevent", BACK_KEYEVENT], 3000).await
    {
        Ok(out) if cmd::cmd_ok(&out) => {}
        Ok(_) | Err(_) => warn!(target: "tivohome::keys", "Back injection failed"),
    }
}

/// Launch the replacement app once per boot cycle, guarded by the persisted
/// boot marker.
async fn maybe_boot_launch(cfg: &WatcherConfig) {
    let boot = boot_epoch_ms();
    let path = prefs_path();
    let mut prefs = Prefs::load(&path);

    // a minute of slack absorbs NTP adjustments after early boot
    if (prefs.boot_launch_marker_ms - boot).abs() < 60_000 {
        debug!(target: "tivohome::daemon", "Boot launch already done this cycle");
        return;
    }

    info!(target: "tivohome::daemon", "First start this boot, launching {}", cfg.redirect_package);
    if launch::launch_package(&cfg.redirect_package, &[]).await {
        prefs.boot_launch_marker_ms = boot;
        if let Err(e) = prefs.store(&path) {
            warn!(target: "tivohome::daemon", "Failed to persist boot marker: {:#}", e);
        }
    }
}

pub async fn run_with_settings(settings: Settings, filter_handle: ReloadHandle) -> Result<()> {
    let (fire_tx, mut fire_rx) = mpsc::channel::<String>(4);
    let mut daemon = Daemon::new(settings, fire_tx);

    if daemon.settings.daemon.boot_launch {
        maybe_boot_launch(&daemon.cfg).await;
    }
    notice::post_status("Monitoring foreground apps; TiVo redirects to Channels DVR").await;

    let mut key_rx = match crate::core::input::spawn_key_reader(
        daemon.settings.keys.input_device.clone(),
    ) {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!(
                target: "tivohome::keys",
                "Key interception unavailable: {:#}. Foreground watcher keeps running.", e
            );
            None
        }
    };

    let mut reload_rx = crate::daemon::watcher::start_settings_watcher();

    debug!(
        target: "tivohome::daemon",
        "Tick loop started ({}ms)",
        daemon.settings.daemon.poll_interval_ms
    );

    loop {
        let poll = Duration::from_millis(daemon.settings.daemon.poll_interval_ms);
        tokio::select! {
            _ = time::sleep(poll) => {
                if daemon.tick().await == TickFlow::IdleShutdown {
                    break;
                }
            }
            Some(pkg) = fire_rx.recv() => {
                daemon.fire_scheduled(pkg).await;
            }
            Some(ev) = recv_key(&mut key_rx) => {
                daemon.handle_key(ev).await;
            }
            Some(()) = reload_rx.recv() => {
                daemon.reload_settings(&filter_handle);
            }
            _ = signal::ctrl_c() => {
                info!(target: "tivohome::daemon", "Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    daemon.cancel_scheduled();
    info!(target: "tivohome::daemon", "Daemon stopped");
    Ok(())
}

async fn recv_key(
    rx: &mut Option<mpsc::Receiver<KeyEvent>>,
) -> Option<KeyEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
