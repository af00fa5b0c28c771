use tokio::task::JoinHandle;

/// Foreground-tracking state. Owned and mutated only by the daemon loop.
#[derive(Debug, Default)]
pub struct ForegroundState {
    /// Currently tracked foreground package.
    pub package: Option<String>,
    /// When the tracked package was first observed foreground.
    pub first_seen_ms: i64,
    /// Last automatic launch; cooldown is measured from here.
    pub last_launch_ms: i64,
    /// Last time any usage event was observed, for the idle shutdown.
    pub last_event_seen_ms: i64,
}

/// The single outstanding scheduled launch. Replacing it always aborts the
/// previous timer first, so at most one exists at any time.
#[derive(Debug)]
pub struct ScheduledLaunch {
    pub package: String,
    pub handle: JoinHandle<()>,
}
