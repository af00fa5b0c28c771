use crate::core::dumpsys::usage::{UsageEvent, UsageEventKind, UsageEventSource};
use crate::core::prefs;
use crate::daemon::config::WatcherConfig;
use crate::daemon::run::{Daemon, now_ms};
use crate::daemon::state::ForegroundState;
use tracing::{debug, error, warn};

/// Whether the daemon loop keeps running after this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    /// No usage events for the whole idle timeout: shut down.
    IdleShutdown,
}

/// The newest moved-to-foreground transition in a batch of usage events.
pub(crate) struct Observation {
    pub package: String,
    pub ts_ms: i64,
}

pub(crate) fn newest_foreground(events: Vec<UsageEvent>) -> Option<Observation> {
    events
        .into_iter()
        .filter(|e| e.kind == UsageEventKind::MovedToForeground)
        .max_by_key(|e| e.ts_ms)
        .map(|e| Observation {
            package: e.package,
            ts_ms: e.ts_ms,
        })
}

/// What the watcher should do with its one scheduled-launch slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WatchStep {
    /// Leave everything as it is.
    Hold,
    /// Cancel any pending launch.
    Cancel,
    /// Cancel any pending launch, then arm one for `package`.
    Schedule { package: String, delay_ms: u64 },
}

/// One decision step of the foreground watcher. Mutates the tracking state
/// (package change, first-seen, cooldown reset) and returns the slot action.
pub(crate) fn step(
    state: &mut ForegroundState,
    scheduled_for: Option<&str>,
    obs: Option<&Observation>,
    suppressed: bool,
    now_ms: i64,
    cfg: &WatcherConfig,
) -> WatchStep {
    let Some(obs) = obs else {
        // no foreground transition inside the window
        return WatchStep::Hold;
    };

    let changed = state.package.as_deref() != Some(obs.package.as_str());
    if changed {
        debug!(target: "tivohome::daemon", "Foreground changed -> {} at {}", obs.package, obs.ts_ms);
        state.package = Some(obs.package.clone());
        state.first_seen_ms = obs.ts_ms;
    }

    let action = evaluate(state, scheduled_for, suppressed, now_ms, cfg);
    // a package change always invalidates whatever was armed for the old one
    if changed && action == WatchStep::Hold {
        WatchStep::Cancel
    } else {
        action
    }
}

fn evaluate(
    state: &mut ForegroundState,
    scheduled_for: Option<&str>,
    suppressed: bool,
    now_ms: i64,
    cfg: &WatcherConfig,
) -> WatchStep {
    let pkg = state
        .package
        .clone()
        .expect("evaluate runs only with a tracked package");

    if !matches_target(&pkg, cfg) {
        if pkg == cfg.redirect_package {
            // the replacement app on screen must never block a later redirect
            state.last_launch_ms = 0;
        }
        return WatchStep::Cancel;
    }

    if cfg.ignore_packages.iter().any(|p| p == &pkg) {
        debug!(target: "tivohome::daemon", "Foreground {} is ours/ignored, not redirecting", pkg);
        return WatchStep::Cancel;
    }

    if suppressed {
        debug!(target: "tivohome::daemon", "Auto-launch suppressed by configuration UI");
        return WatchStep::Cancel;
    }

    let since_launch = now_ms - state.last_launch_ms;
    if since_launch < cfg.launch_cooldown_ms {
        debug!(target: "tivohome::daemon", "{} foreground but in cooldown ({since_launch}ms)", pkg);
        return WatchStep::Hold;
    }

    if scheduled_for == Some(pkg.as_str()) {
        return WatchStep::Hold;
    }

    let age = now_ms - state.first_seen_ms;
    let delay_ms = (cfg.persistence_ms - age).max(0) as u64;
    WatchStep::Schedule {
        package: pkg,
        delay_ms,
    }
}

/// Target-name predicate: case-insensitive substring or the exact fallback
/// guess, never the redirect target itself.
fn matches_target(pkg: &str, cfg: &WatcherConfig) -> bool {
    if pkg == cfg.redirect_package {
        return false;
    }
    pkg.to_lowercase().contains(&cfg.match_substring) || pkg == cfg.fallback_guess
}

/// Fire-time re-validation: the package must still be tracked, must have
/// been stable for the whole persistence window, and suppression is
/// re-checked at the moment the launch would happen.
pub(crate) fn validate_fire(
    state: &ForegroundState,
    package: &str,
    suppressed: bool,
    now_ms: i64,
    cfg: &WatcherConfig,
) -> bool {
    if suppressed {
        debug!(target: "tivohome::daemon", "Scheduled launch dropped: suppression active");
        return false;
    }
    if state.package.as_deref() != Some(package) {
        debug!(
            target: "tivohome::daemon",
            "Scheduled launch dropped: {} no longer foreground", package
        );
        return false;
    }
    let stable_for = now_ms - state.first_seen_ms;
    if stable_for < cfg.persistence_ms {
        debug!(
            target: "tivohome::daemon",
            "Scheduled launch dropped: {} only stable {}ms", package, stable_for
        );
        return false;
    }
    true
}

impl Daemon {
    pub async fn tick(&mut self) -> TickFlow {
        self.tick_count = self.tick_count.wrapping_add(1);
        let now = now_ms();

        let events = match self
            .source
            .query(now - self.cfg.lookback_ms, now)
            .await
        {
            Ok(ev) => ev,
            Err(e) => {
                self.report_tick_error(e, now);
                Vec::new()
            }
        };

        if events.is_empty() {
            if now - self.state.last_event_seen_ms >= self.cfg.no_usage_timeout_ms {
                warn!(
                    target: "tivohome::daemon",
                    "No usage events for {}ms, stopping to save resources",
                    self.cfg.no_usage_timeout_ms
                );
                return TickFlow::IdleShutdown;
            }
            return TickFlow::Continue;
        }
        self.state.last_event_seen_ms = now;

        let obs = newest_foreground(events);
        let suppressed = prefs::launch_suppressed();
        let scheduled_for = self.scheduled.as_ref().map(|s| s.package.clone());

        match step(
            &mut self.state,
            scheduled_for.as_deref(),
            obs.as_ref(),
            suppressed,
            now,
            &self.cfg,
        ) {
            WatchStep::Hold => {}
            WatchStep::Cancel => self.cancel_scheduled(),
            WatchStep::Schedule { package, delay_ms } => {
                self.schedule_launch(package, delay_ms);
            }
        }

        TickFlow::Continue
    }

    /// Repeated identical tick errors collapse into one log line per
    /// debounce window.
    fn report_tick_error(&mut self, e: anyhow::Error, now: i64) {
        let msg = e.to_string();
        let should_log = match &self.last_error {
            None => true,
            Some((last_msg, last_at)) => {
                msg != *last_msg || now - last_at >= self.error_debounce_ms
            }
        };
        if should_log {
            error!(target: "tivohome::daemon", "Tick error: {:#}", e);
            self.last_error = Some((msg, now));
        } else {
            debug!(target: "tivohome::daemon", "Tick error suppressed: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // realistic wall-clock base so the initial zeroed cooldown is long past
    const T0: i64 = 1_700_000_000_000;

    fn cfg() -> WatcherConfig {
        WatcherConfig {
            persistence_ms: 1500,
            launch_cooldown_ms: 5000,
            lookback_ms: 5000,
            no_usage_timeout_ms: 300_000,
            match_substring: "tivo".into(),
            fallback_guess: "com.tivostream.app".into(),
            redirect_package: "com.google.android.apps.tv.launcherx".into(),
            ignore_packages: vec!["com.fiospace.tivochannelshome".into()],
        }
    }

    fn obs(pkg: &str, ts: i64) -> Observation {
        Observation {
            package: pkg.into(),
            ts_ms: ts,
        }
    }

    #[test]
    fn fresh_target_schedules_with_the_full_persistence_window() {
        let mut state = ForegroundState::default();

        let action = step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0, &cfg());

        assert_eq!(
            action,
            WatchStep::Schedule {
                package: "com.tivo.X".into(),
                delay_ms: 1500
            }
        );
        assert_eq!(state.first_seen_ms, T0);
    }

    #[test]
    fn stable_target_fires_at_persistence_and_change_aborts() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0, &cfg);

        // unchanged at t+1500: the scheduled fire validates
        assert!(validate_fire(&state, "com.tivo.X", false, T0 + 1500, &cfg));

        // package flips at t+800: slot cancelled, fire no longer validates
        let action = step(
            &mut state,
            Some("com.tivo.X"),
            Some(&obs("com.other", T0 + 800)),
            false,
            T0 + 800,
            &cfg,
        );
        assert_eq!(action, WatchStep::Cancel);
        assert!(!validate_fire(&state, "com.tivo.X", false, T0 + 1500, &cfg));
    }

    #[test]
    fn at_most_one_launch_per_cooldown_window() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0, &cfg);
        assert!(validate_fire(&state, "com.tivo.X", false, T0 + 1500, &cfg));
        state.last_launch_ms = T0 + 1500;

        // still (or again) foreground right after the launch: held back
        for dt in [2000, 3000, 6000] {
            let action = step(
                &mut state,
                None,
                Some(&obs("com.tivo.X", T0)),
                false,
                T0 + dt,
                &cfg,
            );
            assert_eq!(action, WatchStep::Hold, "at t+{dt}");
        }

        // cooldown over at t+1500+5000
        let action = step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0 + 6500, &cfg);
        assert!(matches!(action, WatchStep::Schedule { delay_ms: 0, .. }));
    }

    #[test]
    fn suppression_cancels_and_blocks_the_fire() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        let action = step(&mut state, None, Some(&obs("com.tivo.X", T0)), true, T0, &cfg);
        assert_eq!(action, WatchStep::Cancel);

        // armed earlier, suppression flips on before the timer fires
        step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0, &cfg);
        assert!(!validate_fire(&state, "com.tivo.X", true, T0 + 1500, &cfg));
    }

    #[test]
    fn own_and_redirect_packages_never_schedule() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        let action = step(
            &mut state,
            None,
            Some(&obs("com.fiospace.tivochannelshome", T0)),
            false,
            T0,
            &cfg,
        );
        assert_eq!(action, WatchStep::Cancel);

        state.last_launch_ms = T0;
        let action = step(
            &mut state,
            None,
            Some(&obs("com.google.android.apps.tv.launcherx", T0 + 100)),
            false,
            T0 + 100,
            &cfg,
        );
        assert_eq!(action, WatchStep::Cancel);
        // the replacement app on screen clears the cooldown
        assert_eq!(state.last_launch_ms, 0);
    }

    #[test]
    fn aged_target_schedules_immediately() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        step(&mut state, None, Some(&obs("com.tivostream.app", T0)), false, T0, &cfg);
        // same package still foreground 2s later, nothing was armed
        let action = step(
            &mut state,
            None,
            Some(&obs("com.tivostream.app", T0)),
            false,
            T0 + 2000,
            &cfg,
        );
        assert!(matches!(action, WatchStep::Schedule { delay_ms: 0, .. }));
    }

    #[test]
    fn an_armed_slot_is_left_alone() {
        let mut state = ForegroundState::default();
        let cfg = cfg();

        step(&mut state, None, Some(&obs("com.tivo.X", T0)), false, T0, &cfg);
        let action = step(
            &mut state,
            Some("com.tivo.X"),
            Some(&obs("com.tivo.X", T0)),
            false,
            T0 + 500,
            &cfg,
        );
        assert_eq!(action, WatchStep::Hold);
    }

    #[test]
    fn newest_transition_wins_and_other_kinds_are_ignored() {
        let events = vec![
            UsageEvent {
                ts_ms: 10,
                package: "com.a".into(),
                kind: UsageEventKind::MovedToForeground,
            },
            UsageEvent {
                ts_ms: 30,
                package: "com.c".into(),
                kind: UsageEventKind::Other,
            },
            UsageEvent {
                ts_ms: 20,
                package: "com.b".into(),
                kind: UsageEventKind::MovedToForeground,
            },
        ];

        let newest = newest_foreground(events).unwrap();
        assert_eq!(newest.package, "com.b");
        assert_eq!(newest.ts_ms, 20);

        assert!(newest_foreground(Vec::new()).is_none());
    }
}
