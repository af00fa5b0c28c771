//! Launch Resolver: explicit component → default launch activity → store
//! page → web page. The first success short-circuits; total failure is a
//! logged outcome, never an error for the caller.

use crate::common::types::TargetView;
use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use crate::core::config::TargetSection;
use crate::error::ShimError;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// FLAG_ACTIVITY_NEW_TASK | FLAG_ACTIVITY_CLEAR_TOP
const ACTIVITY_FLAGS: &str = "0x14000000";
/// FLAG_ACTIVITY_NEW_TASK only, for VIEW intents.
const NEW_TASK_FLAG: &str = "0x10000000";

const AM_TIMEOUT_MS: u64 = 5000;

/// Extras forwarded to the started activity.
#[derive(Debug, Clone)]
pub enum Extra {
    Str(&'static str, String),
    Bool(&'static str, bool),
}

impl Extra {
    fn push_args(&self, args: &mut Vec<String>) {
        match self {
            Extra::Str(k, v) => {
                args.extend(["--es".into(), (*k).into(), v.clone()]);
            }
            Extra::Bool(k, v) => {
                args.extend(["--ez".into(), (*k).into(), v.to_string()]);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Component,
    LaunchIntent,
    Store,
    Web,
    Failed,
}

/// Activity-manager seam, split out so the fallback order is testable.
#[async_trait]
pub trait LaunchPort {
    async fn start_component(&mut self, component: &str, extras: &[Extra]) -> bool;
    async fn resolve_launch_component(&mut self, pkg: &str) -> Option<String>;
    async fn view_uri(&mut self, uri: &str) -> bool;
}

/// Production port shelling out to `am start`.
pub struct AmLaunchPort;

#[async_trait]
impl LaunchPort for AmLaunchPort {
    async fn start_component(&mut self, component: &str, extras: &[Extra]) -> bool {
        let mut args: Vec<String> = vec![
            "start".into(),
            "-n".into(),
            component.into(),
            "-f".into(),
            ACTIVITY_FLAGS.into(),
        ];
        for e in extras {
            e.push_args(&mut args);
        }
        am(&args).await
    }

    async fn resolve_launch_component(&mut self, pkg: &str) -> Option<String> {
        match crate::core::pm::resolve_launch_component(pkg).await {
            Ok(c) => c,
            Err(e) => {
                debug!(target: "tivohome::launch", "resolve-activity {} failed: {:#}", pkg, e);
                None
            }
        }
    }

    async fn view_uri(&mut self, uri: &str) -> bool {
        am(&[
            "start".into(),
            "-a".into(),
            "android.intent.action.VIEW".into(),
            "-d".into(),
            uri.into(),
            "-f".into(),
            NEW_TASK_FLAG.into(),
        ])
        .await
    }
}

async fn am(args: &[String]) -> bool {
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    match run_cmd_timeout_async("/system/bin/am", &argv, AM_TIMEOUT_MS).await {
        Ok(out) => {
            let ok = cmd_ok(&out);
            if !ok {
                debug!(
                    target: "tivohome::launch",
                    "am {} -> {}",
                    args.join(" "),
                    String::from_utf8_lossy(&out.stdout).trim()
                );
            }
            ok
        }
        Err(e) => {
            warn!(target: "tivohome::launch", "am start failed: {:#}", e);
            false
        }
    }
}

/// Walk the fallback chain for `pkg`. `component` may be a bare class name
/// (qualified against `pkg`) or a full `pkg/class` component.
pub async fn resolve_and_launch<P: LaunchPort + Send>(
    port: &mut P,
    pkg: &str,
    component: Option<&str>,
    extras: &[Extra],
) -> LaunchOutcome {
    if let Some(cls) = component {
        let full = if cls.contains('/') {
            cls.to_string()
        } else {
            format!("{}/{}", pkg, cls)
        };
        if port.start_component(&full, extras).await {
            info!(target: "tivohome::launch", "Started {}", full);
            return LaunchOutcome::Component;
        }
        debug!(target: "tivohome::launch", "Explicit component {} failed, falling back", full);
    }

    if let Some(entry) = port.resolve_launch_component(pkg).await {
        if port.start_component(&entry, extras).await {
            info!(target: "tivohome::launch", "Started {}", entry);
            return LaunchOutcome::LaunchIntent;
        }
        debug!(target: "tivohome::launch", "Launch activity {} failed, falling back", entry);
    }

    if port.view_uri(&format!("market://details?id={pkg}")).await {
        info!(target: "tivohome::launch", "Opened store page for {}", pkg);
        return LaunchOutcome::Store;
    }

    if port
        .view_uri(&format!("https://play.google.com/store/apps/details?id={pkg}"))
        .await
    {
        info!(target: "tivohome::launch", "Opened web store page for {}", pkg);
        return LaunchOutcome::Web;
    }

    warn!(
        target: "tivohome::launch",
        "{}",
        ShimError::TargetUnavailable(pkg.to_string())
    );
    LaunchOutcome::Failed
}

/// Plain launch of a package through the production port.
pub async fn launch_package(pkg: &str, extras: &[Extra]) -> bool {
    resolve_and_launch(&mut AmLaunchPort, pkg, None, extras).await != LaunchOutcome::Failed
}

/// Key-shortcut entry point: `None` opens the Channels app itself, `Live`
/// goes through the player component, the rest select a tab.
pub async fn launch_view(cfg: &TargetSection, view: Option<TargetView>) -> bool {
    match view {
        None => launch_package(&cfg.channels_package, &[]).await,
        Some(TargetView::Live) => {
            let extras = [Extra::Bool("open_live", true)];
            resolve_and_launch(
                &mut AmLaunchPort,
                &cfg.channels_package,
                Some(&cfg.player_component),
                &extras,
            )
            .await
                != LaunchOutcome::Failed
        }
        Some(view) => {
            let extras = [Extra::Str("tab", view.tab_extra().unwrap_or("").to_string())];
            launch_package(&cfg.channels_package, &extras).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePort {
        component_starts: bool,
        launch_entry: Option<String>,
        store_works: bool,
        web_works: bool,
        calls: Vec<String>,
    }

    #[async_trait]
    impl LaunchPort for FakePort {
        async fn start_component(&mut self, component: &str, _extras: &[Extra]) -> bool {
            self.calls.push(format!("start {component}"));
            self.component_starts
        }

        async fn resolve_launch_component(&mut self, pkg: &str) -> Option<String> {
            self.calls.push(format!("resolve {pkg}"));
            self.launch_entry.clone()
        }

        async fn view_uri(&mut self, uri: &str) -> bool {
            self.calls.push(format!("view {uri}"));
            if uri.starts_with("market://") {
                self.store_works
            } else {
                self.web_works
            }
        }
    }

    #[tokio::test]
    async fn no_launch_intent_and_no_store_hits_web_exactly_once() {
        let mut port = FakePort {
            web_works: true,
            ..Default::default()
        };

        let outcome = resolve_and_launch(&mut port, "com.example.app", None, &[]).await;

        assert_eq!(outcome, LaunchOutcome::Web);
        assert_eq!(
            port.calls,
            vec![
                "resolve com.example.app",
                "view market://details?id=com.example.app",
                "view https://play.google.com/store/apps/details?id=com.example.app",
            ]
        );
    }

    #[tokio::test]
    async fn explicit_component_short_circuits() {
        let mut port = FakePort {
            component_starts: true,
            ..Default::default()
        };

        let outcome = resolve_and_launch(
            &mut port,
            "com.getchannels.dvr.app",
            Some("com.getchannels.android.PlayerActivity"),
            &[],
        )
        .await;

        assert_eq!(outcome, LaunchOutcome::Component);
        assert_eq!(
            port.calls,
            vec!["start com.getchannels.dvr.app/com.getchannels.android.PlayerActivity"]
        );
    }

    #[tokio::test]
    async fn launch_intent_used_when_no_component_given() {
        let mut port = FakePort {
            component_starts: true,
            launch_entry: Some("com.a.b/.Main".into()),
            ..Default::default()
        };

        let outcome = resolve_and_launch(&mut port, "com.a.b", None, &[]).await;

        assert_eq!(outcome, LaunchOutcome::LaunchIntent);
        assert_eq!(port.calls, vec!["resolve com.a.b", "start com.a.b/.Main"]);
    }

    #[tokio::test]
    async fn everything_failing_is_reported_not_fatal() {
        let mut port = FakePort::default();
        let outcome = resolve_and_launch(&mut port, "com.gone", None, &[]).await;
        assert_eq!(outcome, LaunchOutcome::Failed);
    }
}
