//! Best-effort removal of pre-loaded OEM apps: silent `pm uninstall`,
//! interactive system prompt as fallback, bounded polling for the package
//! to disappear. One package failing never stops the rest.

use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use crate::core::config::OemSection;
use crate::error::ShimError;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Removed { silent: bool },
    TimedOut,
}

impl std::fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Removed { silent: true } => write!(f, "removed (silent)"),
            Self::Removed { silent: false } => write!(f, "removed (interactive)"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Shell seam, split out so the silent/interactive/poll sequencing is
/// testable without a device.
#[async_trait]
pub trait UninstallPort {
    /// `Ok(true)` when the silent uninstall exited zero.
    async fn silent_uninstall(&mut self, pkg: &str, timeout_ms: u64) -> Result<bool>;
    async fn open_uninstall_ui(&mut self, pkg: &str) -> bool;
    async fn is_installed(&mut self, pkg: &str) -> bool;
    async fn sleep_ms(&mut self, ms: u64);
}

pub struct ShellUninstallPort;

#[async_trait]
impl UninstallPort for ShellUninstallPort {
    async fn silent_uninstall(&mut self, pkg: &str, timeout_ms: u64) -> Result<bool> {
        let out = run_cmd_timeout_async(
            "/system/bin/pm",
            &["uninstall", "--user", "0", pkg],
            timeout_ms,
        )
        .await?;
        Ok(out.status.success())
    }

    async fn open_uninstall_ui(&mut self, pkg: &str) -> bool {
        let uri = format!("package:{pkg}");
        match run_cmd_timeout_async(
            "/system/bin/am",
            &[
                "start",
                "-a",
                "android.intent.action.DELETE",
                "-d",
                &uri,
                "-f",
                "0x10000000",
            ],
            5000,
        )
        .await
        {
            Ok(out) => cmd_ok(&out),
            Err(e) => {
                warn!(target: "tivohome::uninstall", "Uninstall UI for {} failed: {:#}", pkg, e);
                false
            }
        }
    }

    async fn is_installed(&mut self, pkg: &str) -> bool {
        crate::core::pm::is_installed(pkg).await
    }

    async fn sleep_ms(&mut self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

/// Run the whole configured list; returns per-package outcomes for the CLI.
pub async fn uninstall_oem_packages<P: UninstallPort + Send>(
    port: &mut P,
    cfg: &OemSection,
) -> Vec<(String, ItemOutcome)> {
    let mut results = Vec::with_capacity(cfg.packages.len());
    for pkg in &cfg.packages {
        let outcome = uninstall_one(port, pkg, cfg).await;
        results.push((pkg.clone(), outcome));
        // breather between items so back-to-back system prompts don't pile up
        port.sleep_ms(500).await;
    }
    results
}

async fn uninstall_one<P: UninstallPort + Send>(
    port: &mut P,
    pkg: &str,
    cfg: &OemSection,
) -> ItemOutcome {
    let silent = match port.silent_uninstall(pkg, cfg.silent_timeout_ms).await {
        Ok(true) => {
            info!(target: "tivohome::uninstall", "Uninstalled {} (silent)", pkg);
            true
        }
        Ok(false) => {
            warn!(target: "tivohome::uninstall", "Silent uninstall refused for {}; falling back to interactive", pkg);
            false
        }
        Err(e) => {
            warn!(target: "tivohome::uninstall", "Silent uninstall failed for {}: {:#}", pkg, e);
            false
        }
    };

    if !silent && !port.open_uninstall_ui(pkg).await {
        warn!(target: "tivohome::uninstall", "Could not open uninstall UI for {}", pkg);
    }

    let poll_ms = cfg.poll_interval_ms.max(1);
    let attempts = (cfg.removal_timeout_ms / poll_ms).max(1);
    for _ in 0..attempts {
        if !port.is_installed(pkg).await {
            info!(target: "tivohome::uninstall", "{} removed", pkg);
            return ItemOutcome::Removed { silent };
        }
        port.sleep_ms(poll_ms).await;
    }

    warn!(
        target: "tivohome::uninstall",
        "Waiting for removal of {}: {}",
        pkg,
        ShimError::Timeout(cfg.removal_timeout_ms)
    );
    ItemOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePort {
        silent_exit_zero: bool,
        installed_polls_until_gone: usize,
        calls: Vec<String>,
    }

    impl FakePort {
        fn new(silent_exit_zero: bool, polls_until_gone: usize) -> Self {
            Self {
                silent_exit_zero,
                installed_polls_until_gone: polls_until_gone,
                calls: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl UninstallPort for FakePort {
        async fn silent_uninstall(&mut self, pkg: &str, _timeout_ms: u64) -> Result<bool> {
            self.calls.push(format!("silent {pkg}"));
            Ok(self.silent_exit_zero)
        }

        async fn open_uninstall_ui(&mut self, pkg: &str) -> bool {
            self.calls.push(format!("ui {pkg}"));
            true
        }

        async fn is_installed(&mut self, pkg: &str) -> bool {
            self.calls.push(format!("check {pkg}"));
            if self.installed_polls_until_gone == 0 {
                return true; // never disappears
            }
            self.installed_polls_until_gone -= 1;
            self.installed_polls_until_gone > 0
        }

        async fn sleep_ms(&mut self, _ms: u64) {}
    }

    fn cfg(pkgs: &[&str]) -> OemSection {
        OemSection {
            packages: pkgs.iter().map(|s| s.to_string()).collect(),
            silent_timeout_ms: 15_000,
            removal_timeout_ms: 60_000,
            poll_interval_ms: 1000,
        }
    }

    #[tokio::test]
    async fn silent_success_skips_interactive_fallback() {
        let mut port = FakePort::new(true, 1);
        let results = uninstall_oem_packages(&mut port, &cfg(&["com.netflix.ninja"])).await;

        assert_eq!(
            results,
            vec![("com.netflix.ninja".to_string(), ItemOutcome::Removed { silent: true })]
        );
        assert!(!port.calls.iter().any(|c| c.starts_with("ui ")));
    }

    #[tokio::test]
    async fn refused_silent_goes_interactive_then_polls() {
        let mut port = FakePort::new(false, 3);
        let results = uninstall_oem_packages(&mut port, &cfg(&["com.sling"])).await;

        assert_eq!(
            results,
            vec![("com.sling".to_string(), ItemOutcome::Removed { silent: false })]
        );
        assert_eq!(
            port.calls[..2],
            ["silent com.sling".to_string(), "ui com.sling".to_string()]
        );
    }

    #[tokio::test]
    async fn stuck_package_times_out_and_the_next_item_still_runs() {
        let mut port = FakePort::new(false, 0);
        let results =
            uninstall_oem_packages(&mut port, &cfg(&["com.amazon.avod", "com.sling"])).await;

        assert_eq!(results[0].1, ItemOutcome::TimedOut);
        // the poll loop is bounded by removal_timeout / poll_interval
        let first_item_checks = port
            .calls
            .iter()
            .filter(|c| *c == "check com.amazon.avod")
            .count();
        assert_eq!(first_item_checks, 60);
        assert!(port.calls.contains(&"silent com.sling".to_string()));
    }
}
