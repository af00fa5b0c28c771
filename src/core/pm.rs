//! Package-registry collaborators, reached through `pm` / `cmd package`.

use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use anyhow::Result;

/// Default launch entry point of a package, as `package/activity`, or None
/// when the package is missing or has no launcher activity.
pub async fn resolve_launch_component(pkg: &str) -> Result<Option<String>> {
    let out = run_cmd_timeout_async(
        "/system/bin/cmd",
        &["package", "resolve-activity", "--brief", pkg],
        2000,
    )
    .await?;

    if !out.status.success() {
        return Ok(None);
    }

    // Last non-empty line is either the component or "No activity found".
    let stdout = String::from_utf8_lossy(&out.stdout);
    let component = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| l.contains('/') && !l.starts_with("No activity"))
        .map(str::to_string);

    Ok(component)
}

/// Presence probe; `pm path` exits non-zero once a package is gone.
pub async fn is_installed(pkg: &str) -> bool {
    match run_cmd_timeout_async("/system/bin/pm", &["path", pkg], 2000).await {
        Ok(out) => cmd_ok(&out) && out.stdout.starts_with(b"package:"),
        Err(e) => {
            tracing::debug!(target: "tivohome::pm", "pm path {} failed: {:#}", pkg, e);
            false
        }
    }
}
