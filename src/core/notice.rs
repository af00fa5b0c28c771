//! Status side-channel. Purely informational; every failure is swallowed
//! after a log line.

use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use crate::error::ShimError;
use tracing::debug;

const NOTIF_TAG: &str = "tivohome";

/// Post (or replace) the daemon's status notification.
pub async fn post_status(text: &str) {
    let res = run_cmd_timeout_async(
        "/system/bin/cmd",
        &[
            "notification",
            "post",
            "-t",
            "TiVo Channels Home",
            NOTIF_TAG,
            text,
        ],
        3000,
    )
    .await;

    match res {
        Ok(out) if cmd_ok(&out) => {}
        Ok(out) => debug!(
            target: "tivohome::notice",
            "{}",
            ShimError::PermissionDenied(format!(
                "cmd notification post: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ))
        ),
        Err(e) => debug!(target: "tivohome::notice", "Status notification failed: {:#}", e),
    }
}
