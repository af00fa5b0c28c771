//! On-screen UI automation: snapshot the view hierarchy, search it for a
//! keyword match, click the nearest clickable ancestor.

mod search;
mod snapshot;

pub use search::find_clickable;
pub use snapshot::{Bounds, UiNodeData, UiSnapshot, UiTree, parse_hierarchy};

use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use crate::error::ShimError;
use anyhow::Result;
use tracing::{debug, info};

/// Snapshot the current screen and click the first clickable node whose
/// text or description matches one of `keywords`. Returns whether a click
/// was dispatched; a miss is a normal outcome, not an error.
pub async fn click_first_match(keywords: &[&str]) -> Result<bool> {
    let snapshot = UiSnapshot::acquire().await?;

    let Some(id) = find_clickable(&snapshot.tree, keywords) else {
        debug!(
            target: "tivohome::ui",
            "{}",
            ShimError::TransientUiMiss(keywords.join(", "))
        );
        return Ok(false);
    };

    let node = snapshot.tree.node(id);
    let (x, y) = node.bounds.center();
    info!(
        target: "tivohome::ui",
        "Clicking {} at ({}, {}) for [{}]",
        node.class,
        x,
        y,
        keywords.join(", ")
    );
    tap(x, y).await
}

async fn tap(x: i32, y: i32) -> Result<bool> {
    let xs = x.to_string();
    let ys = y.to_string();
    let out = run_cmd_timeout_async("/system/bin/input", &["tap", &xs, &ys], 3000).await?;
    Ok(cmd_ok(&out))
}
