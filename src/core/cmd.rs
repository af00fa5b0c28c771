use crate::error::ShimError;
use anyhow::{Context, Result};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Run `program args...` with a hard timeout. A timeout surfaces as
/// `ShimError::Timeout` so callers can fail the one item and move on.
pub async fn run_cmd_timeout_async(
    program: &str,
    args: &[&str],
    timeout_ms: u64,
) -> Result<Output> {
    let fut = Command::new(program).args(args).output();
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Err(_) => Err(ShimError::Timeout(timeout_ms))
            .with_context(|| format!("{} {}", program, args.join(" "))),
        Ok(res) => res.with_context(|| format!("Failed to execute: {}", program)),
    }
}

/// `status.success()` plus an output scan: `am` and `pm` report many
/// failures through an `Error:`/`Failure` line while still exiting 0.
pub fn cmd_ok(out: &Output) -> bool {
    if !out.status.success() {
        return false;
    }
    !(contains(&out.stdout, b"Error") || contains(&out.stdout, b"Failure")
        || contains(&out.stderr, b"Error"))
}

#[inline]
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memchr::memmem::find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn out(code: i32, stdout: &str) -> Output {
        Output {
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
        }
    }

    #[test]
    fn zero_exit_with_error_line_is_not_ok() {
        assert!(cmd_ok(&out(0, "Starting: Intent { }")));
        assert!(!cmd_ok(&out(0, "Error: Activity not started, unable to resolve Intent")));
        assert!(!cmd_ok(&out(1, "")));
        assert!(!cmd_ok(&out(0, "Failure [DELETE_FAILED_INTERNAL_ERROR]")));
    }
}
