use crate::core::cmd::run_cmd_timeout_async;
use crate::error::ShimError;
use anyhow::Result;
use async_trait::async_trait;
use memchr::{memchr, memmem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEventKind {
    MovedToForeground,
    Other,
}

/// One foreground-transition record from the usage-event source.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub ts_ms: i64,
    pub package: String,
    pub kind: UsageEventKind,
}

/// Contract of the OS usage-event facility: transitions observed inside
/// `[start_ms, end_ms]`, in no particular order.
#[async_trait]
pub trait UsageEventSource {
    async fn query(&mut self, start_ms: i64, end_ms: i64) -> Result<Vec<UsageEvent>>;
}

/// Production source. The resumed activity reported by the activity manager
/// is by definition the newest moved-to-foreground transition, so a query
/// yields at most one event, stamped at the end of the window.
pub struct ResumedActivitySource;

#[async_trait]
impl UsageEventSource for ResumedActivitySource {
    async fn query(&mut self, _start_ms: i64, end_ms: i64) -> Result<Vec<UsageEvent>> {
        let out = match run_cmd_timeout_async(
            "/system/bin/dumpsys",
            &["activity", "activities"],
            1500,
        )
        .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::debug!(target: "tivohome::dumpsys", "dumpsys activity failed: {:#}", e);
                return Ok(Vec::new());
            }
        };

        Ok(parse_resumed_package(&out.stdout)?
            .map(|package| {
                vec![UsageEvent {
                    ts_ms: end_ms,
                    package,
                    kind: UsageEventKind::MovedToForeground,
                }]
            })
            .unwrap_or_default())
    }
}

/// Pull the package out of the first `ResumedActivity` record. Lines look
/// like `mResumedActivity: ActivityRecord{297ce77 u0 com.tivo.stream/.MainActivity t52}`.
pub fn parse_resumed_package(data: &[u8]) -> Result<Option<String>> {
    if memmem::find(data, b"Permission Denial").is_some() {
        return Err(ShimError::PermissionDenied("dumpsys activity".into()).into());
    }

    let finder = memmem::Finder::new(b"ResumedActivity");
    let mut pos = 0;

    while let Some(offset) = finder.find(&data[pos..]) {
        pos += offset;

        let line_start = data[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |p| p + 1);
        let line_end = memchr(b'\n', &data[pos..]).map_or(data.len(), |p| pos + p);

        if let Some(pkg) = package_from_record_line(&data[line_start..line_end]) {
            return Ok(Some(pkg));
        }
        if line_end >= data.len() {
            break;
        }
        pos = line_end + 1;
    }
    Ok(None)
}

/// `... u0 <package>/<activity> ...` — the package is the run between
/// `u0 ` and the component slash, and always contains a dot.
fn package_from_record_line(line: &[u8]) -> Option<String> {
    let u0 = memmem::find(line, b"u0 ")? + 3;
    let rest = &line[u0..];
    let slash = memchr(b'/', rest)?;
    let pkg = &rest[..slash];
    if memchr(b'.', pkg).is_some() && !pkg.contains(&b' ') {
        Some(String::from_utf8_lossy(pkg).trim().to_string())
    } else {
        None
    }
}
