//! Remote-control key events, decoded from the kernel input layer.
//!
//! `getevent -q` prints one line per event: `<device>: <type> <code>
//! <value>` in hex. Only EV_KEY events are forwarded; the scan code is the
//! kernel key code, which is what the TiVo remote's vendor keys are defined
//! in terms of.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const EV_KEY: u16 = 0x0001;

// Kernel scan codes emitted by the Stream 4K remote.
pub const SCAN_ESC: u16 = 1;
pub const SCAN_PAUSE: u16 = 119;
pub const SCAN_HOMEPAGE: u16 = 172;
pub const SCAN_VENDOR_DVR: u16 = 240;
pub const SCAN_EPG: u16 = 365;
pub const SCAN_PVR: u16 = 366;
pub const SCAN_TV: u16 = 377;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Escape,
    PauseBreak,
    Home,
    Tv,
    Guide,
    Dvr,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub scan_code: u16,
    pub phase: KeyPhase,
}

pub fn keycode_for_scan(scan: u16) -> KeyCode {
    match scan {
        SCAN_ESC => KeyCode::Escape,
        SCAN_PAUSE => KeyCode::PauseBreak,
        SCAN_HOMEPAGE => KeyCode::Home,
        SCAN_TV => KeyCode::Tv,
        SCAN_EPG => KeyCode::Guide,
        SCAN_PVR => KeyCode::Dvr,
        _ => KeyCode::Unknown,
    }
}

/// Parse one `getevent -q` line; anything that is not an EV_KEY
/// press/release/repeat yields None.
pub fn parse_getevent_line(line: &str) -> Option<KeyEvent> {
    let (_, rest) = line.split_once(": ")?;
    let mut fields = rest.split_ascii_whitespace();

    let etype = u16::from_str_radix(fields.next()?, 16).ok()?;
    let code = u16::from_str_radix(fields.next()?, 16).ok()?;
    let value = u32::from_str_radix(fields.next()?, 16).ok()?;

    if etype != EV_KEY {
        return None;
    }

    let phase = match value {
        0 => KeyPhase::Up,
        1 => KeyPhase::Down,
        2 => KeyPhase::Repeat,
        _ => return None,
    };

    Some(KeyEvent {
        code: keycode_for_scan(code),
        scan_code: code,
        phase,
    })
}

/// Spawn the getevent reader; decoded events arrive on the returned
/// channel. The child dies with the daemon (or when the receiver drops).
pub fn spawn_key_reader(device: Option<String>) -> Result<mpsc::Receiver<KeyEvent>> {
    let mut cmd = Command::new("/system/bin/getevent");
    cmd.arg("-q");
    if let Some(dev) = &device {
        cmd.arg(dev);
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::null()).kill_on_drop(true);

    let mut child = cmd.spawn().context("Failed to spawn getevent")?;
    let stdout = child
        .stdout
        .take()
        .context("getevent stdout unavailable")?;

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(ev) = parse_getevent_line(&line) {
                debug!(target: "tivohome::keys", "Key {:?} scan={} {:?}", ev.code, ev.scan_code, ev.phase);
                if tx.send(ev).await.is_err() {
                    break;
                }
            }
        }
        warn!(target: "tivohome::keys", "Key event stream ended");
        let _ = child.kill().await;
    });

    Ok(rx)
}
