//! Key-event classifier. Decides, per raw key event, whether the event is
//! consumed and which side effect (if any) the daemon should run. Pure
//! apart from the pause-key debounce state; time comes in as a parameter.

use crate::common::types::TargetView;
use crate::core::input::{KeyCode, KeyEvent, KeyPhase, SCAN_PAUSE, SCAN_VENDOR_DVR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    GlobalBack,
    ClickPlayPause,
    /// Launch the Channels app; `None` is the plain entry point.
    Launch(Option<TargetView>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDecision {
    pub consumed: bool,
    pub action: Option<KeyAction>,
}

impl KeyDecision {
    const PASS: Self = Self {
        consumed: false,
        action: None,
    };
    const CONSUMED: Self = Self {
        consumed: true,
        action: None,
    };

    fn act(action: KeyAction) -> Self {
        Self {
            consumed: true,
            action: Some(action),
        }
    }
}

#[derive(Debug)]
pub struct KeyInterceptor {
    debounce_ms: i64,
    pause_pressed: bool,
    last_pause_emit_ms: i64,
}

impl KeyInterceptor {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms: debounce_ms as i64,
            pause_pressed: false,
            last_pause_emit_ms: 0,
        }
    }

    pub fn on_key(&mut self, ev: &KeyEvent, now_ms: i64) -> KeyDecision {
        // Escape maps to global Back on release; both edges are consumed.
        if ev.code == KeyCode::Escape {
            return match ev.phase {
                KeyPhase::Up => KeyDecision::act(KeyAction::GlobalBack),
                _ => KeyDecision::CONSUMED,
            };
        }

        // Pause/break clicks the on-screen control. The pressed latch plus
        // the emit window swallow key-repeat duplicates.
        if ev.code == KeyCode::PauseBreak || ev.scan_code == SCAN_PAUSE {
            return match ev.phase {
                KeyPhase::Up => {
                    self.pause_pressed = false;
                    KeyDecision::CONSUMED
                }
                KeyPhase::Down | KeyPhase::Repeat => {
                    if self.pause_pressed
                        || now_ms - self.last_pause_emit_ms < self.debounce_ms
                    {
                        KeyDecision::CONSUMED
                    } else {
                        self.pause_pressed = true;
                        self.last_pause_emit_ms = now_ms;
                        KeyDecision::act(KeyAction::ClickPlayPause)
                    }
                }
            };
        }

        // Launch shortcuts react to the initial press only.
        if ev.phase != KeyPhase::Down {
            return KeyDecision::PASS;
        }

        match ev.code {
            KeyCode::Tv => KeyDecision::act(KeyAction::Launch(Some(TargetView::Live))),
            KeyCode::Guide => KeyDecision::act(KeyAction::Launch(Some(TargetView::Guide))),
            KeyCode::Dvr => KeyDecision::act(KeyAction::Launch(Some(TargetView::DvrLibrary))),
            KeyCode::Home => KeyDecision::act(KeyAction::Launch(None)),
            KeyCode::Unknown if ev.scan_code == SCAN_VENDOR_DVR => {
                KeyDecision::act(KeyAction::Launch(Some(TargetView::DvrLibrary)))
            }
            _ => KeyDecision::PASS,
        }
    }
}
