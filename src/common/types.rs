use serde::{Deserialize, Serialize};

/// Sub-view of the Channels app a launch can open directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetView {
    Guide,
    DvrLibrary,
    Live,
}

impl TargetView {
    pub fn from_str_ignore_case(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guide" => Some(Self::Guide),
            "dvr_library" | "dvr-library" | "library" => Some(Self::DvrLibrary),
            "live" => Some(Self::Live),
            _ => None,
        }
    }

    /// Value of the `tab` extra the Channels main activity understands.
    /// `Live` opens through the player component instead and has no tab.
    pub fn tab_extra(&self) -> Option<&'static str> {
        match self {
            Self::Guide => Some("guide"),
            Self::DvrLibrary => Some("dvr_library"),
            Self::Live => None,
        }
    }
}

impl std::fmt::Display for TargetView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guide => write!(f, "guide"),
            Self::DvrLibrary => write!(f, "dvr_library"),
            Self::Live => write!(f, "live"),
        }
    }
}
