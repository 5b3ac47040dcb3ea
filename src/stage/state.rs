//! The stages of the user journey.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// One phase of the user journey.
///
/// Progresses linearly: Welcome → Onboarding → Summary → Chatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Welcome,
    Onboarding,
    Summary,
    Chatting,
}

impl Stage {
    /// All stages in canonical order.
    pub const ALL: [Stage; 4] = [
        Stage::Welcome,
        Stage::Onboarding,
        Stage::Summary,
        Stage::Chatting,
    ];

    /// Position in the canonical order.
    pub fn index(&self) -> usize {
        match self {
            Self::Welcome => 0,
            Self::Onboarding => 1,
            Self::Summary => 2,
            Self::Chatting => 3,
        }
    }

    /// Get the next stage in the forward progression, if any.
    pub fn next(&self) -> Option<Stage> {
        use Stage::*;
        match self {
            Welcome => Some(Onboarding),
            Onboarding => Some(Summary),
            Summary => Some(Chatting),
            Chatting => None,
        }
    }

    /// Whether forward advancement stops here.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Chatting)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::Welcome
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Onboarding => "onboarding",
            Self::Summary => "summary",
            Self::Chatting => "chatting",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Stage {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "welcome" => Ok(Self::Welcome),
            "onboarding" => Ok(Self::Onboarding),
            "summary" => Ok(Self::Summary),
            "chatting" | "chat" => Ok(Self::Chatting),
            _ => Err(StageError::UnknownStage(s.to_string())),
        }
    }
}

/// A completed transition, delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageChange {
    /// The stage that is now current.
    pub to: Stage,
    /// The stage that was current before the transition.
    pub from: Stage,
}
