//! UI state snapshots rebuilt from the components on every change.

use serde::Serialize;

use crate::chat::{Message, Role, renderable_text};
use crate::profile::{Progress, Question};
use crate::stage::Stage;

/// Everything a front end needs to draw the current screen.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub stage: Stage,
    /// Stages the navigation controls may offer.
    pub navigable: Vec<Stage>,
    pub screen: Screen,
}

/// Per-stage screen content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    Welcome {
        name: String,
    },
    Onboarding {
        question: Option<Question>,
        /// Options already chosen for `question`.
        selected: Vec<String>,
        progress: Progress,
    },
    Summary {
        summary: String,
        complete: bool,
    },
    Chatting {
        messages: Vec<MessageView>,
        busy: bool,
    },
}

/// A transcript entry ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: u64,
    pub role: Role,
    /// Assistant replies go through [`renderable_text`]; everything else is
    /// shown as typed.
    pub html: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        let html = match m.role {
            Role::Assistant => renderable_text(&m.content),
            Role::User | Role::System => m.content.clone(),
        };
        Self {
            id: m.id,
            role: m.role,
            html,
        }
    }
}
