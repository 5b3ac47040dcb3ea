//! User actions the controller accepts, and what they produce.

use crate::chat::Message;
use crate::error::SubmitError;
use crate::profile::Answer;
use crate::stage::Stage;

/// A UI event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Leave the welcome screen.
    Start,
    SetName(String),
    SelectAnswer { question_id: String, answer: Answer },
    /// Next question; finishing the last one moves on to the summary.
    Next,
    /// Previous question, or previous stage at the first question.
    Back,
    /// Accept the summary and start chatting.
    ConfirmProfile,
    SendMessage(String),
    NewConversation,
    /// Throw away the conversation and the profile and restart onboarding.
    EditProfile,
    ExportHistory,
    GoTo(Stage),
    /// Back to the welcome screen with a blank profile.
    Restart,
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::SetName(_) => "set_name",
            Self::SelectAnswer { .. } => "select_answer",
            Self::Next => "next",
            Self::Back => "back",
            Self::ConfirmProfile => "confirm_profile",
            Self::SendMessage(_) => "send_message",
            Self::NewConversation => "new_conversation",
            Self::EditProfile => "edit_profile",
            Self::ExportHistory => "export_history",
            Self::GoTo(_) => "go_to",
            Self::Restart => "restart",
        }
    }
}

/// Result of an accepted action.
#[derive(Debug)]
pub enum ActionOutcome {
    /// State changed; redraw from [`super::AppController::view`].
    Updated,
    /// The assistant answered.
    Reply(Message),
    /// The message was sent but failed; a system notice is in the transcript
    /// unless the submission was refused outright.
    ChatFailed(SubmitError),
    /// Transcript export.
    Exported(String),
}
