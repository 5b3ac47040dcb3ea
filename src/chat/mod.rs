//! Chat: the transcript and the manager that relays it to an answering
//! service.

pub mod answering;
pub mod format;
pub mod http;
pub mod manager;
pub mod message;

pub use answering::{AnsweringService, AskRequest, AskResponse, TokenUsage};
pub use format::renderable_text;
pub use http::HttpAnswering;
pub use manager::{ConversationManager, NO_HISTORY, TRANSPORT_FAILURE_MESSAGE, greeting};
pub use message::{ContextMessage, Message, MessageIds, Role, Transcript};
