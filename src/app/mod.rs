//! Application controller: one user session from welcome to chat.

pub mod action;
pub mod controller;
pub mod view;

pub use action::{ActionOutcome, UserAction};
pub use controller::AppController;
pub use view::{MessageView, Screen, ViewState};
