//! Stage machine: which phase of the user journey is active.
//!
//! A session walks Welcome → Onboarding → Summary → Chatting. The machine
//! keeps a bounded back-history and notifies subscribers synchronously on
//! every successful transition.

pub mod machine;
pub mod state;

pub use machine::{DEFAULT_HISTORY_LIMIT, StageListener, StageMachine, Subscription};
pub use state::{Stage, StageChange};
