//! Onboarding profile: the question catalogue and the answers collected
//! against it.

pub mod collector;
pub mod model;
pub mod question;

pub use collector::{PROFILE_NOT_COMPLETED, ProfileCollector, Progress};
pub use model::{Answer, Profile, ProfileContext};
pub use question::{Question, QuestionKind, QuestionSet, question_ids};
