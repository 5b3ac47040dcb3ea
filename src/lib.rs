//! Fitchat: guided fitness onboarding followed by a coaching chat.

pub mod app;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod profile;
pub mod stage;

mod sync;
