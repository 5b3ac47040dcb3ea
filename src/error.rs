//! Error types for fitchat.

use std::time::Duration;

use crate::stage::Stage;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse question file {path}: {reason}")]
    QuestionFile { path: String, reason: String },

    #[error("Invalid question set: {0}")]
    InvalidQuestions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stage machine navigation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("A stage transition is already in progress")]
    TransitionInProgress,

    #[error("No previous stage to go back to")]
    NoHistory,

    #[error("Stage {0} has no next stage")]
    NoSuccessor(Stage),
}

/// Answer validation failures raised by the profile collector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Unknown question: {0}")]
    UnknownQuestion(String),

    #[error("Answer for {question_id} must not be empty")]
    EmptyAnswer { question_id: String },

    #[error("Question {question_id} expects a {expected} answer")]
    WrongKind {
        question_id: String,
        expected: &'static str,
    },

    #[error("Invalid option for {question_id}: {value}")]
    InvalidOption { question_id: String, value: String },

    #[error("Invalid options for {question_id}: {}", invalid.join(", "))]
    InvalidOptions {
        question_id: String,
        invalid: Vec<String>,
    },
}

/// Failures reaching the answering collaborator at all.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Answering service crashed: {0}")]
    Crashed(String),
}

/// Outcome of a rejected or failed chat submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("A message is already being sent")]
    Busy,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("{error}")]
    Rejected {
        error: String,
        details: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Application controller failures (actions that make no sense in the
/// current stage).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Action {action} is not available in stage {stage}")]
    WrongStage { action: &'static str, stage: Stage },

    #[error("Stage {0} cannot be reached from here")]
    Unreachable(Stage),

    #[error("Onboarding is not finished: {0}")]
    Incomplete(String),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}
