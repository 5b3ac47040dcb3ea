//! ProfileCollector: walks the question catalogue and records answers.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::model::{Answer, Profile};
use super::question::{Question, QuestionSet};
use crate::error::ProfileError;

/// Returned by the text renderings while the profile is incomplete.
pub const PROFILE_NOT_COMPLETED: &str = "Profile not completed.";

/// Onboarding progress snapshot for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current_index: usize,
    pub total: usize,
    /// `round(100 * current_index / total)`.
    pub percent: u32,
    pub can_go_back: bool,
    /// The question under the cursor has an answer.
    pub can_go_next: bool,
}

/// Walks an ordered question list, validating and recording answers into a
/// [`Profile`].
#[derive(Debug, Clone)]
pub struct ProfileCollector {
    questions: Arc<QuestionSet>,
    profile: Profile,
    cursor: usize,
}

impl ProfileCollector {
    pub fn new(questions: Arc<QuestionSet>) -> Self {
        Self {
            questions,
            profile: Profile::default(),
            cursor: 0,
        }
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The question under the cursor, or `None` once past the last one.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.at(self.cursor)
    }

    /// Move to the next question.
    ///
    /// At (or past) the last question this finishes onboarding instead: the
    /// cursor moves past the end, the completion time is stamped, and `None`
    /// is returned.
    pub fn advance(&mut self) -> Option<&Question> {
        let total = self.questions.len();
        if self.cursor + 1 < total {
            self.cursor += 1;
            debug!(cursor = self.cursor, "Onboarding cursor advanced");
            return self.current_question();
        }

        self.cursor = total;
        self.profile.mark_completed();
        info!(
            complete = self.profile.is_complete(),
            "Onboarding questions finished"
        );
        None
    }

    /// Move back one question. Does nothing at the first question.
    pub fn retreat(&mut self) -> Option<&Question> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor >= self.questions.len() {
            self.profile.clear_completed();
        }
        self.cursor -= 1;
        debug!(cursor = self.cursor, "Onboarding cursor retreated");
        self.current_question()
    }

    /// Validate `answer` against the question and store it, replacing any
    /// earlier answer.
    pub fn record_answer(&mut self, question_id: &str, answer: Answer) -> Result<(), ProfileError> {
        let question = self
            .questions
            .get(question_id)
            .ok_or_else(|| ProfileError::UnknownQuestion(question_id.to_string()))?;

        let normalized = question.validate(answer).inspect_err(|e| {
            warn!(question_id, error = %e, "Rejected onboarding answer");
        })?;

        debug!(question_id, answer = %normalized, "Answer recorded");
        self.profile.set_answer(question_id, normalized);
        Ok(())
    }

    /// Drop the stored answer for `question_id`. Returns whether one existed.
    pub fn clear_answer(&mut self, question_id: &str) -> bool {
        self.profile.remove_answer(question_id)
    }

    /// Set the free-text name. Blank input clears it.
    pub fn set_name(&mut self, name: &str) {
        self.profile.name = name.trim().to_string();
    }

    pub fn is_complete(&self) -> bool {
        self.profile.is_complete()
    }

    pub fn progress(&self) -> Progress {
        let total = self.questions.len();
        let percent = if total == 0 {
            100
        } else {
            ((100 * self.cursor) as f64 / total as f64).round() as u32
        };
        Progress {
            current_index: self.cursor,
            total,
            percent,
            can_go_back: self.cursor > 0,
            can_go_next: self
                .current_question()
                .is_some_and(|q| self.profile.has_answer(&q.id)),
        }
    }

    /// Human-readable profile summary for the summary screen.
    pub fn summary_text(&self) -> String {
        if !self.is_complete() {
            return PROFILE_NOT_COMPLETED.to_string();
        }

        let mut lines = Vec::new();
        if !self.profile.name.is_empty() {
            lines.push(format!("Name: {}", self.profile.name));
        }
        for question in self.questions.iter() {
            if let Some(answer) = self.profile.answer(&question.id) {
                lines.push(format!("{}: {}", question.display_label(), answer));
            }
        }
        lines.join("\n")
    }

    /// Profile rendering for inclusion in a language-model prompt.
    pub fn context_text(&self) -> String {
        if !self.is_complete() {
            return PROFILE_NOT_COMPLETED.to_string();
        }

        let mut parts = vec!["User fitness profile:".to_string()];
        if !self.profile.name.is_empty() {
            parts.push(format!("- Name: {}", self.profile.name));
        }
        for question in self.questions.iter() {
            if let Some(answer) = self.profile.answer(&question.id) {
                parts.push(format!("- {}: {}", question.display_label(), answer));
            }
        }
        parts.join("\n")
    }

    /// Clear every answer, the name, and the completion stamp, and rewind to
    /// the first question.
    pub fn reset(&mut self) {
        self.profile = Profile::default();
        self.cursor = 0;
        info!("Profile reset");
    }
}
