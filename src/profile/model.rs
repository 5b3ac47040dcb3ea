//! Profile data model: answers keyed by question id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question::question_ids;

/// An answer in the shape its question kind requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Single(String),
    Multi(Vec<String>),
}

impl Answer {
    pub fn single(value: impl Into<String>) -> Self {
        Self::Single(value.into())
    }

    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multi(values.into_iter().map(Into::into).collect())
    }

    /// Blank strings and sets with no non-blank member count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(v) => v.trim().is_empty(),
            Self::Multi(vs) => vs.iter().all(|v| v.trim().is_empty()),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(v) => vec![v.as_str()],
            Self::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.values().join(", "))
    }
}

/// The user's fitness profile, built up during onboarding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    answers: BTreeMap<String, Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    /// Whether a non-empty answer is stored for `question_id`.
    pub fn has_answer(&self, question_id: &str) -> bool {
        self.answer(question_id).is_some_and(|a| !a.is_empty())
    }

    /// Every required field holds a non-empty answer. Recomputed each call.
    pub fn is_complete(&self) -> bool {
        question_ids::REQUIRED.iter().all(|id| self.has_answer(id))
    }

    /// When onboarding was finished, if it was.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn goals(&self) -> Vec<&str> {
        self.values_of(question_ids::GOALS)
    }

    pub fn level(&self) -> Option<&str> {
        self.values_of(question_ids::LEVEL).first().copied()
    }

    pub fn equipment(&self) -> Vec<&str> {
        self.values_of(question_ids::EQUIPMENT)
    }

    pub fn time(&self) -> Option<&str> {
        self.values_of(question_ids::TIME).first().copied()
    }

    /// The record sent to the answering service with every chat request.
    pub fn context(&self) -> ProfileContext {
        ProfileContext {
            name: (!self.name.is_empty()).then(|| self.name.clone()),
            goals: self.goals().into_iter().map(String::from).collect(),
            level: self.level().map(String::from),
            equipment: self.equipment().into_iter().map(String::from).collect(),
            time: self.time().map(String::from),
        }
    }

    fn values_of(&self, question_id: &str) -> Vec<&str> {
        self.answer(question_id).map(Answer::values).unwrap_or_default()
    }

    pub(crate) fn set_answer(&mut self, question_id: &str, answer: Answer) {
        self.answers.insert(question_id.to_string(), answer);
    }

    pub(crate) fn remove_answer(&mut self, question_id: &str) -> bool {
        self.answers.remove(question_id).is_some()
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed_at.get_or_insert_with(Utc::now);
    }

    pub(crate) fn clear_completed(&mut self) {
        self.completed_at = None;
    }
}

/// Profile fields the answering service uses to personalise replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}
