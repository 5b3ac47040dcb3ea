//! Onboarding question catalogue.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::Answer;
use crate::error::{ConfigError, ProfileError};

/// Identifiers of the questions every catalogue must contain.
pub mod question_ids {
    pub const GOALS: &str = "goals";
    pub const LEVEL: &str = "level";
    pub const EQUIPMENT: &str = "equipment";
    pub const TIME: &str = "time";

    /// Fields that must be answered for a profile to count as complete.
    pub const REQUIRED: [&str; 4] = [GOALS, LEVEL, EQUIPMENT, TIME];
}

/// How many options a question accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleSelect,
    MultiSelect,
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleSelect => write!(f, "single-select"),
            Self::MultiSelect => write!(f, "multi-select"),
        }
    }
}

/// A single onboarding question. Immutable once the catalogue is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    /// Short label used when the answer is rendered back ("Fitness level").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub options: Vec<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        kind: QuestionKind,
        prompt: impl Into<String>,
        options: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            prompt: prompt.into(),
            label: None,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label if set, otherwise the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }

    /// Check `answer` against this question and return its normalized form.
    ///
    /// Single answers are trimmed. Multi answers are de-duplicated and put in
    /// catalogue option order.
    pub fn validate(&self, answer: Answer) -> Result<Answer, ProfileError> {
        if answer.is_empty() {
            return Err(ProfileError::EmptyAnswer {
                question_id: self.id.clone(),
            });
        }

        match (self.kind, answer) {
            (QuestionKind::SingleSelect, Answer::Single(value)) => {
                let value = value.trim();
                if self.has_option(value) {
                    Ok(Answer::Single(value.to_string()))
                } else {
                    Err(ProfileError::InvalidOption {
                        question_id: self.id.clone(),
                        value: value.to_string(),
                    })
                }
            }
            (QuestionKind::MultiSelect, Answer::Multi(values)) => {
                let chosen: Vec<&str> = values
                    .iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .collect();

                let mut invalid: Vec<String> = Vec::new();
                for value in &chosen {
                    if !self.has_option(value) && !invalid.iter().any(|i| i == value) {
                        invalid.push(value.to_string());
                    }
                }
                if !invalid.is_empty() {
                    return Err(ProfileError::InvalidOptions {
                        question_id: self.id.clone(),
                        invalid,
                    });
                }

                Ok(Answer::Multi(
                    self.options
                        .iter()
                        .filter(|o| chosen.contains(&o.as_str()))
                        .cloned()
                        .collect(),
                ))
            }
            (kind, _) => Err(ProfileError::WrongKind {
                question_id: self.id.clone(),
                expected: match kind {
                    QuestionKind::SingleSelect => "single-select",
                    QuestionKind::MultiSelect => "multi-select",
                },
            }),
        }
    }
}

/// Ordered, validated question catalogue shared read-only by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Build a catalogue, rejecting duplicate ids, option-less questions, and
    /// catalogues missing a required question.
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for q in &questions {
            if q.id.trim().is_empty() {
                return Err(ConfigError::InvalidQuestions(
                    "question with empty id".to_string(),
                ));
            }
            if !seen.insert(q.id.as_str()) {
                return Err(ConfigError::InvalidQuestions(format!(
                    "duplicate question id: {}",
                    q.id
                )));
            }
            if q.options.is_empty() {
                return Err(ConfigError::InvalidQuestions(format!(
                    "question {} has no options",
                    q.id
                )));
            }
        }
        for required in question_ids::REQUIRED {
            if !seen.contains(required) {
                return Err(ConfigError::InvalidQuestions(format!(
                    "missing required question: {required}"
                )));
            }
        }
        Ok(Self { questions })
    }

    /// Parse a JSON array of questions.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let questions: Vec<Question> =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidQuestions(e.to_string()))?;
        Self::new(questions)
    }

    /// Load a JSON question file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let questions: Vec<Question> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::QuestionFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::new(questions)
    }

    /// The built-in fitness onboarding questions.
    pub fn fitness() -> Self {
        use question_ids::*;
        Self {
            questions: vec![
                Question::new(
                    GOALS,
                    QuestionKind::MultiSelect,
                    "What are your main fitness goals?",
                    &[
                        "Build muscle",
                        "Lose weight",
                        "Improve endurance",
                        "Increase flexibility",
                        "General health",
                    ],
                )
                .with_label("Goals"),
                Question::new(
                    LEVEL,
                    QuestionKind::SingleSelect,
                    "How would you describe your current fitness level?",
                    &["Beginner", "Intermediate", "Advanced"],
                )
                .with_label("Fitness level"),
                Question::new(
                    EQUIPMENT,
                    QuestionKind::MultiSelect,
                    "What equipment do you have access to?",
                    &[
                        "No equipment",
                        "Dumbbells",
                        "Resistance bands",
                        "Kettlebells",
                        "Pull-up bar",
                        "Full gym",
                    ],
                )
                .with_label("Equipment"),
                Question::new(
                    TIME,
                    QuestionKind::SingleSelect,
                    "How much time can you spend per workout?",
                    &["15-30 minutes", "30-45 minutes", "45-60 minutes", "60+ minutes"],
                )
                .with_label("Time per workout"),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for QuestionSet {
    fn default() -> Self {
        Self::fitness()
    }
}
