use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("unknown question type: {0}")]
    UnknownKind(String),

    #[error("multiple choice question {0} has no options")]
    MissingOptions(QuestionId),
}

/// How a question is answered, which also decides answer normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    MultipleChoice,
    ShortAnswer,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionKind::ShortAnswer => "SHORT_ANSWER",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MULTIPLE_CHOICE" => Ok(Self::MultipleChoice),
            "SHORT_ANSWER" => Ok(Self::ShortAnswer),
            other => Err(QuizError::UnknownKind(other.to_owned())),
        }
    }
}

/// A quiz question attached to a lesson. Immutable while scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub kind: QuestionKind,
    pub prompt: String,
    /// Ordered choices; only present for multiple choice.
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// # Errors
    ///
    /// Returns `QuizError::MissingOptions` for a multiple choice question without options.
    pub fn new(
        id: QuestionId,
        lesson_id: LessonId,
        kind: QuestionKind,
        prompt: impl Into<String>,
        options: Option<Vec<String>>,
        answer: impl Into<String>,
        explanation: Option<String>,
    ) -> Result<Self, QuizError> {
        let options = match kind {
            QuestionKind::MultipleChoice => match options {
                Some(opts) if !opts.is_empty() => Some(opts),
                _ => return Err(QuizError::MissingOptions(id)),
            },
            QuestionKind::ShortAnswer => None,
        };
        Ok(Self {
            id,
            lesson_id,
            kind,
            prompt: prompt.into(),
            options,
            answer: answer.into(),
            explanation,
        })
    }

    /// The learner-facing shape: everything except the answer and explanation.
    #[must_use]
    pub fn view(&self) -> QuizQuestionView {
        QuizQuestionView {
            id: self.id.clone(),
            kind: self.kind,
            prompt: self.prompt.clone(),
            options: self.options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionView {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Option<Vec<String>>,
}

/// Append-only history entry for a scored quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub score: u32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_names() {
        assert_eq!(
            "SHORT_ANSWER".parse::<QuestionKind>().unwrap(),
            QuestionKind::ShortAnswer
        );
        assert_eq!(QuestionKind::MultipleChoice.to_string(), "MULTIPLE_CHOICE");
        assert!("ESSAY".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn multiple_choice_requires_options() {
        let err = QuizQuestion::new(
            QuestionId::new("q1"),
            LessonId::new("l1"),
            QuestionKind::MultipleChoice,
            "Pick one",
            Some(vec![]),
            "A",
            None,
        )
        .unwrap_err();
        assert_eq!(err, QuizError::MissingOptions(QuestionId::new("q1")));
    }

    #[test]
    fn short_answer_drops_options_and_view_hides_answer() {
        let q = QuizQuestion::new(
            QuestionId::new("q2"),
            LessonId::new("l1"),
            QuestionKind::ShortAnswer,
            "2 + 2?",
            Some(vec!["ignored".into()]),
            "4",
            None,
        )
        .unwrap();
        assert_eq!(q.options, None);
        let view = q.view();
        assert_eq!(view.prompt, "2 + 2?");
        assert_eq!(view.kind, QuestionKind::ShortAnswer);
    }
}
