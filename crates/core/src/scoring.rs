use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, QuestionKind, QuizQuestion};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("there are no questions to score")]
    NoQuestions,
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

/// Free-text answer form: lower-cased, apostrophes dropped, every other run
/// of non-alphanumeric characters collapsed to one space, trimmed.
///
/// ```
/// # use edu_core::scoring::normalize_short_answer;
/// assert_eq!(normalize_short_answer("  It's   4!! "), "its 4");
/// ```
#[must_use]
pub fn normalize_short_answer(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        if matches!(ch, '\'' | '\u{2019}') {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Fixed-choice answer form: trimmed and lower-cased, punctuation kept.
#[must_use]
pub fn normalize_choice(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Whether a picked choice matches the canonical answer.
#[must_use]
pub fn is_choice_correct(choice: &str, answer: &str) -> bool {
    normalize_choice(choice) == normalize_choice(answer)
}

/// Whether a submitted answer is correct for `question`. Blank answers never are.
#[must_use]
pub fn is_answer_correct(question: &QuizQuestion, given: Option<&str>) -> bool {
    let Some(given) = given.filter(|g| !g.trim().is_empty()) else {
        return false;
    };
    match question.kind {
        QuestionKind::MultipleChoice => is_choice_correct(given, &question.answer),
        QuestionKind::ShortAnswer => {
            normalize_short_answer(given) == normalize_short_answer(&question.answer)
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Per-question results in question order plus the aggregate score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: u32,
    pub total: u32,
    pub results: Vec<QuestionResult>,
}

/// Score a submission against a lesson's questions.
///
/// Questions without an answer are incorrect; answers for unknown
/// questions are ignored.
///
/// # Errors
///
/// Returns `ScoringError::NoQuestions` when `questions` is empty.
pub fn score_quiz(
    questions: &[QuizQuestion],
    answers: &HashMap<QuestionId, String>,
) -> Result<QuizOutcome, ScoringError> {
    if questions.is_empty() {
        return Err(ScoringError::NoQuestions);
    }

    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| QuestionResult {
            question_id: q.id.clone(),
            correct: is_answer_correct(q, answers.get(&q.id).map(String::as_str)),
            correct_answer: q.answer.clone(),
            explanation: q.explanation.clone(),
        })
        .collect();

    let score = u32::try_from(results.iter().filter(|r| r.correct).count()).unwrap_or(u32::MAX);
    let total = u32::try_from(results.len()).unwrap_or(u32::MAX);
    Ok(QuizOutcome {
        score,
        total,
        results,
    })
}

//
// ─── BEST RECORD ───────────────────────────────────────────────────────────────
//

/// Best playthrough of a game: most correct answers, then fastest total time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestRecord {
    pub best_score: u32,
    pub best_time_ms: u64,
}

impl BestRecord {
    #[must_use]
    pub fn new(best_score: u32, best_time_ms: u64) -> Self {
        Self {
            best_score,
            best_time_ms,
        }
    }

    /// Whether this result should replace `stored`.
    ///
    /// Anything beats an empty slot. Otherwise a higher score wins, and an
    /// equal score wins only with a measured (non-zero) faster time.
    #[must_use]
    pub fn improves_on(&self, stored: Option<&BestRecord>) -> bool {
        let Some(stored) = stored else {
            return true;
        };
        self.best_score > stored.best_score
            || (self.best_score == stored.best_score
                && self.best_time_ms > 0
                && self.best_time_ms < stored.best_time_ms)
    }

    /// The record to keep after observing `self`, and whether it replaced `stored`.
    #[must_use]
    pub fn reconcile(self, stored: Option<BestRecord>) -> (BestRecord, bool) {
        match stored {
            Some(prev) if !self.improves_on(Some(&prev)) => (prev, false),
            _ => (self, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LessonId;

    fn question(id: &str, kind: QuestionKind, answer: &str) -> QuizQuestion {
        let options = match kind {
            QuestionKind::MultipleChoice => Some(vec!["Triangle".into(), answer.into()]),
            QuestionKind::ShortAnswer => None,
        };
        QuizQuestion::new(
            QuestionId::new(id),
            LessonId::new("lesson-logic-1"),
            kind,
            "prompt",
            options,
            answer,
            Some("because".into()),
        )
        .unwrap()
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<QuestionId, String> {
        pairs
            .iter()
            .map(|(q, a)| (QuestionId::new(*q), (*a).to_owned()))
            .collect()
    }

    #[test]
    fn short_answer_tolerates_punctuation_and_spacing() {
        let q = question("q1", QuestionKind::ShortAnswer, "its 4");
        assert!(is_answer_correct(&q, Some("  It's   4!! ")));
    }

    #[test]
    fn short_answer_has_no_synonyms() {
        let q = question("q1", QuestionKind::ShortAnswer, "four");
        assert!(!is_answer_correct(&q, Some("4")));
    }

    #[test]
    fn short_answer_normalization_collapses_runs() {
        assert_eq!(normalize_short_answer("Hello,   World--again"), "hello world again");
        assert_eq!(normalize_short_answer("?!"), "");
    }

    #[test]
    fn multiple_choice_ignores_case_and_outer_whitespace() {
        let q = question("q1", QuestionKind::MultipleChoice, " square ");
        assert!(is_answer_correct(&q, Some("Square")));
    }

    #[test]
    fn multiple_choice_keeps_punctuation() {
        assert!(!is_choice_correct("Square!", "square"));
        assert!(is_choice_correct("  SQUARE", "square"));
    }

    #[test]
    fn blank_or_missing_answers_are_wrong() {
        let q = question("q1", QuestionKind::ShortAnswer, "?");
        assert!(!is_answer_correct(&q, None));
        assert!(!is_answer_correct(&q, Some("   ")));
    }

    #[test]
    fn zero_questions_are_rejected() {
        let err = score_quiz(&[], &HashMap::new()).unwrap_err();
        assert_eq!(err, ScoringError::NoQuestions);
    }

    #[test]
    fn scores_in_question_order() {
        let questions = vec![
            question("q1", QuestionKind::MultipleChoice, "Square"),
            question("q2", QuestionKind::ShortAnswer, "its 4"),
            question("q3", QuestionKind::ShortAnswer, "four"),
        ];
        let outcome = score_quiz(
            &questions,
            &answers(&[("q1", "square"), ("q3", "4"), ("unknown", "x")]),
        )
        .unwrap();

        assert_eq!(outcome.score, 1);
        assert_eq!(outcome.total, 3);
        let correct: Vec<bool> = outcome.results.iter().map(|r| r.correct).collect();
        assert_eq!(correct, vec![true, false, false]);
        assert_eq!(outcome.results[2].correct_answer, "four");
        assert_eq!(outcome.results[0].explanation.as_deref(), Some("because"));
    }

    #[test]
    fn faster_time_at_same_score_replaces() {
        let stored = BestRecord::new(2, 5000);
        assert!(BestRecord::new(2, 4000).improves_on(Some(&stored)));
    }

    #[test]
    fn lower_score_never_replaces() {
        let stored = BestRecord::new(2, 5000);
        assert!(!BestRecord::new(1, 1).improves_on(Some(&stored)));
    }

    #[test]
    fn unmeasured_time_never_replaces() {
        let stored = BestRecord::new(2, 5000);
        assert!(!BestRecord::new(2, 0).improves_on(Some(&stored)));
    }

    #[test]
    fn higher_score_replaces_even_when_slower() {
        let stored = BestRecord::new(2, 5000);
        assert!(BestRecord::new(3, 90_000).improves_on(Some(&stored)));
    }

    #[test]
    fn empty_slot_accepts_anything() {
        assert!(BestRecord::new(0, 0).improves_on(None));
    }

    #[test]
    fn reconcile_keeps_the_better_record() {
        let stored = BestRecord::new(3, 4000);
        assert_eq!(
            BestRecord::new(3, 4500).reconcile(Some(stored)),
            (stored, false)
        );
        assert_eq!(
            BestRecord::new(3, 3500).reconcile(Some(stored)),
            (BestRecord::new(3, 3500), true)
        );
        assert_eq!(
            BestRecord::new(1, 10).reconcile(None),
            (BestRecord::new(1, 10), true)
        );
    }
}
