use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use edu_core::Clock;
use edu_core::model::{LessonId, QuestionId, QuizAttempt, QuizQuestionView, UserId};
use edu_core::scoring::{QuizOutcome, score_quiz};
use storage::repository::{CatalogRepository, QuizAttemptRepository};

use crate::error::ServiceError;

/// A scored submission and whether it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(flatten)]
    pub outcome: QuizOutcome,
    pub saved: bool,
}

/// Serves quizzes and scores submissions.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    durable: bool,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
}

impl QuizService {
    /// `durable` is false when only the demo catalog is available; submissions
    /// are then refused outright.
    #[must_use]
    pub fn new(
        clock: Clock,
        durable: bool,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        Self {
            clock,
            durable,
            catalog,
            attempts,
        }
    }

    async fn ensure_published(&self, lesson_id: &LessonId) -> Result<(), ServiceError> {
        match self.catalog.get_lesson(lesson_id).await? {
            Some(lesson) if lesson.is_published => Ok(()),
            _ => Err(ServiceError::NotFound("lesson")),
        }
    }

    /// Questions of a published lesson without answers.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the lesson is missing or unpublished.
    pub async fn questions(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Vec<QuizQuestionView>, ServiceError> {
        self.ensure_published(lesson_id).await?;
        let questions = self.catalog.list_questions(lesson_id).await?;
        Ok(questions.iter().map(|q| q.view()).collect())
    }

    /// Score `answers` against the lesson's questions.
    ///
    /// A signed-in caller gets an attempt appended; an anonymous caller gets
    /// the same scoring with nothing stored.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` without a database,
    /// `ServiceError::NotFound` for a missing or unpublished lesson, or
    /// `ServiceError::InvalidInput` if the lesson has no questions.
    pub async fn submit(
        &self,
        user_id: Option<&UserId>,
        lesson_id: &LessonId,
        answers: &HashMap<QuestionId, String>,
    ) -> Result<QuizSubmission, ServiceError> {
        if !self.durable {
            return Err(ServiceError::NotConfigured);
        }
        self.ensure_published(lesson_id).await?;

        let questions = self.catalog.list_questions(lesson_id).await?;
        let outcome = score_quiz(&questions, answers)?;

        let Some(user_id) = user_id else {
            return Ok(QuizSubmission {
                outcome,
                saved: false,
            });
        };

        self.attempts
            .record_quiz_attempt(&QuizAttempt {
                user_id: user_id.clone(),
                lesson_id: lesson_id.clone(),
                score: outcome.score,
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(
            user = %user_id,
            lesson = %lesson_id,
            score = outcome.score,
            total = outcome.total,
            "quiz attempt saved"
        );

        Ok(QuizSubmission {
            outcome,
            saved: true,
        })
    }
}
