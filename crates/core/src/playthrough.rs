use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{GameLevel, GameLevelId};
use crate::scoring::{BestRecord, is_choice_correct};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaythroughError {
    #[error("game has no levels")]
    NoLevels,

    #[error("level {0} is missing game data")]
    LevelNotPlayable(GameLevelId),

    #[error("level already answered")]
    AlreadyAnswered,

    #[error("no answer to move on from")]
    NotAnswered,

    #[error("playthrough is complete")]
    Complete,

    #[error("choice {index} is out of range (level has {available} choices)")]
    UnknownChoice { index: usize, available: usize },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Wrong,
}

/// What happened when a choice was made on a level.
///
/// `attempt_score` and `time_ms` are what gets logged as a per-level attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOutcome {
    pub level_id: GameLevelId,
    pub correct: bool,
    pub attempt_score: u32,
    pub time_ms: u64,
    pub correct_answer: String,
    pub complete: bool,
}

/// One run through a game's levels.
///
/// A level is answered once; a wrong answer may be retried or skipped. The
/// playthrough completes as soon as the last level has been answered, right
/// or wrong. Only correct answers add to the score and the total time.
#[derive(Debug, Clone)]
pub struct Playthrough {
    levels: Vec<GameLevel>,
    index: usize,
    score: u32,
    total_time_ms: u64,
    feedback: Option<Feedback>,
    level_started_at: DateTime<Utc>,
}

impl Playthrough {
    /// Start at the lowest-numbered level.
    #[must_use]
    pub fn new(mut levels: Vec<GameLevel>, now: DateTime<Utc>) -> Self {
        levels.sort_by_key(|l| l.level_number);
        Self {
            levels,
            index: 0,
            score: 0,
            total_time_ms: 0,
            feedback: None,
            level_started_at: now,
        }
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// 1-based position of the current level.
    #[must_use]
    pub fn position(&self) -> usize {
        self.index + 1
    }

    #[must_use]
    pub fn current_level(&self) -> Option<&GameLevel> {
        self.levels.get(self.index)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_time_ms(&self) -> u64 {
        self.total_time_ms
    }

    #[must_use]
    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    fn is_last_level(&self) -> bool {
        self.index + 1 >= self.levels.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.feedback.is_some() && self.is_last_level()
    }

    /// The result to offer the best-score sinks once complete.
    #[must_use]
    pub fn result(&self) -> Option<BestRecord> {
        self.is_complete()
            .then(|| BestRecord::new(self.score, self.total_time_ms))
    }

    /// Answer the current level with the choice at `index` (0-based).
    ///
    /// # Errors
    ///
    /// Fails when the game has no levels, the level is not playable, the level
    /// was already answered, or `index` is out of range.
    pub fn choose(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<ChoiceOutcome, PlaythroughError> {
        if self.is_complete() {
            return Err(PlaythroughError::Complete);
        }
        if self.feedback.is_some() {
            return Err(PlaythroughError::AlreadyAnswered);
        }
        let level = self.levels.get(self.index).ok_or(PlaythroughError::NoLevels)?;
        if !level.config.is_playable() {
            return Err(PlaythroughError::LevelNotPlayable(level.id.clone()));
        }
        let choice = level
            .config
            .choices
            .get(index)
            .ok_or(PlaythroughError::UnknownChoice {
                index,
                available: level.config.choices.len(),
            })?;

        let time_ms = u64::try_from((now - self.level_started_at).num_milliseconds()).unwrap_or(0);
        let correct = is_choice_correct(choice, &level.config.answer);
        let outcome = ChoiceOutcome {
            level_id: level.id.clone(),
            correct,
            attempt_score: u32::from(correct),
            time_ms,
            correct_answer: level.config.answer.clone(),
            complete: self.is_last_level(),
        };

        if correct {
            self.score += 1;
            self.total_time_ms += time_ms;
            self.feedback = Some(Feedback::Correct);
        } else {
            self.feedback = Some(Feedback::Wrong);
        }
        Ok(outcome)
    }

    /// Retry the current level after a wrong answer.
    ///
    /// # Errors
    ///
    /// Only valid after a wrong answer on a level that is not the last.
    pub fn try_again(&mut self, now: DateTime<Utc>) -> Result<(), PlaythroughError> {
        match self.feedback {
            _ if self.is_complete() => Err(PlaythroughError::Complete),
            Some(Feedback::Wrong) => {
                self.feedback = None;
                self.level_started_at = now;
                Ok(())
            }
            _ => Err(PlaythroughError::NotAnswered),
        }
    }

    /// Move to the next level once the current one has been answered.
    ///
    /// # Errors
    ///
    /// Fails when the current level is unanswered or the playthrough is complete.
    pub fn next_level(&mut self, now: DateTime<Utc>) -> Result<(), PlaythroughError> {
        if self.is_complete() {
            return Err(PlaythroughError::Complete);
        }
        if self.feedback.is_none() {
            return Err(PlaythroughError::NotAnswered);
        }
        self.index += 1;
        self.feedback = None;
        self.level_started_at = now;
        Ok(())
    }

    /// Start over from the first level.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.index = 0;
        self.score = 0;
        self.total_time_ms = 0;
        self.feedback = None;
        self.level_started_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameId, LevelConfig};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn level(n: u32, answer: &str) -> GameLevel {
        GameLevel {
            id: GameLevelId::new(format!("level-{n}")),
            game_id: GameId::new("game-logic-quest"),
            level_number: n,
            config: LevelConfig {
                prompt: format!("Level {n}"),
                choices: vec!["Triangle".into(), "Square".into(), "Circle".into()],
                answer: answer.into(),
            },
        }
    }

    fn ms(n: i64) -> DateTime<Utc> {
        fixed_now() + Duration::milliseconds(n)
    }

    #[test]
    fn levels_are_played_in_number_order() {
        let play = Playthrough::new(vec![level(2, "Square"), level(1, "Circle")], fixed_now());
        assert_eq!(play.current_level().unwrap().level_number, 1);
        assert_eq!(play.level_count(), 2);
    }

    #[test]
    fn correct_answers_add_score_and_time() {
        let mut play = Playthrough::new(vec![level(1, "Square"), level(2, "Square")], ms(0));

        let first = play.choose(1, ms(1200)).unwrap();
        assert!(first.correct);
        assert_eq!(first.attempt_score, 1);
        assert_eq!(first.time_ms, 1200);
        assert!(!first.complete);

        play.next_level(ms(2000)).unwrap();
        let second = play.choose(1, ms(2500)).unwrap();
        assert_eq!(second.time_ms, 500);
        assert!(second.complete);

        assert!(play.is_complete());
        assert_eq!(play.result(), Some(BestRecord::new(2, 1700)));
    }

    #[test]
    fn wrong_answers_add_no_time_and_can_be_retried() {
        let mut play = Playthrough::new(vec![level(1, "Square"), level(2, "Square")], ms(0));

        let miss = play.choose(0, ms(900)).unwrap();
        assert!(!miss.correct);
        assert_eq!(miss.attempt_score, 0);
        assert_eq!(miss.correct_answer, "Square");
        assert_eq!(play.choose(1, ms(950)), Err(PlaythroughError::AlreadyAnswered));

        play.try_again(ms(1000)).unwrap();
        let hit = play.choose(1, ms(1300)).unwrap();
        assert!(hit.correct);
        assert_eq!(play.total_time_ms(), 300);
        assert_eq!(play.score(), 1);
    }

    #[test]
    fn wrong_answer_on_last_level_completes() {
        let mut play = Playthrough::new(vec![level(1, "Square")], ms(0));
        play.choose(2, ms(400)).unwrap();
        assert!(play.is_complete());
        assert_eq!(play.result(), Some(BestRecord::new(0, 0)));
        assert_eq!(play.try_again(ms(500)), Err(PlaythroughError::Complete));
        assert_eq!(play.next_level(ms(500)), Err(PlaythroughError::Complete));
    }

    #[test]
    fn next_level_requires_an_answer() {
        let mut play = Playthrough::new(vec![level(1, "Square"), level(2, "Square")], ms(0));
        assert_eq!(play.next_level(ms(1)), Err(PlaythroughError::NotAnswered));
        assert_eq!(play.try_again(ms(1)), Err(PlaythroughError::NotAnswered));
    }

    #[test]
    fn rejects_unplayable_levels_and_bad_choices() {
        let mut play = Playthrough::new(vec![level(1, " ")], ms(0));
        assert_eq!(
            play.choose(0, ms(1)),
            Err(PlaythroughError::LevelNotPlayable(GameLevelId::new("level-1")))
        );

        let mut play = Playthrough::new(vec![level(1, "Square")], ms(0));
        assert_eq!(
            play.choose(7, ms(1)),
            Err(PlaythroughError::UnknownChoice {
                index: 7,
                available: 3
            })
        );

        let mut empty = Playthrough::new(Vec::new(), ms(0));
        assert_eq!(empty.choose(0, ms(1)), Err(PlaythroughError::NoLevels));
    }

    #[test]
    fn restart_resets_score() {
        let mut play = Playthrough::new(vec![level(1, "Square")], ms(0));
        play.choose(1, ms(100)).unwrap();
        play.restart(ms(200));
        assert_eq!(play.score(), 0);
        assert!(!play.is_complete());
        assert_eq!(play.result(), None);
    }
}
