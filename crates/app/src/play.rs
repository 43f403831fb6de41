//! Terminal playthrough of a game, used by the `play` command.

use std::io::Write;

use edu_core::Clock;
use edu_core::model::{GameId, UserId};
use edu_core::playthrough::{Playthrough, PlaythroughError};
use services::{AttemptReport, BestTracker, FinishReport, GameService, ServiceError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Error)]
pub enum PlayError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Playthrough(#[from] PlaythroughError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("input ended before the game was finished")]
    Abandoned,
}

/// Settings for one terminal playthrough.
pub struct PlayOptions<'a> {
    pub clock: Clock,
    /// Log every answer as a per-level attempt for this account.
    pub attempts_for: Option<&'a UserId>,
}

async fn read_line(input: &mut (impl AsyncBufRead + Unpin)) -> Result<String, PlayError> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Err(PlayError::Abandoned);
    }
    Ok(line.trim().to_owned())
}

fn seconds(ms: u64) -> String {
    // Display only.
    #[allow(clippy::cast_precision_loss)]
    let secs = ms as f64 / 1000.0;
    format!("{secs:.1}s")
}

/// Play `game_id` to the end and hand the result to every best sink.
///
/// # Errors
///
/// Returns `PlayError::Service` for an unknown game, `PlayError::Playthrough`
/// when a level has no playable data, or `PlayError::Abandoned` when input
/// runs out first.
pub async fn play(
    games: &GameService,
    tracker: &BestTracker,
    game_id: &GameId,
    options: PlayOptions<'_>,
    mut input: impl AsyncBufRead + Unpin,
    mut output: impl Write,
) -> Result<FinishReport, PlayError> {
    let detail = games.get(game_id).await?;
    writeln!(
        output,
        "{} ({} levels)",
        detail.game.title,
        detail.levels.len()
    )?;
    if let Some(best) = tracker.best(game_id).await {
        writeln!(
            output,
            "Best so far: {} correct in {}",
            best.best_score,
            seconds(best.best_time_ms)
        )?;
    }

    let mut run = Playthrough::new(detail.levels, options.clock.now());
    while let Some(level) = run.current_level().cloned() {
        writeln!(output)?;
        writeln!(output, "Level {}: {}", level.level_number, level.config.prompt)?;
        for (i, choice) in level.config.choices.iter().enumerate() {
            writeln!(output, "  {}) {choice}", i + 1)?;
        }
        write!(output, "> ")?;
        output.flush()?;

        let answer = read_line(&mut input).await?;
        let index = match answer.parse::<usize>() {
            Ok(n) if (1..=level.config.choices.len()).contains(&n) => n - 1,
            _ => {
                writeln!(
                    output,
                    "Pick a number between 1 and {}.",
                    level.config.choices.len()
                )?;
                continue;
            }
        };

        let outcome = run.choose(index, options.clock.now())?;
        if let Some(user_id) = options.attempts_for {
            let report = AttemptReport {
                level_id: outcome.level_id.clone(),
                score: outcome.attempt_score,
                time_ms: outcome.time_ms,
            };
            if let Err(err) = games.record_attempt(user_id, report).await {
                tracing::warn!(error = %err, level = %outcome.level_id, "attempt not recorded");
            }
        }

        if outcome.correct {
            writeln!(output, "Correct! ({})", seconds(outcome.time_ms))?;
        } else {
            writeln!(output, "Not quite. The answer was {}.", outcome.correct_answer)?;
        }
        if outcome.complete {
            break;
        }

        if !outcome.correct {
            write!(output, "[r]etry or [n]ext? ")?;
            output.flush()?;
            if read_line(&mut input).await?.eq_ignore_ascii_case("r") {
                run.try_again(options.clock.now())?;
                continue;
            }
        }
        run.next_level(options.clock.now())?;
    }

    let result = run.result().ok_or(PlaythroughError::NoLevels)?;
    let report = tracker.finish(game_id, result).await;

    writeln!(output)?;
    writeln!(
        output,
        "Finished: {} correct in {}",
        result.best_score,
        seconds(result.best_time_ms)
    )?;
    if report.is_new_best() {
        writeln!(output, "New best!")?;
    } else {
        writeln!(
            output,
            "Best: {} correct in {}",
            report.presented.best_score,
            seconds(report.presented.best_time_ms)
        )?;
    }
    for warning in report.warnings() {
        writeln!(output, "warning: {warning}")?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use edu_core::LocalCalendar;
    use edu_core::scoring::BestRecord;
    use edu_core::time::fixed_now;
    use services::BestSink;
    use services::best::{DeviceBestSink, DeviceStore, MemoryDeviceStore, best_key};
    use services::{AppServices, ServicesConfig};
    use storage::demo::seed_demo_catalog;
    use storage::repository::Storage;

    fn config() -> ServicesConfig {
        ServicesConfig {
            clock: Clock::fixed(fixed_now()),
            calendar: LocalCalendar::utc(),
            ..ServicesConfig::default()
        }
    }

    fn options(user: Option<&UserId>) -> PlayOptions<'_> {
        PlayOptions {
            clock: Clock::fixed(fixed_now()),
            attempts_for: user,
        }
    }

    #[tokio::test]
    async fn retry_then_finish_saves_device_best() {
        let services = AppServices::mock(config());
        let device = MemoryDeviceStore::new();
        let tracker =
            BestTracker::new().with_sink(Arc::new(DeviceBestSink::new(Arc::new(device.clone()))));
        let game_id = GameId::new("game-logic-quest");

        let mut out = Vec::new();
        let input = "9\n1\nr\n2\n3\n1\n".as_bytes();
        let report = play(
            &services.games(),
            &tracker,
            &game_id,
            options(None),
            input,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(report.result, BestRecord::new(3, 0));
        assert!(report.is_new_best());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Pick a number between 1 and 3."));
        assert!(text.contains("Not quite. The answer was Square."));
        assert!(text.contains("New best!"));
        assert!(device.get(&best_key(&game_id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn wrong_last_answer_still_finishes() {
        let storage = Storage::in_memory();
        seed_demo_catalog(&storage).await.unwrap();
        let services = AppServices::from_storage(&storage, config());
        let user = UserId::new("u-terminal");
        let games = services.games();
        let tracker =
            BestTracker::new().with_authoritative_sink(Arc::new(games.durable_sink(&user)));

        let input = "2\n2\nn\n2\n".as_bytes();
        let report = play(
            &games,
            &tracker,
            &GameId::new("game-logic-quest"),
            options(Some(&user)),
            input,
            std::io::sink(),
        )
        .await
        .unwrap();

        assert_eq!(report.result.best_score, 1);
        let attempts = storage.game_scores.list_game_attempts(&user).await.unwrap();
        assert_eq!(attempts.len(), 3);
    }

    #[tokio::test]
    async fn running_out_of_input_abandons() {
        let services = AppServices::mock(config());
        let err = play(
            &services.games(),
            &BestTracker::new(),
            &GameId::new("game-logic-quest"),
            options(None),
            "2\n".as_bytes(),
            std::io::sink(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PlayError::Abandoned));
    }

    #[tokio::test]
    async fn signed_in_player_sees_account_best() {
        let storage = Storage::in_memory();
        seed_demo_catalog(&storage).await.unwrap();
        let services = AppServices::from_storage(&storage, config());
        let games = services.games();
        let user = UserId::new("u-terminal");
        let game_id = GameId::new("game-logic-quest");

        let account = games.durable_sink(&user);
        account.offer(&game_id, BestRecord::new(1, 9_000)).await.unwrap();
        let device = MemoryDeviceStore::new();
        device
            .set(&best_key(&game_id), r#"{"bestScore":3,"bestTimeMs":5000}"#)
            .await
            .unwrap();
        let tracker = BestTracker::new()
            .with_sink(Arc::new(DeviceBestSink::new(Arc::new(device))))
            .with_authoritative_sink(Arc::new(account));

        // A perfect run beats the account record; the device keeps its faster one.
        let mut out = Vec::new();
        let report = play(
            &games,
            &tracker,
            &game_id,
            options(Some(&user)),
            "1\nr\n2\n3\n1\n".as_bytes(),
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Best so far: 1 correct in 9.0s"));
        assert!(text.contains("New best!"));
        assert_eq!(report.presented, BestRecord::new(3, 0));
        assert!(!report.sinks[0].outcome.as_ref().unwrap().replaced);
    }
}
