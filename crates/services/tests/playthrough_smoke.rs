use std::sync::Arc;

use chrono::Duration;
use edu_core::LocalCalendar;
use edu_core::model::{GameId, LessonId, UserId};
use edu_core::playthrough::Playthrough;
use edu_core::scoring::BestRecord;
use edu_core::time::fixed_now;
use services::best::{DeviceBestSink, MemoryDeviceStore};
use services::{AppServices, AttemptReport, BestTracker, Clock, ProgressReport, ServicesConfig};
use storage::demo::seed_demo_catalog;
use storage::repository::Storage;

fn config() -> ServicesConfig {
    ServicesConfig {
        clock: Clock::fixed(fixed_now()),
        calendar: LocalCalendar::utc(),
        ..ServicesConfig::default()
    }
}

#[tokio::test]
async fn full_playthrough_updates_both_bests() {
    let storage = Storage::in_memory();
    seed_demo_catalog(&storage).await.unwrap();
    let services = AppServices::from_storage(&storage, config());
    let games = services.games();
    let user = UserId::new("u-player");
    let game_id = GameId::new("game-logic-quest");

    let detail = games.get(&game_id).await.unwrap();
    let mut now = fixed_now();
    let mut run = Playthrough::new(detail.levels, now);

    // Level 1: wrong, then retried correctly after 2s.
    now += Duration::seconds(1);
    let wrong = run.choose(0, now).unwrap();
    assert!(!wrong.correct);
    run.try_again(now).unwrap();
    now += Duration::seconds(2);
    let right = run.choose(1, now).unwrap();
    assert!(right.correct);
    for outcome in [wrong, right] {
        games
            .record_attempt(
                &user,
                AttemptReport {
                    level_id: outcome.level_id,
                    score: outcome.attempt_score,
                    time_ms: outcome.time_ms,
                },
            )
            .await
            .unwrap();
    }

    // Level 2 correct after 3s, level 3 skipped with a wrong answer.
    run.next_level(now).unwrap();
    now += Duration::seconds(3);
    assert!(run.choose(2, now).unwrap().correct);
    run.next_level(now).unwrap();
    now += Duration::seconds(4);
    let last = run.choose(1, now).unwrap();
    assert!(!last.correct);
    assert!(last.complete);

    let result = run.result().expect("complete");
    assert_eq!(result, BestRecord::new(2, 5_000));

    let device = MemoryDeviceStore::new();
    let tracker = BestTracker::new()
        .with_sink(Arc::new(DeviceBestSink::new(Arc::new(device))))
        .with_authoritative_sink(Arc::new(games.durable_sink(&user)));
    let report = tracker.finish(&game_id, result).await;
    assert!(report.is_new_best());
    assert_eq!(report.presented, result);

    assert_eq!(games.best(&user, &game_id).await.unwrap(), Some(result));
    let attempts = storage.game_scores.list_game_attempts(&user).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].time_ms, 2_000);
}

#[tokio::test]
async fn progress_flows_into_the_dashboard() {
    let storage = Storage::in_memory();
    seed_demo_catalog(&storage).await.unwrap();
    let services = AppServices::from_storage(&storage, config());
    let user = UserId::new("u-learner");

    services
        .progress()
        .record(
            &user,
            ProgressReport {
                lesson_id: LessonId::new("lesson-math-1"),
                watch_percent: 100.0,
                completed: true,
            },
        )
        .await
        .unwrap();
    services
        .progress()
        .record(
            &user,
            ProgressReport {
                lesson_id: LessonId::new("lesson-math-2"),
                watch_percent: 35.0,
                completed: false,
            },
        )
        .await
        .unwrap();

    let summary = services.dashboard().summary_or_zero(&user).await;
    assert_eq!(summary.completed_total, 1);
    assert_eq!(summary.completed_this_week, 1);
    assert_eq!(summary.streak_days, 1);
    let resume = summary.continue_watching.expect("resume target");
    assert_eq!(resume.lesson_id, LessonId::new("lesson-math-2"));
    assert_eq!(resume.watch_percent.value(), 35);
}
