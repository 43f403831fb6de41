use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use edu_core::LocalCalendar;
use edu_core::model::{
    ContinueWatchingItem, Course, CourseId, CourseOverview, Game, GameAttempt, GameId, GameLevel,
    GameLevelId, GameOverview, Lesson, LessonId, LessonProgress, QuizAttempt, QuizQuestion, Role,
    User, UserId,
};
use edu_core::scoring::BestRecord;

use crate::demo::DemoCatalog;
use crate::repository::{
    AdminRepository, CatalogRepository, GameScoreRepository, ProgressRepository,
    QuizAttemptRepository, StorageError, UserProfile, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    questions: Vec<QuizQuestion>,
    games: HashMap<GameId, Game>,
    levels: Vec<GameLevel>,
    progress: HashMap<(UserId, LessonId), LessonProgress>,
    quiz_attempts: Vec<QuizAttempt>,
    game_attempts: Vec<GameAttempt>,
    bests: HashMap<(UserId, GameId), BestRecord>,
}

impl Tables {
    fn lesson_ids(&self, course_id: &CourseId, published_only: bool) -> Vec<LessonId> {
        let mut lessons: Vec<&Lesson> = self
            .lessons
            .values()
            .filter(|l| &l.course_id == course_id && (!published_only || l.is_published))
            .collect();
        lessons.sort_by_key(|l| l.order);
        lessons.into_iter().map(|l| l.id.clone()).collect()
    }

    fn overviews<'a>(
        &self,
        courses: impl Iterator<Item = &'a Course>,
        published_lessons_only: bool,
    ) -> Vec<CourseOverview> {
        let mut out: Vec<CourseOverview> = courses
            .map(|c| {
                let ids = self.lesson_ids(&c.id, published_lessons_only);
                CourseOverview::new(c.clone(), &ids)
            })
            .collect();
        out.sort_by(|a, b| a.title.cmp(&b.title));
        out
    }

    fn order_taken(&self, lesson: &Lesson) -> bool {
        self.lessons.values().any(|l| {
            l.id != lesson.id && l.course_id == lesson.course_id && l.order == lesson.order
        })
    }

    fn purge_lessons(&mut self, ids: &[LessonId]) {
        self.quiz_attempts.retain(|a| !ids.contains(&a.lesson_id));
        self.progress.retain(|(_, lesson), _| !ids.contains(lesson));
        self.questions.retain(|q| !ids.contains(&q.lesson_id));
        for id in ids {
            self.lessons.remove(id);
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A read-only instance serves the catalog and answers everything else
/// with `StorageError::NotConfigured`.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
    read_only: bool,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writable repository pre-loaded with `catalog`.
    #[must_use]
    pub fn from_catalog(catalog: DemoCatalog) -> Self {
        let tables = Tables {
            courses: catalog
                .courses
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            lessons: catalog
                .lessons
                .into_iter()
                .map(|l| (l.id.clone(), l))
                .collect(),
            questions: catalog.questions,
            games: catalog.games.into_iter().map(|g| (g.id.clone(), g)).collect(),
            levels: catalog.levels,
            ..Tables::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
            read_only: false,
        }
    }

    /// Same data, but learner data and authoring become unavailable.
    #[must_use]
    pub fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn lock_user_data(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        if self.read_only {
            return Err(StorageError::NotConfigured);
        }
        self.lock()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn list_published_courses(&self) -> Result<Vec<CourseOverview>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.overviews(guard.courses.values().filter(|c| c.is_published), true))
    }

    async fn get_course(&self, id: &CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.courses.get(id).cloned())
    }

    async fn list_published_lessons(
        &self,
        course_id: &CourseId,
    ) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .lesson_ids(course_id, true)
            .iter()
            .filter_map(|id| guard.lessons.get(id).cloned())
            .collect())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(id).cloned())
    }

    async fn list_questions(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Vec<QuizQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .iter()
            .filter(|q| &q.lesson_id == lesson_id)
            .cloned()
            .collect())
    }

    async fn list_published_games(&self) -> Result<Vec<GameOverview>, StorageError> {
        let guard = self.lock()?;
        let mut games: Vec<GameOverview> = guard
            .games
            .values()
            .filter(|g| g.is_published)
            .map(|g| GameOverview {
                id: g.id.clone(),
                title: g.title.clone(),
                description: g.description.clone(),
                level_count: u32::try_from(
                    guard.levels.iter().filter(|l| l.game_id == g.id).count(),
                )
                .unwrap_or(u32::MAX),
            })
            .collect();
        games.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(games)
    }

    async fn get_game(&self, id: &GameId) -> Result<Option<Game>, StorageError> {
        Ok(self.lock()?.games.get(id).cloned())
    }

    async fn list_game_levels(&self, game_id: &GameId) -> Result<Vec<GameLevel>, StorageError> {
        let guard = self.lock()?;
        let mut levels: Vec<GameLevel> = guard
            .levels
            .iter()
            .filter(|l| &l.game_id == game_id)
            .cloned()
            .collect();
        levels.sort_by_key(|l| l.level_number);
        Ok(levels)
    }

    async fn get_game_level(&self, id: &GameLevelId) -> Result<Option<GameLevel>, StorageError> {
        Ok(self.lock()?.levels.iter().find(|l| &l.id == id).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, record: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.lessons.contains_key(&record.lesson_id) {
            return Err(StorageError::NotFound);
        }
        guard.progress.insert(
            (record.user_id.clone(), record.lesson_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard
            .progress
            .get(&(user_id.clone(), lesson_id.clone()))
            .cloned())
    }

    async fn latest_in_progress(
        &self,
        user_id: &UserId,
    ) -> Result<Option<ContinueWatchingItem>, StorageError> {
        let guard = self.lock_user_data()?;
        let latest = guard
            .progress
            .values()
            .filter(|p| &p.user_id == user_id && p.is_in_progress())
            .max_by_key(|p| p.updated_at);

        let Some(progress) = latest else {
            return Ok(None);
        };
        let lesson = guard
            .lessons
            .get(&progress.lesson_id)
            .ok_or_else(|| StorageError::Serialization("progress without lesson".into()))?;
        let course = guard
            .courses
            .get(&lesson.course_id)
            .ok_or_else(|| StorageError::Serialization("lesson without course".into()))?;
        Ok(Some(ContinueWatchingItem::new(
            lesson.id.clone(),
            course.id.clone(),
            lesson.title.clone(),
            course.title.clone(),
            progress.watch_percent,
        )))
    }

    async fn count_completed(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, StorageError> {
        let guard = self.lock_user_data()?;
        let count = guard
            .progress
            .values()
            .filter(|p| &p.user_id == user_id)
            .filter_map(|p| p.completed_at)
            .filter(|at| since.is_none_or(|since| *at >= since))
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn completion_dates(
        &self,
        user_id: &UserId,
        calendar: LocalCalendar,
    ) -> Result<Vec<NaiveDate>, StorageError> {
        let guard = self.lock_user_data()?;
        let dates: BTreeSet<NaiveDate> = guard
            .progress
            .values()
            .filter(|p| &p.user_id == user_id)
            .filter_map(|p| p.completed_at)
            .map(|at| calendar.local_date(at))
            .collect();
        Ok(dates.into_iter().rev().collect())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn record_quiz_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.lessons.contains_key(&attempt.lesson_id) {
            return Err(StorageError::NotFound);
        }
        guard.quiz_attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_quiz_attempts(&self, user_id: &UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard
            .quiz_attempts
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GameScoreRepository for InMemoryRepository {
    async fn record_game_attempt(&self, attempt: &GameAttempt) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.levels.iter().any(|l| l.id == attempt.level_id) {
            return Err(StorageError::NotFound);
        }
        guard.game_attempts.push(attempt.clone());
        Ok(())
    }

    async fn list_game_attempts(&self, user_id: &UserId) -> Result<Vec<GameAttempt>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard
            .game_attempts
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
    ) -> Result<Option<BestRecord>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard
            .bests
            .get(&(user_id.clone(), game_id.clone()))
            .copied())
    }

    async fn offer_best(
        &self,
        user_id: &UserId,
        game_id: &GameId,
        candidate: BestRecord,
        _at: DateTime<Utc>,
    ) -> Result<(BestRecord, bool), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.games.contains_key(game_id) {
            return Err(StorageError::NotFound);
        }
        let key = (user_id.clone(), game_id.clone());
        let (kept, replaced) = candidate.reconcile(guard.bests.get(&key).copied());
        if replaced {
            guard.bests.insert(key, kept);
        }
        Ok((kept, replaced))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn ensure_user(&self, profile: &UserProfile) -> Result<User, StorageError> {
        let mut guard = self.lock_user_data()?;
        let role = match guard.users.get(&profile.id) {
            _ if profile.make_admin => Role::Admin,
            Some(existing) => existing.role,
            None => Role::Student,
        };
        let user = User {
            id: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            role,
        };
        guard.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock_user_data()?.users.get(id).cloned())
    }
}

#[async_trait]
impl AdminRepository for InMemoryRepository {
    async fn list_all_courses(&self) -> Result<Vec<CourseOverview>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard.overviews(guard.courses.values(), false))
    }

    async fn list_all_lessons(&self, course_id: &CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock_user_data()?;
        Ok(guard
            .lesson_ids(course_id, false)
            .iter()
            .filter_map(|id| guard.lessons.get(id).cloned())
            .collect())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if guard.courses.contains_key(&course.id) {
            return Err(StorageError::Conflict);
        }
        guard.courses.insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn update_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        let slot = guard
            .courses
            .get_mut(&course.id)
            .ok_or(StorageError::NotFound)?;
        *slot = course.clone();
        Ok(())
    }

    async fn delete_course(&self, id: &CourseId) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.courses.contains_key(id) {
            return Err(StorageError::NotFound);
        }
        let lesson_ids = guard.lesson_ids(id, false);
        guard.purge_lessons(&lesson_ids);
        guard.courses.remove(id);
        Ok(())
    }

    async fn insert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.courses.contains_key(&lesson.course_id) {
            return Err(StorageError::NotFound);
        }
        if guard.lessons.contains_key(&lesson.id) || guard.order_taken(lesson) {
            return Err(StorageError::Conflict);
        }
        guard.lessons.insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.lessons.contains_key(&lesson.id)
            || !guard.courses.contains_key(&lesson.course_id)
        {
            return Err(StorageError::NotFound);
        }
        if guard.order_taken(lesson) {
            return Err(StorageError::Conflict);
        }
        guard.lessons.insert(lesson.id.clone(), lesson.clone());
        Ok(())
    }

    async fn delete_lesson(&self, id: &LessonId) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.lessons.contains_key(id) {
            return Err(StorageError::NotFound);
        }
        guard.purge_lessons(std::slice::from_ref(id));
        Ok(())
    }

    async fn upsert_question(&self, question: &QuizQuestion) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.lessons.contains_key(&question.lesson_id) {
            return Err(StorageError::NotFound);
        }
        match guard.questions.iter_mut().find(|q| q.id == question.id) {
            Some(slot) => *slot = question.clone(),
            None => guard.questions.push(question.clone()),
        }
        Ok(())
    }

    async fn upsert_game(&self, game: &Game) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        guard.games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn upsert_game_level(&self, level: &GameLevel) -> Result<(), StorageError> {
        let mut guard = self.lock_user_data()?;
        if !guard.games.contains_key(&level.game_id) {
            return Err(StorageError::NotFound);
        }
        let clash = guard.levels.iter().any(|l| {
            l.id != level.id && l.game_id == level.game_id && l.level_number == level.level_number
        });
        if clash {
            return Err(StorageError::Conflict);
        }
        match guard.levels.iter_mut().find(|l| l.id == level.id) {
            Some(slot) => *slot = level.clone(),
            None => guard.levels.push(level.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use edu_core::model::{LessonDraft, WatchPercent};
    use edu_core::time::fixed_now;

    fn course(id: &str, title: &str, published: bool) -> Course {
        Course {
            id: CourseId::new(id),
            title: title.into(),
            description: "A course for testing.".into(),
            grade_level: "Grades 3-5".into(),
            is_published: published,
        }
    }

    fn lesson(id: &str, course_id: &str, order: u32, published: bool) -> Lesson {
        let mut lesson = LessonDraft {
            course_id: CourseId::new(course_id),
            title: format!("Lesson {order}"),
            video_id: "abcd1234".into(),
            order,
            notes: "Some lesson notes.".into(),
            is_published: Some(published),
        }
        .validate()
        .unwrap();
        lesson.id = LessonId::new(id);
        lesson
    }

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        repo.insert_course(&course("c-math", "Math", true)).await.unwrap();
        repo.insert_course(&course("c-art", "Art", false)).await.unwrap();
        repo.insert_lesson(&lesson("l2", "c-math", 2, true)).await.unwrap();
        repo.insert_lesson(&lesson("l1", "c-math", 1, true)).await.unwrap();
        repo.insert_lesson(&lesson("l3", "c-math", 3, false)).await.unwrap();
        repo
    }

    fn progress(lesson: &str, percent: u8, completed_at: Option<DateTime<Utc>>) -> LessonProgress {
        LessonProgress {
            user_id: UserId::new("u1"),
            lesson_id: LessonId::new(lesson),
            watch_percent: WatchPercent::from_u8(percent).unwrap(),
            completed_at,
            updated_at: completed_at.unwrap_or_else(fixed_now),
        }
    }

    #[tokio::test]
    async fn published_listing_hides_drafts() {
        let repo = seeded().await;
        let courses = repo.list_published_courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].lesson_count, 2);
        assert_eq!(courses[0].first_lesson_id, Some(LessonId::new("l1")));

        let all = repo.list_all_courses().await.unwrap();
        let titles: Vec<&str> = all.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Art", "Math"]);
        assert_eq!(all[1].lesson_count, 3);
    }

    #[tokio::test]
    async fn duplicate_lesson_order_conflicts() {
        let repo = seeded().await;
        let err = repo
            .insert_lesson(&lesson("l9", "c-math", 2, true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let err = repo
            .insert_lesson(&lesson("l9", "c-missing", 1, true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn latest_in_progress_skips_finished_lessons() {
        let repo = seeded().await;
        let now = fixed_now();
        let mut started = progress("l1", 40, None);
        started.updated_at = now - Duration::hours(2);
        repo.upsert_progress(&started).await.unwrap();
        repo.upsert_progress(&progress("l2", 100, Some(now))).await.unwrap();

        let item = repo
            .latest_in_progress(&UserId::new("u1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.lesson_id, LessonId::new("l1"));
        assert_eq!(item.course_title, "Math");
        assert_eq!(item.href, "/courses/c-math/lessons/l1");
    }

    #[tokio::test]
    async fn completion_dates_are_distinct_and_newest_first() {
        let repo = seeded().await;
        let now = fixed_now();
        repo.upsert_progress(&progress("l1", 100, Some(now))).await.unwrap();
        repo.upsert_progress(&progress("l2", 100, Some(now + Duration::hours(1))))
            .await
            .unwrap();
        repo.upsert_progress(&progress("l3", 100, Some(now - Duration::days(2))))
            .await
            .unwrap();

        let dates = repo
            .completion_dates(&UserId::new("u1"), LocalCalendar::utc())
            .await
            .unwrap();
        assert_eq!(dates.len(), 2);
        assert!(dates[0] > dates[1]);
        assert_eq!(
            repo.count_completed(&UserId::new("u1"), None).await.unwrap(),
            3
        );
        assert_eq!(
            repo.count_completed(&UserId::new("u1"), Some(now))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn deleting_a_course_cascades() {
        let repo = seeded().await;
        repo.upsert_progress(&progress("l1", 50, None)).await.unwrap();
        repo.delete_course(&CourseId::new("c-math")).await.unwrap();

        assert!(repo.get_lesson(&LessonId::new("l1")).await.unwrap().is_none());
        assert!(
            repo.get_progress(&UserId::new("u1"), &LessonId::new("l1"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            repo.delete_course(&CourseId::new("c-math")).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn offer_best_applies_the_replacement_rule() {
        let repo = InMemoryRepository::new();
        let game = Game {
            id: GameId::new("g1"),
            title: "Quest".into(),
            description: "Play".into(),
            is_published: true,
        };
        repo.upsert_game(&game).await.unwrap();
        let user = UserId::new("u1");
        let now = fixed_now();

        let (best, replaced) = repo
            .offer_best(&user, &game.id, BestRecord::new(2, 5000), now)
            .await
            .unwrap();
        assert!(replaced);
        assert_eq!(best, BestRecord::new(2, 5000));

        let (best, replaced) = repo
            .offer_best(&user, &game.id, BestRecord::new(2, 0), now)
            .await
            .unwrap();
        assert!(!replaced);
        assert_eq!(best, BestRecord::new(2, 5000));

        let missing = repo
            .offer_best(&user, &GameId::new("nope"), BestRecord::new(1, 1), now)
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn ensure_user_promotes_but_never_demotes() {
        let repo = InMemoryRepository::new();
        let mut profile = UserProfile {
            id: UserId::new("u1"),
            email: "kid@example.com".into(),
            name: None,
            make_admin: false,
        };
        assert_eq!(repo.ensure_user(&profile).await.unwrap().role, Role::Student);

        profile.make_admin = true;
        assert_eq!(repo.ensure_user(&profile).await.unwrap().role, Role::Admin);

        profile.make_admin = false;
        profile.name = Some("Kid".into());
        let user = repo.ensure_user(&profile).await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name.as_deref(), Some("Kid"));
    }

    #[tokio::test]
    async fn read_only_repository_serves_catalog_only() {
        let repo = seeded().await.read_only();
        assert_eq!(repo.list_published_courses().await.unwrap().len(), 1);
        assert!(matches!(
            repo.upsert_progress(&progress("l1", 10, None)).await,
            Err(StorageError::NotConfigured)
        ));
        assert!(matches!(
            repo.count_completed(&UserId::new("u1"), None).await,
            Err(StorageError::NotConfigured)
        ));
    }
}
