//! The demo catalog: served read-only when no database is configured and
//! written into fresh databases by the seeder.

use edu_core::model::{
    Course, CourseId, Game, GameId, GameLevel, GameLevelId, Lesson, LessonId, LevelConfig,
    QuestionId, QuestionKind, QuizQuestion,
};

use crate::memory::InMemoryRepository;
use crate::repository::{Storage, StorageError};

/// Catalog content loaded in one piece.
#[derive(Debug, Clone, Default)]
pub struct DemoCatalog {
    pub courses: Vec<Course>,
    pub lessons: Vec<Lesson>,
    pub questions: Vec<QuizQuestion>,
    pub games: Vec<Game>,
    pub levels: Vec<GameLevel>,
}

fn course(id: &str, title: &str, description: &str, grade_level: &str) -> Course {
    Course {
        id: CourseId::new(id),
        title: title.into(),
        description: description.into(),
        grade_level: grade_level.into(),
        is_published: true,
    }
}

fn lesson(id: &str, course_id: &str, order: u32, title: &str, video_id: &str, notes: &str) -> Lesson {
    Lesson {
        id: LessonId::new(id),
        course_id: CourseId::new(course_id),
        title: title.into(),
        video_id: video_id.into(),
        order,
        notes: notes.into(),
        is_published: true,
    }
}

fn level(id: &str, number: u32, prompt: &str, choices: [&str; 3], answer: &str) -> GameLevel {
    GameLevel {
        id: GameLevelId::new(id),
        game_id: GameId::new("game-logic-quest"),
        level_number: number,
        config: LevelConfig {
            prompt: prompt.into(),
            choices: choices.iter().map(|c| (*c).to_owned()).collect(),
            answer: answer.into(),
        },
    }
}

/// "Logic Explorers", "Math Adventures" and the "Logic Quest" game.
#[must_use]
pub fn demo_catalog() -> DemoCatalog {
    let courses = vec![
        course(
            "course-logic",
            "Logic Explorers",
            "Patterns, sequences, and critical thinking challenges.",
            "Grades 3-5",
        ),
        course(
            "course-math",
            "Math Adventures",
            "Numbers, fractions, and problem-solving quests.",
            "Grades 4-6",
        ),
    ];

    let lessons = vec![
        lesson(
            "lesson-logic-1",
            "course-logic",
            1,
            "Spot the Pattern",
            "mC6Y9xq-0RA",
            "Find the next item in a pattern and explain your reasoning.",
        ),
        lesson(
            "lesson-logic-2",
            "course-logic",
            2,
            "Logic Grids",
            "8qjV4yjiBrg",
            "Solve puzzles using clues and elimination.",
        ),
        lesson(
            "lesson-logic-3",
            "course-logic",
            3,
            "If-Then Thinking",
            "hEV6G2-15R4",
            "Use if-then statements to solve simple mysteries.",
        ),
        lesson(
            "lesson-math-1",
            "course-math",
            1,
            "Fractions in the Wild",
            "4lkds9NL2qg",
            "Fractions show up in cooking, building, and sports.",
        ),
        lesson(
            "lesson-math-2",
            "course-math",
            2,
            "Multiplication Tricks",
            "t2D1dGyG2A0",
            "Practice quick tricks to multiply numbers faster.",
        ),
        lesson(
            "lesson-math-3",
            "course-math",
            3,
            "Solve the Word Problem",
            "nV0qKMh8Yx4",
            "Break down word problems into simple steps.",
        ),
    ];

    let questions = vec![
        QuizQuestion {
            id: QuestionId::new("q-logic-1"),
            lesson_id: LessonId::new("lesson-logic-1"),
            kind: QuestionKind::MultipleChoice,
            prompt: "Which shape completes the pattern?".into(),
            options: Some(vec!["Triangle".into(), "Square".into(), "Circle".into()]),
            answer: "Square".into(),
            explanation: Some("The pattern alternates triangle and square.".into()),
        },
        QuizQuestion {
            id: QuestionId::new("q-math-2"),
            lesson_id: LessonId::new("lesson-math-2"),
            kind: QuestionKind::ShortAnswer,
            prompt: "What is 6 x 7?".into(),
            options: None,
            answer: "42".into(),
            explanation: Some("Six groups of seven make forty-two.".into()),
        },
    ];

    let games = vec![Game {
        id: GameId::new("game-logic-quest"),
        title: "Logic Quest".into(),
        description: "Solve the pattern to unlock the next level.".into(),
        is_published: true,
    }];

    let levels = vec![
        level(
            "level-logic-1",
            1,
            "Choose the next shape in the pattern: △ □ △ ?",
            ["Triangle", "Square", "Circle"],
            "Square",
        ),
        level(
            "level-logic-2",
            2,
            "Which shape does NOT belong? ○ △ ○ □ ○",
            ["Circle", "Triangle", "Square"],
            "Square",
        ),
        level(
            "level-logic-3",
            3,
            "Complete the pattern: □ △ △ □ △ △ ?",
            ["Square", "Triangle", "Circle"],
            "Square",
        ),
    ];

    DemoCatalog {
        courses,
        lessons,
        questions,
        games,
        levels,
    }
}

pub(crate) fn demo_repository() -> InMemoryRepository {
    InMemoryRepository::from_catalog(demo_catalog())
}

/// What the seeder wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub courses: usize,
    pub lessons: usize,
    pub questions: usize,
    pub levels: usize,
}

/// Write the demo catalog into `storage`, updating rows that already exist.
///
/// # Errors
///
/// Returns `StorageError` if any row cannot be written.
pub async fn seed_demo_catalog(storage: &Storage) -> Result<SeedReport, StorageError> {
    let catalog = demo_catalog();
    let mut report = SeedReport::default();

    for course in &catalog.courses {
        match storage.catalog.get_course(&course.id).await? {
            Some(_) => storage.admin.update_course(course).await?,
            None => storage.admin.insert_course(course).await?,
        }
        report.courses += 1;
    }
    for lesson in &catalog.lessons {
        match storage.catalog.get_lesson(&lesson.id).await? {
            Some(_) => storage.admin.update_lesson(lesson).await?,
            None => storage.admin.insert_lesson(lesson).await?,
        }
        report.lessons += 1;
    }
    for question in &catalog.questions {
        storage.admin.upsert_question(question).await?;
        report.questions += 1;
    }
    for game in &catalog.games {
        storage.admin.upsert_game(game).await?;
    }
    for level in &catalog.levels {
        storage.admin.upsert_game_level(level).await?;
        report.levels += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_levels_are_playable() {
        let catalog = demo_catalog();
        assert_eq!(catalog.levels.len(), 3);
        assert!(catalog.levels.iter().all(|l| l.config.is_playable()));
    }

    #[tokio::test]
    async fn mock_storage_serves_the_demo_catalog() {
        let storage = Storage::mock();
        let courses = storage.catalog.list_published_courses().await.unwrap();
        let titles: Vec<&str> = courses.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Logic Explorers", "Math Adventures"]);
        assert_eq!(courses[0].lesson_count, 3);
        assert_eq!(
            courses[0].first_lesson_id,
            Some(LessonId::new("lesson-logic-1"))
        );

        let games = storage.catalog.list_published_games().await.unwrap();
        assert_eq!(games[0].level_count, 3);
    }

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let storage = Storage::in_memory();
        let first = seed_demo_catalog(&storage).await.unwrap();
        let second = seed_demo_catalog(&storage).await.unwrap();
        assert_eq!(first, second);

        let questions = storage
            .catalog
            .list_questions(&LessonId::new("lesson-logic-1"))
            .await
            .unwrap();
        assert_eq!(questions.len(), 1);
    }
}
