use std::fmt;

use chrono::{DateTime, Duration, Utc};
use edu_core::model::{LessonProgress, UserId, WatchPercent};
use storage::demo::{demo_catalog, seed_demo_catalog};
use storage::repository::{Storage, UserProfile};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user: Option<UserId>,
    email: String,
    completions: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidCompletions { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::InvalidCompletions { raw } => {
                write!(f, "invalid --completions value: {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut user = None;
        let mut email = "student@example.com".to_owned();
        let mut completions = 3;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                    user = Some(parsed);
                }
                "--email" => {
                    email = require_value(&mut args, "--email")?;
                }
                "--completions" => {
                    let value = require_value(&mut args, "--completions")?;
                    completions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCompletions { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user,
            email,
            completions,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --user <id>               Also record sample lesson progress for this user");
    eprintln!("  --email <email>           Email for --user (default: student@example.com)");
    eprintln!("  --completions <n>         Lessons to mark complete, one per day (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DATABASE_URL (same as --db)");
}

async fn seed_progress(
    storage: &Storage,
    user_id: &UserId,
    email: &str,
    completions: u32,
    now: DateTime<Utc>,
) -> Result<usize, Box<dyn std::error::Error>> {
    storage
        .users
        .ensure_user(&UserProfile {
            id: user_id.clone(),
            email: email.to_owned(),
            name: None,
            make_admin: false,
        })
        .await?;

    let lessons = demo_catalog().lessons;
    let mut written = 0;

    // Consecutive days ending today, so the dashboard shows a streak.
    for (i, lesson) in lessons.iter().take(completions as usize).enumerate() {
        let days_ago = i64::try_from(i)?;
        let at = now - Duration::days(days_ago);
        let record = LessonProgress::record(
            user_id.clone(),
            lesson.id.clone(),
            WatchPercent::COMPLETE,
            true,
            at,
        );
        storage.progress.upsert_progress(&record).await?;
        written += 1;
    }

    // One half-watched lesson to resume.
    if let Some(lesson) = lessons.get(completions as usize) {
        let record = LessonProgress::record(
            user_id.clone(),
            lesson.id.clone(),
            WatchPercent::from_u8(40)?,
            false,
            now,
        );
        storage.progress.upsert_progress(&record).await?;
        written += 1;
    }

    Ok(written)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let report = seed_demo_catalog(&storage).await?;
    println!(
        "Seeded {} courses, {} lessons, {} questions and {} game levels into {}",
        report.courses, report.lessons, report.questions, report.levels, args.db_url
    );

    if let Some(user_id) = &args.user {
        let written = seed_progress(&storage, user_id, &args.email, args.completions, now).await?;
        println!("Recorded {written} progress entries for user {user_id}");
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
