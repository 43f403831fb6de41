use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use app::config::Config;
use app::play::{PlayOptions, play};
use app::state::AppState;
use edu_core::model::{GameId, UserId};
use services::best::{DeviceBestSink, FileDeviceStore};
use services::{AppServices, BestTracker, Clock};
use storage::demo::seed_demo_catalog;
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED_DB: &str = "sqlite:dev.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidAddr { raw: String },
    InvalidUser { raw: String },
    MissingGameId,
    UserNeedsDatabase,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAddr { raw } => write!(f, "invalid --addr value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
            ArgsError::MissingGameId => write!(f, "play requires a game id"),
            ArgsError::UserNeedsDatabase => {
                write!(f, "--user needs a database (--db or DATABASE_URL)")
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- serve [--addr <host:port>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- play  <game-id> [--db <sqlite_url>] [--user <id>]");
    eprintln!("                            [--device-dir <dir>]");
    eprintln!();
    eprintln!("Without a database, serve and play use the read-only demo catalog.");
    eprintln!("seed defaults to --db {DEFAULT_SEED_DB}.");
    eprintln!();
    eprintln!("Environment (.env is read if present):");
    eprintln!("  EDU_ADDR, DATABASE_URL, ADMIN_EMAILS, EDU_UTC_OFFSET_MINUTES,");
    eprintln!("  EDU_DASHBOARD_CACHE_SECS, EDU_DEVICE_DIR, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Serve,
    Seed,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "serve" => Some(Self::Serve),
            "seed" => Some(Self::Seed),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

/// Command line overrides on top of `Config::from_env`.
#[derive(Debug, Default)]
struct Args {
    addr: Option<SocketAddr>,
    db_url: Option<String>,
    game_id: Option<GameId>,
    user: Option<UserId>,
    device_dir: Option<PathBuf>,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--addr" if cmd == Command::Serve => {
                    let value = require_value(args, "--addr")?;
                    let addr = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAddr { raw: value.clone() })?;
                    parsed.addr = Some(addr);
                }
                "--user" if cmd == Command::Play => {
                    let value = require_value(args, "--user")?;
                    let user = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                    parsed.user = Some(user);
                }
                "--device-dir" if cmd == Command::Play => {
                    parsed.device_dir = Some(PathBuf::from(require_value(args, "--device-dir")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if cmd == Command::Play && parsed.game_id.is_none() && !other.starts_with('-') => {
                    parsed.game_id = Some(GameId::new(other));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Play && parsed.game_id.is_none() {
            return Err(ArgsError::MissingGameId);
        }
        Ok(parsed)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim().to_string();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.contains("mode=memory")
    {
        return trimmed;
    }

    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Open (creating if needed) and migrate the `SQLite` database at `raw`.
async fn open_sqlite(raw: String) -> Result<(Storage, String), Box<dyn std::error::Error>> {
    let db_url = normalize_sqlite_url(raw);
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    Ok((storage, db_url))
}

async fn open_services(config: &Config) -> Result<AppServices, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(raw) => {
            let (storage, db_url) = open_sqlite(raw.clone()).await?;
            info!(db = %db_url, "using sqlite storage");
            Ok(AppServices::from_storage(&storage, config.services_config()))
        }
        None => {
            info!("DATABASE_URL not set; serving the read-only demo catalog");
            Ok(AppServices::mock(config.services_config()))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let services = open_services(&config).await?;
    info!(
        addr = %config.addr,
        storage = services.mode().as_str(),
        admins = config.admin_emails.len(),
        "starting server"
    );

    let app = app::build_app(AppState::new(services));
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn seed(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let raw = config
        .database_url
        .unwrap_or_else(|| DEFAULT_SEED_DB.to_owned());
    let (storage, db_url) = open_sqlite(raw).await?;
    let report = seed_demo_catalog(&storage).await?;
    println!(
        "Seeded {} courses, {} lessons, {} questions and {} game levels into {}",
        report.courses, report.lessons, report.questions, report.levels, db_url
    );
    Ok(())
}

async fn play_game(
    config: Config,
    game_id: GameId,
    user: Option<UserId>,
) -> Result<(), Box<dyn std::error::Error>> {
    if user.is_some() && config.database_url.is_none() {
        return Err(ArgsError::UserNeedsDatabase.into());
    }
    let services = open_services(&config).await?;
    let games = services.games();

    let device = FileDeviceStore::new(&config.device_dir);
    let mut tracker = BestTracker::new().with_sink(Arc::new(DeviceBestSink::new(Arc::new(device))));
    if let Some(user_id) = &user {
        // Signed in: the account record is what the player sees.
        tracker = tracker.with_authoritative_sink(Arc::new(games.durable_sink(user_id)));
    }

    let options = PlayOptions {
        clock: Clock::default_clock(),
        attempts_for: user.as_ref(),
    };
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    play(
        &games,
        &tracker,
        &game_id,
        options,
        stdin,
        std::io::stdout(),
    )
    .await?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: serve when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Serve,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Serve,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let mut config = Config::from_env()?;
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(db_url) = args.db_url {
        config.database_url = Some(db_url);
    }
    if let Some(dir) = args.device_dir {
        config.device_dir = dir;
    }

    match cmd {
        Command::Serve => serve(config).await,
        Command::Seed => seed(config).await,
        Command::Play => {
            let game_id = args.game_id.ok_or(ArgsError::MissingGameId)?;
            play_game(config, game_id, args.user).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
