use std::sync::Arc;

use chrono::Duration;

use edu_core::{Clock, LocalCalendar};
use storage::repository::{Storage, StorageMode};

use crate::admin_service::AdminService;
use crate::catalog_service::CatalogService;
use crate::dashboard_service::{DEFAULT_CACHE_SECS, DashboardService};
use crate::error::AppServicesError;
use crate::game_service::GameService;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::user_service::UserService;

/// Settings shared by the assembled services.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub clock: Clock,
    pub calendar: LocalCalendar,
    pub dashboard_ttl: Duration,
    pub admin_emails: Vec<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            clock: Clock::default_clock(),
            calendar: LocalCalendar::host(),
            dashboard_ttl: Duration::seconds(DEFAULT_CACHE_SECS),
            admin_emails: Vec::new(),
        }
    }
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    mode: StorageMode,
    catalog: Arc<CatalogService>,
    dashboard: Arc<DashboardService>,
    progress: Arc<ProgressService>,
    quiz: Arc<QuizService>,
    games: Arc<GameService>,
    admin: Arc<AdminService>,
    users: Arc<UserService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        config: ServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, config))
    }

    /// Services over the read-only demo catalog.
    #[must_use]
    pub fn mock(config: ServicesConfig) -> Self {
        Self::from_storage(&Storage::mock(), config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, config: ServicesConfig) -> Self {
        let mode = storage.mode();
        let durable = mode != StorageMode::Mock;
        let clock = config.clock;

        let dashboard = Arc::new(DashboardService::new(
            clock,
            config.calendar,
            Arc::clone(&storage.progress),
            config.dashboard_ttl,
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&dashboard),
        ));
        let quiz = Arc::new(QuizService::new(
            clock,
            durable,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.quiz_attempts),
        ));
        let games = Arc::new(GameService::new(
            clock,
            durable,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.game_scores),
        ));
        let admin = Arc::new(AdminService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.admin),
        ));
        let users = Arc::new(UserService::new(
            durable,
            config.admin_emails,
            Arc::clone(&storage.users),
        ));

        Self {
            mode,
            catalog: Arc::new(CatalogService::new(Arc::clone(&storage.catalog))),
            dashboard,
            progress,
            quiz,
            games,
            admin,
            users,
        }
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn games(&self) -> Arc<GameService> {
        Arc::clone(&self.games)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }
}
