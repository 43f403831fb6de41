#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod best;
pub mod catalog_service;
pub mod dashboard_service;
pub mod error;
pub mod game_service;
pub mod progress_service;
pub mod quiz_service;
pub mod user_service;

pub use edu_core::Clock;

pub use admin_service::AdminService;
pub use app_services::{AppServices, ServicesConfig};
pub use best::{BestSink, BestTracker, FinishReport};
pub use catalog_service::{CatalogService, CourseDetail, LessonDetail};
pub use dashboard_service::DashboardService;
pub use error::{AppServicesError, DashboardError, ServiceError};
pub use game_service::{AttemptReport, BestOutcome, GameService};
pub use progress_service::{ProgressReport, ProgressService, ProgressView};
pub use quiz_service::{QuizService, QuizSubmission};
pub use user_service::{UserService, parse_admin_emails};
