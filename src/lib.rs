pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use db::{connect_optional, create_pool};
pub use error::{AppError, Result};
pub use models::{AnalysisReport, Issue, LineItem};
pub use service::BillAnalyzer;
