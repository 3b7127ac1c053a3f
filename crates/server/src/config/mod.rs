pub use app::AppConfig;
pub use database::DatabaseConfig;

mod app;
mod database;
