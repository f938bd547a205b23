pub mod aggregate;
pub mod animation;
pub mod app;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod handlers;
pub mod interaction;
pub mod models;
pub mod state;
pub mod storage;
pub mod ui;
pub mod views;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_preferences;
