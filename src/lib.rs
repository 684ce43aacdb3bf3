pub mod achievements;
pub mod analysis;
pub mod app;
pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod progress;
pub mod session;
pub mod sounds;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;

pub use app::router;
pub use state::AppState;
pub use storage::{load_data, resolve_data_path};
