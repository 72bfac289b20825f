pub mod app;
pub mod archive;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod util;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::load_data;
