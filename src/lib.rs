pub mod app;
pub mod config;
pub mod http;
pub mod logging;

pub use app::application::{App, AppState, RunMode};
pub use config::Settings;
