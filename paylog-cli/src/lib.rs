pub mod app;
pub mod export;
pub mod settings;

pub use app::run as run_app;
