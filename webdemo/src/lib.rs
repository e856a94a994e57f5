mod app;
mod bridge;
mod canvas;
pub mod config;
mod download;
mod theme;
mod worker;

pub use app::App;
pub use theme::Theme;
pub use worker::ModelReactor;
