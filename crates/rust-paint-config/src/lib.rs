//! Persisted application settings for rust-paint.
pub mod color;
pub mod config;

pub use color::HexColor;
pub use config::AppConfig;
