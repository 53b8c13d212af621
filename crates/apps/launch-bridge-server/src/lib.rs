//! Standalone server wiring the launch bridge in front of a protected page.

pub mod app;
pub mod pages;
pub mod settings;

pub use app::build_app;
pub use settings::Settings;
