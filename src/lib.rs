pub mod app;
pub mod canvas;
pub mod error;
pub mod hotkey;
pub mod keyboard_hook;
pub mod logging;
pub mod render;
pub mod settings;
pub mod window;

pub use app::{App, ColorMode};
pub use error::AppError;
pub use settings::Settings;
