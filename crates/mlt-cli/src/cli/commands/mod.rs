//! CLI command handlers.

mod config;
mod console;
mod line;
mod sim;

pub use config::run_config;
pub use console::run_console;
pub use line::ConsoleLine;
