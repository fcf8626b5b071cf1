pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod forms;
pub mod gateway;
pub mod import;
pub mod modal;
pub mod models;
pub mod records;
pub mod render;
pub mod router;
pub mod sequence;
pub mod session;
pub mod settings;
pub mod store;
pub mod surface;
pub mod tables;
pub mod toast;

pub use console::Console;
pub use error::{ConsoleError, ConsoleResult};
