//! Serial console for motor control, configuration and diagnostics
//!
//! Newline-terminated protocol over `core::fmt::Write`; the firmware wires
//! it to a UART, tests drive it with string buffers. Zero heap allocation.

pub mod commands;
pub mod error;
pub mod parser;

pub use commands::{execute, CliDeps, SettingKey, SettingsView, SETTING_KEYS};
pub use error::CliError;
pub use parser::{parse_line, ParsedCommand};
