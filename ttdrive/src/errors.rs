//! Centralised error reporting.
//!
//! A report carries `(kind, message, critical)`. Policy:
//! - every report is appended to the persistent error log;
//! - the UI is asked to show the message for the configured duration,
//!   clamped to at least 10 s for critical reports;
//! - a critical report latches the sticky `has_critical_error` flag and
//!   demands an immediate relay mute, regardless of motor state. The state
//!   machine itself is left alone; recovery is user-initiated.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::GlobalConfig;
use crate::storage::{Storage, StorageBackend};

/// Minimum on-screen time for a critical error.
pub const CRITICAL_DISPLAY_MS: u32 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    SystemFreeze = 1,
    MotorStall = 2,
    SettingsCorrupt = 3,
    I2cFailure = 4,
    OutOfMemory = 5,
}

impl ErrorKind {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::SystemFreeze => "system freeze",
            ErrorKind::MotorStall => "motor stall",
            ErrorKind::SettingsCorrupt => "settings corrupt",
            ErrorKind::I2cFailure => "I2C failure",
            ErrorKind::OutOfMemory => "out of memory",
        }
    }
}

/// What the caller must do with a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorOutcome {
    /// How long the UI should show the message; 0 = do not display.
    pub display_ms: u32,
    /// Drive every mute relay to the muted level now.
    pub mute_required: bool,
}

pub struct ErrorHandler {
    critical: AtomicBool,
}

impl ErrorHandler {
    pub const fn new() -> Self {
        Self {
            critical: AtomicBool::new(false),
        }
    }

    /// Record a report and decide its consequences. Log failures are
    /// swallowed — reporting must never make things worse.
    pub fn report<B: StorageBackend>(
        &self,
        storage: &mut Storage<B>,
        config: &GlobalConfig,
        now_ms: u32,
        kind: ErrorKind,
        message: &str,
        critical: bool,
    ) -> ErrorOutcome {
        if critical {
            self.critical.store(true, Ordering::Release);
        }

        let _ = storage.append_error(now_ms, kind.code(), message);

        let mut display_ms = if config.error_display_enabled {
            config.error_display_secs as u32 * 1000
        } else {
            0
        };
        if critical && display_ms < CRITICAL_DISPLAY_MS {
            display_ms = CRITICAL_DISPLAY_MS;
        }

        ErrorOutcome {
            display_ms,
            mute_required: critical,
        }
    }

    /// Sticky since-boot flag; set by the first critical report.
    pub fn has_critical_error(&self) -> bool {
        self.critical.load(Ordering::Acquire)
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}
