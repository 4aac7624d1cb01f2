//! Command handlers
//!
//! The command set mirrors the serial protocol: motor control verbs, a
//! settings key registry for `get`/`set`/`list`, error-log access and input
//! injection. Every command's output ends with a newline; every failure is a
//! single line.

use core::fmt::Write;

use super::error::CliError;
use super::parser::{parse_line, ParsedCommand};
use crate::config::{GlobalConfig, RampCurve, SpeedSlot};
use crate::errors::ErrorHandler;
use crate::input::InputDecoder;
use crate::motor::{MotorController, RelayIo};
use crate::storage::{Storage, StorageBackend};

/// Everything a command may touch. Borrowed from the owning `App` for the
/// duration of one line.
pub struct CliDeps<'c, 'e, B: StorageBackend> {
    pub controller: &'c mut MotorController<'e>,
    pub config: &'c mut GlobalConfig,
    pub storage: &'c mut Storage<B>,
    pub errors: &'c ErrorHandler,
    pub input: &'c mut InputDecoder,
    pub relays: &'c mut dyn RelayIo,
    pub now_ms: u32,
}

/// Mutable view the settings key registry operates on. Non-generic so the
/// key table can be plain fn pointers.
pub struct SettingsView<'a> {
    pub config: &'a mut GlobalConfig,
    pub pitch_percent: f32,
    pub pitch_changed: bool,
    /// Set when a change must be pushed to the synthesis path.
    pub profile_changed: bool,
}

pub struct SettingKey {
    pub name: &'static str,
    pub get: fn(&SettingsView<'_>, &mut dyn Write),
    pub set: fn(&mut SettingsView<'_>, &str) -> Result<(), CliError>,
}

/// `get`/`set`/`list` registry.
pub static SETTING_KEYS: &[SettingKey] = &[
    SettingKey {
        name: "brightness",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.display_brightness);
        },
        set: |v, s| {
            v.config.display_brightness = parse_u8(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "ramp",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.ramp_curve as u8);
        },
        set: |v, s| {
            v.config.ramp_curve = RampCurve::from_u8(parse_u8(s)?);
            Ok(())
        },
    },
    SettingKey {
        name: "pitch_step",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.pitch_step);
        },
        set: |v, s| {
            v.config.pitch_step = parse_f32(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "rev_enc",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.reverse_encoder as u8);
        },
        set: |v, s| {
            v.config.reverse_encoder = parse_bool(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "saver_mode",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.screensaver_mode);
        },
        set: |v, s| {
            v.config.screensaver_mode = parse_u8(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "freq",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().frequency);
        },
        set: |v, s| {
            v.config.current_profile_mut().frequency = parse_f32(s)?;
            v.profile_changed = true;
            Ok(())
        },
    },
    SettingKey {
        name: "phase1",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().phase_offsets[0]);
        },
        set: |v, s| set_phase(v, 0, s),
    },
    SettingKey {
        name: "phase2",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().phase_offsets[1]);
        },
        set: |v, s| set_phase(v, 1, s),
    },
    SettingKey {
        name: "phase3",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().phase_offsets[2]);
        },
        set: |v, s| set_phase(v, 2, s),
    },
    SettingKey {
        name: "phase4",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().phase_offsets[3]);
        },
        set: |v, s| set_phase(v, 3, s),
    },
    SettingKey {
        name: "soft_start",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().soft_start_secs);
        },
        set: |v, s| {
            v.config.current_profile_mut().soft_start_secs = parse_f32(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "kick",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().kick_multiplier);
        },
        set: |v, s| {
            v.config.current_profile_mut().kick_multiplier = parse_u8(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "kick_dur",
        get: |v, out| {
            let _ = write!(out, "{}", v.config.current_profile().kick_hold_secs);
        },
        set: |v, s| {
            v.config.current_profile_mut().kick_hold_secs = parse_u8(s)?;
            Ok(())
        },
    },
    SettingKey {
        name: "pitch",
        get: |v, out| {
            let _ = write!(out, "{}", v.pitch_percent);
        },
        set: |v, s| {
            v.pitch_percent = parse_f32(s)?;
            v.pitch_changed = true;
            Ok(())
        },
    },
];

fn set_phase(v: &mut SettingsView<'_>, index: usize, s: &str) -> Result<(), CliError> {
    v.config.current_profile_mut().phase_offsets[index] = parse_f32(s)?;
    v.profile_changed = true;
    Ok(())
}

fn parse_u8(s: &str) -> Result<u8, CliError> {
    s.parse().map_err(|_| CliError::InvalidValue)
}

fn parse_f32(s: &str) -> Result<f32, CliError> {
    s.parse().map_err(|_| CliError::InvalidValue)
}

fn parse_bool(s: &str) -> Result<bool, CliError> {
    match s {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(CliError::InvalidValue),
    }
}

/// Handle one input line. Failures print their single-line message.
pub fn execute<B: StorageBackend>(
    line: &str,
    deps: &mut CliDeps<'_, '_, B>,
    out: &mut dyn Write,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let cmd = parse_line(line);
    if let Err(e) = dispatch(&cmd, deps, out) {
        let _ = writeln!(out, "{}", e.message());
    }
}

fn dispatch<B: StorageBackend>(
    cmd: &ParsedCommand<'_>,
    deps: &mut CliDeps<'_, '_, B>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match cmd.command {
        "start" => {
            deps.controller.start(deps.config, deps.relays, deps.now_ms);
            let _ = writeln!(out, "Motor Started");
            Ok(())
        }
        "stop" => {
            deps.controller.stop(deps.config, deps.now_ms);
            let _ = writeln!(out, "Motor Stopped");
            Ok(())
        }
        "speed" => {
            let index: u8 = cmd
                .arg(0)
                .and_then(|s| s.parse().ok())
                .ok_or(CliError::InvalidSpeedIndex)?;
            let slot = SpeedSlot::from_index(index).ok_or(CliError::InvalidSpeedIndex)?;
            deps.controller.set_speed(deps.config, deps.now_ms, slot);
            let _ = writeln!(out, "Speed set to index {}", index);
            Ok(())
        }
        "s" => {
            deps.controller.cycle_speed(deps.config, deps.now_ms);
            let _ = writeln!(out, "Speed Cycled");
            Ok(())
        }
        "t" => {
            deps.controller
                .toggle_standby(deps.config, deps.relays, deps.now_ms);
            let _ = writeln!(out, "Standby Toggled");
            Ok(())
        }
        "p" => {
            deps.controller.reset_pitch();
            let _ = writeln!(out, "Pitch Reset");
            Ok(())
        }
        "status" | "i" => {
            print_status(deps, out);
            Ok(())
        }
        "list" => {
            let _ = writeln!(out, "--- Settings List ---");
            let view = SettingsView {
                config: &mut *deps.config,
                pitch_percent: deps.controller.pitch_percent(),
                pitch_changed: false,
                profile_changed: false,
            };
            for key in SETTING_KEYS {
                let _ = write!(out, "{} = ", key.name);
                (key.get)(&view, out);
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "---------------------");
            Ok(())
        }
        "get" => {
            let name = cmd.arg(0).ok_or(CliError::UnknownKey)?;
            let key = find_key(name)?;
            let view = SettingsView {
                config: &mut *deps.config,
                pitch_percent: deps.controller.pitch_percent(),
                pitch_changed: false,
                profile_changed: false,
            };
            (key.get)(&view, out);
            let _ = writeln!(out);
            Ok(())
        }
        "set" => {
            let name = cmd.arg(0).ok_or(CliError::SetUsage)?;
            let value = cmd.arg(1).ok_or(CliError::SetUsage)?;
            let key = find_key(name)?;

            let mut view = SettingsView {
                config: &mut *deps.config,
                pitch_percent: deps.controller.pitch_percent(),
                pitch_changed: false,
                profile_changed: false,
            };
            (key.set)(&mut view, value)?;

            let pitch = view.pitch_percent;
            let pitch_changed = view.pitch_changed;
            let profile_changed = view.profile_changed;

            deps.config.validate();
            if pitch_changed {
                deps.controller.set_pitch(pitch);
            }
            if profile_changed {
                deps.controller.apply_profile(deps.config);
            }

            let _ = writeln!(out, "Set {} = {}", name, value);
            Ok(())
        }
        "error" => match cmd.arg(0) {
            Some("dump") => {
                dump_error_log(deps, out);
                Ok(())
            }
            Some("clear") => {
                deps.storage.clear_error_log();
                let _ = writeln!(out, "Error Log Cleared");
                Ok(())
            }
            _ => Err(CliError::UnknownCommand),
        },
        "f" => {
            let _ = writeln!(out, "Factory Resetting...");
            deps.storage.reset_all();
            *deps.config = GlobalConfig::default();
            deps.config.validate();
            deps.controller.apply_profile(deps.config);
            let _ = deps.storage.save_config(deps.config);
            Ok(())
        }
        "help" => {
            print_help(out);
            Ok(())
        }
        // Input injection for testing without hardware.
        "j" => {
            deps.input.inject_delta(-1);
            Ok(())
        }
        "l" => {
            deps.input.inject_delta(1);
            Ok(())
        }
        "k" => {
            deps.input.inject_click();
            Ok(())
        }
        _ => Err(CliError::UnknownCommand),
    }
}

fn find_key(name: &str) -> Result<&'static SettingKey, CliError> {
    SETTING_KEYS
        .iter()
        .find(|k| k.name == name)
        .ok_or(CliError::UnknownKey)
}

fn print_status<B: StorageBackend>(deps: &mut CliDeps<'_, '_, B>, out: &mut dyn Write) {
    let _ = writeln!(out, "--- TT Control Status ---");
    let _ = writeln!(out, "State: {}", deps.controller.state().label());
    let _ = writeln!(out, "Speed Mode: {}", deps.config.current_speed.label());
    let _ = writeln!(out, "Frequency: {} Hz", deps.controller.current_frequency());
    let _ = writeln!(out, "Pitch: {}%", deps.controller.pitch_percent());
    if deps.errors.has_critical_error() {
        let _ = writeln!(out, "Critical error latched");
    }
    let _ = writeln!(out, "-------------------------");
}

fn dump_error_log<B: StorageBackend>(deps: &mut CliDeps<'_, '_, B>, out: &mut dyn Write) {
    let mut buf = [0u8; 12 * 1024];
    let len = deps.storage.read_error_log(&mut buf);
    if len == 0 {
        let _ = writeln!(out, "No log file.");
        return;
    }
    if let Ok(text) = core::str::from_utf8(&buf[..len]) {
        let _ = out.write_str(text);
    }
}

fn print_help(out: &mut dyn Write) {
    let _ = writeln!(out, "Available Commands:");
    let _ = writeln!(out, "start, stop, t (standby)");
    let _ = writeln!(out, "speed <0-2>, s (cycle)");
    let _ = writeln!(out, "status, p (reset pitch)");
    let _ = writeln!(out, "list - List all settings");
    let _ = writeln!(out, "set <key> <val> - Set setting");
    let _ = writeln!(out, "get <key> - Get setting");
    let _ = writeln!(out, "error dump, error clear");
    let _ = writeln!(out, "f - Factory Reset");
}
