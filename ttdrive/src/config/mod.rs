//! Configuration model: per-speed profiles, global settings, validation.
//!
//! Out-of-range configuration is never an error. [`GlobalConfig::validate`]
//! clamps every field into its documented range (swapping inverted bounds,
//! wrapping phase offsets into [0, 360)) and the system continues.

pub mod codec;

/// Number of named preset slots.
pub const PRESET_SLOTS: usize = 5;

/// Preset name capacity: 16 characters + NUL.
pub const PRESET_NAME_LEN: usize = 17;

/// Nominal speed slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SpeedSlot {
    Rpm33 = 0,
    Rpm45 = 1,
    Rpm78 = 2,
}

impl SpeedSlot {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SpeedSlot::Rpm33),
            1 => Some(SpeedSlot::Rpm45),
            2 => Some(SpeedSlot::Rpm78),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            SpeedSlot::Rpm33 => "33 RPM",
            SpeedSlot::Rpm45 => "45 RPM",
            SpeedSlot::Rpm78 => "78 RPM",
        }
    }
}

/// Digital filter selection for the synthesis path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterKind {
    None = 0,
    Iir = 1,
    Fir = 2,
}

impl FilterKind {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FilterKind::Iir,
            2 => FilterKind::Fir,
            _ => FilterKind::None,
        }
    }
}

/// FIR stopband aggressiveness profiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FirProfile {
    Gentle = 0,
    Medium = 1,
    Aggressive = 2,
}

impl FirProfile {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => FirProfile::Gentle,
            2 => FirProfile::Aggressive,
            _ => FirProfile::Medium,
        }
    }
}

/// Braking strategy for the Stopping state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BrakeMode {
    /// Amplitude ramp to zero, frequency unchanged.
    Off = 0,
    /// Pulsed reverse torque.
    Pulse = 1,
    /// Linear frequency ramp down with simultaneous amplitude ramp.
    Ramp = 2,
}

impl BrakeMode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BrakeMode::Pulse,
            2 => BrakeMode::Ramp,
            _ => BrakeMode::Off,
        }
    }
}

/// Soft-start amplitude curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RampCurve {
    Linear = 0,
    SCurve = 1,
}

impl RampCurve {
    pub fn from_u8(value: u8) -> Self {
        if value == 1 {
            RampCurve::SCurve
        } else {
            RampCurve::Linear
        }
    }
}

/// Which speed to select at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BootSpeed {
    Rpm33 = 0,
    Rpm45 = 1,
    Rpm78 = 2,
    LastUsed = 3,
}

impl BootSpeed {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => BootSpeed::Rpm33,
            1 => BootSpeed::Rpm45,
            2 => BootSpeed::Rpm78,
            _ => BootSpeed::LastUsed,
        }
    }
}

/// Settings specific to a single nominal speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedProfile {
    /// Nominal drive frequency in Hz.
    pub frequency: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,

    /// Phase offsets in degrees; index 0 is the reference and stays 0.
    pub phase_offsets: [f32; 4],

    /// Soft-start amplitude ramp duration in seconds (0–10).
    pub soft_start_secs: f32,
    /// Post-start amplitude reduction target, percent of full (50–100).
    pub reduced_amplitude_pct: u8,
    /// Delay before the reduction applies, seconds since Running (0–60).
    pub reduced_amplitude_delay_secs: u8,
    /// Startup kick frequency multiplier (1 = no kick, up to 4).
    pub kick_multiplier: u8,
    /// How long the kick frequency is held, seconds (0–15).
    pub kick_hold_secs: u8,
    /// Ramp-down from kick frequency to target, seconds (0–15).
    pub kick_ramp_secs: f32,

    pub filter: FilterKind,
    /// IIR smoothing factor, [0.01, 0.99].
    pub iir_alpha: f32,
    pub fir_profile: FirProfile,
}

impl SpeedProfile {
    fn with_frequency(frequency: f32, min: f32, max: f32, soft_start: f32, reduced: u8) -> Self {
        Self {
            frequency,
            min_frequency: min,
            max_frequency: max,
            phase_offsets: [0.0, 90.0, 120.0, 240.0],
            soft_start_secs: soft_start,
            reduced_amplitude_pct: reduced,
            reduced_amplitude_delay_secs: 5,
            kick_multiplier: 1,
            kick_hold_secs: 1,
            kick_ramp_secs: 1.0,
            filter: FilterKind::None,
            iir_alpha: 0.5,
            fir_profile: FirProfile::Medium,
        }
    }
}

/// The complete persisted configuration.
///
/// Display and screensaver fields are carried for the UI collaborator; the
/// core only persists and exposes them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalConfig {
    /// Active phase count, 1–4. Channels at or above this index stay silent.
    pub phase_mode: u8,
    /// Amplitude ceiling, percent (0–100).
    pub max_amplitude_pct: u8,
    pub smooth_switching: bool,
    /// Smooth speed-switch ramp duration, seconds (1–5).
    pub switch_ramp_secs: u8,

    pub brake_mode: BrakeMode,
    pub brake_duration_secs: f32,
    pub brake_pulse_gap_secs: f32,
    pub brake_start_freq: f32,
    pub brake_stop_freq: f32,

    pub relay_active_high: bool,
    pub mute_link_standby: bool,
    pub mute_link_start_stop: bool,
    /// Forced-mute grace period from boot, seconds.
    pub power_on_relay_delay_secs: u8,

    pub display_brightness: u8,
    pub display_sleep_delay: u8,
    pub screensaver_enabled: bool,
    pub screensaver_mode: u8,
    pub auto_dim_mins: u8,
    pub show_runtime: bool,
    pub error_display_enabled: bool,
    pub error_display_secs: u8,

    pub auto_standby_mins: u8,
    pub auto_start: bool,
    pub auto_boot: bool,
    pub pitch_reset_on_stop: bool,

    pub reverse_encoder: bool,
    /// Pitch encoder step, percent per detent (0.01–1.0).
    pub pitch_step: f32,
    pub ramp_curve: RampCurve,

    pub enable_78rpm: bool,
    /// Frequency-dependent amplitude percentage; 0 disables FDA.
    pub fda_pct: u8,
    pub boot_speed: BootSpeed,
    pub current_speed: SpeedSlot,

    pub total_runtime_secs: u32,

    pub speeds: [SpeedProfile; 3],
    pub preset_names: [[u8; PRESET_NAME_LEN]; PRESET_SLOTS],
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let mut preset_names = [[0u8; PRESET_NAME_LEN]; PRESET_SLOTS];
        for (i, name) in preset_names.iter_mut().enumerate() {
            *name = default_preset_name(i);
        }

        Self {
            phase_mode: 3,
            max_amplitude_pct: 100,
            smooth_switching: true,
            switch_ramp_secs: 2,

            brake_mode: BrakeMode::Ramp,
            brake_duration_secs: 2.0,
            brake_pulse_gap_secs: 0.5,
            brake_start_freq: 50.0,
            brake_stop_freq: 0.0,

            relay_active_high: true,
            mute_link_standby: true,
            mute_link_start_stop: true,
            power_on_relay_delay_secs: 2,

            display_brightness: 255,
            display_sleep_delay: 0,
            screensaver_enabled: true,
            screensaver_mode: 0,
            auto_dim_mins: 0,
            show_runtime: true,
            error_display_enabled: true,
            error_display_secs: 10,

            auto_standby_mins: 0,
            auto_start: false,
            auto_boot: false,
            pitch_reset_on_stop: true,

            reverse_encoder: false,
            pitch_step: 0.1,
            ramp_curve: RampCurve::SCurve,

            enable_78rpm: true,
            fda_pct: 0,
            boot_speed: BootSpeed::LastUsed,
            current_speed: SpeedSlot::Rpm33,

            total_runtime_secs: 0,

            speeds: [
                SpeedProfile::with_frequency(50.0, 40.0, 60.0, 1.0, 80),
                SpeedProfile::with_frequency(67.5, 57.5, 77.5, 1.0, 80),
                SpeedProfile::with_frequency(113.5, 100.0, 130.0, 1.5, 90),
            ],
            preset_names,
        }
    }
}

impl GlobalConfig {
    /// Profile for the currently selected speed.
    pub fn current_profile(&self) -> &SpeedProfile {
        &self.speeds[self.current_speed.index()]
    }

    pub fn current_profile_mut(&mut self) -> &mut SpeedProfile {
        &mut self.speeds[self.current_speed.index()]
    }

    /// Preset slot name as a str, up to the first NUL.
    pub fn preset_name(&self, slot: usize) -> &str {
        if slot >= PRESET_SLOTS {
            return "";
        }
        let raw = &self.preset_names[slot];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        core::str::from_utf8(&raw[..end]).unwrap_or("")
    }

    pub fn set_preset_name(&mut self, slot: usize, name: &str) {
        if slot >= PRESET_SLOTS {
            return;
        }
        let mut out = [0u8; PRESET_NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(PRESET_NAME_LEN - 1);
        out[..len].copy_from_slice(&bytes[..len]);
        self.preset_names[slot] = out;
    }

    /// Clamp every field into range. Inverted frequency bounds are swapped,
    /// phase offsets wrapped into [0, 360). Never fails.
    pub fn validate(&mut self) {
        self.phase_mode = self.phase_mode.clamp(1, 4);
        self.max_amplitude_pct = self.max_amplitude_pct.min(100);
        self.switch_ramp_secs = self.switch_ramp_secs.clamp(1, 5);
        self.fda_pct = self.fda_pct.min(100);
        self.pitch_step = finite_or(self.pitch_step, 0.1).clamp(0.01, 1.0);

        if !self.brake_duration_secs.is_finite() || self.brake_duration_secs < 0.0 {
            self.brake_duration_secs = 0.0;
        }
        if !self.brake_pulse_gap_secs.is_finite() || self.brake_pulse_gap_secs < 0.1 {
            self.brake_pulse_gap_secs = 0.1;
        }
        self.brake_start_freq = clamp_freq(self.brake_start_freq);
        if !self.brake_stop_freq.is_finite() || self.brake_stop_freq < 0.0 {
            self.brake_stop_freq = 0.0;
        }

        for speed in self.speeds.iter_mut() {
            speed.min_frequency = clamp_freq(speed.min_frequency);
            speed.max_frequency = clamp_freq(speed.max_frequency);
            if speed.min_frequency > speed.max_frequency {
                core::mem::swap(&mut speed.min_frequency, &mut speed.max_frequency);
            }
            speed.frequency =
                clamp_freq(speed.frequency).clamp(speed.min_frequency, speed.max_frequency);

            for offset in speed.phase_offsets.iter_mut() {
                *offset = wrap_degrees(*offset);
            }

            speed.soft_start_secs = finite_or(speed.soft_start_secs, 1.0).clamp(0.0, 10.0);
            speed.reduced_amplitude_pct = speed.reduced_amplitude_pct.clamp(50, 100);
            speed.reduced_amplitude_delay_secs = speed.reduced_amplitude_delay_secs.min(60);
            speed.kick_multiplier = speed.kick_multiplier.clamp(1, 4);
            speed.kick_hold_secs = speed.kick_hold_secs.min(15);
            speed.kick_ramp_secs = finite_or(speed.kick_ramp_secs, 0.0).clamp(0.0, 15.0);
            speed.iir_alpha = finite_or(speed.iir_alpha, 0.5).clamp(0.01, 0.99);
        }
    }
}

fn clamp_freq(hz: f32) -> f32 {
    finite_or(hz, 50.0).clamp(10.0, 3000.0)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Wrap a phase offset into [0, 360).
pub fn wrap_degrees(degrees: f32) -> f32 {
    let mut d = finite_or(degrees, 0.0) % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    d
}

/// Default name for a preset slot ("Preset 1".."Preset 5").
pub fn default_preset_name(slot: usize) -> [u8; PRESET_NAME_LEN] {
    let mut name = [0u8; PRESET_NAME_LEN];
    name[..7].copy_from_slice(b"Preset ");
    name[7] = b'1' + slot as u8;
    name
}
