//! Motor lifecycle state machine.
//!
//! Owns the Standby → Stopped → Starting → Running → Stopping cycle and
//! everything time-based around it: startup kick, soft-start amplitude ramps,
//! frequency-dependent amplitude, reduced amplitude, smooth speed switching,
//! braking and relay staggering. Pure logic — time arrives as `now_ms`,
//! relay levels leave through [`RelayIo`], and synthesis parameters leave
//! through the [`ParamExchange`]. The controller never blocks; a tick is a
//! bounded amount of arithmetic.

use crate::config::{BootSpeed, BrakeMode, GlobalConfig, RampCurve, SpeedProfile, SpeedSlot};
use crate::exchange::{DdsState, ParamExchange};
use crate::waveform::{degrees_to_phase, phase_increment};

/// Number of per-phase mute relays.
pub const MUTE_CHANNELS: usize = 4;

/// Stagger interval between successive relay activations.
pub const RELAY_STAGGER_MS: u32 = 100;

/// Settle time before a deferred settings save is flushed.
pub const DEFERRED_SAVE_MS: u32 = 2000;

/// Selectable pitch ranges, percent.
pub const PITCH_RANGES: [u8; 5] = [10, 20, 30, 40, 50];

/// Lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MotorState {
    /// Low power, outputs muted, waiting for a wake.
    Standby = 0,
    /// Powered, no rotation, waiting for start.
    Stopped = 1,
    /// Accelerating: kick and soft start.
    Starting = 2,
    /// Stable rotation.
    Running = 3,
    /// Decelerating: braking.
    Stopping = 4,
}

impl MotorState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => MotorState::Stopped,
            2 => MotorState::Starting,
            3 => MotorState::Running,
            4 => MotorState::Stopping,
            _ => MotorState::Standby,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MotorState::Standby => "STANDBY",
            MotorState::Stopped => "STOPPED",
            MotorState::Starting => "STARTING",
            MotorState::Running => "RUNNING",
            MotorState::Stopping => "STOPPING",
        }
    }
}

/// Raw relay pin writes. Polarity is the controller's concern; `level` is the
/// electrical level to drive.
pub trait RelayIo {
    fn write_mute(&mut self, channel: usize, level: bool);
    fn write_standby(&mut self, level: bool);
}

pub struct MotorController<'a> {
    exchange: &'a ParamExchange,
    state: MotorState,

    pitch_percent: f32,
    pitch_range: u8,

    current_freq: f32,
    target_freq: f32,
    current_amp: f32,
    target_amp: f32,

    // Shadow of the next DDS state; published whole at buffer-boundary pace.
    dds: DdsState,
    dds_dirty: bool,

    state_started_ms: u32,

    // Startup kick
    kicking: bool,
    kick_ramping: bool,
    kick_ramp_start_ms: u32,
    kick_ramp_from: f32,

    // Reduced amplitude
    reduced_amp_applied: bool,
    amp_reduction_epoch_ms: u32,

    // Smooth speed switching
    speed_ramping: bool,
    ramp_from: f32,
    ramp_to: f32,
    ramp_start_ms: u32,
    ramp_secs: f32,

    // Pulse braking
    brake_pulse_on: bool,
    brake_last_toggle_ms: u32,

    // Relay staircase
    relays_active: bool,
    relay_stage: u8,
    relay_stage_ms: u32,
    power_on_grace: bool,
    boot_ms: u32,

    // Runtime counters
    session_runtime_secs: u32,
    last_runtime_tick_ms: u32,

    // Deferred settings save
    settings_dirty: bool,
    settings_dirty_ms: u32,
}

impl<'a> MotorController<'a> {
    /// Construct at boot. Applies the boot-speed policy to `config` and
    /// stages the (still silent) synthesis parameters for the selected speed.
    pub fn new(exchange: &'a ParamExchange, config: &mut GlobalConfig, now_ms: u32) -> Self {
        config.current_speed = match config.boot_speed {
            BootSpeed::Rpm33 => SpeedSlot::Rpm33,
            BootSpeed::Rpm45 => SpeedSlot::Rpm45,
            BootSpeed::Rpm78 => SpeedSlot::Rpm78,
            BootSpeed::LastUsed => config.current_speed,
        };

        let state = if config.auto_boot {
            MotorState::Stopped
        } else {
            MotorState::Standby
        };

        let mut controller = Self {
            exchange,
            state,
            pitch_percent: 0.0,
            pitch_range: PITCH_RANGES[0],
            current_freq: 0.0,
            target_freq: 0.0,
            current_amp: 0.0,
            target_amp: 0.0,
            dds: DdsState::SILENT,
            dds_dirty: false,
            state_started_ms: now_ms,
            kicking: false,
            kick_ramping: false,
            kick_ramp_start_ms: 0,
            kick_ramp_from: 0.0,
            reduced_amp_applied: false,
            amp_reduction_epoch_ms: now_ms,
            speed_ramping: false,
            ramp_from: 0.0,
            ramp_to: 0.0,
            ramp_start_ms: 0,
            ramp_secs: 0.0,
            brake_pulse_on: false,
            brake_last_toggle_ms: 0,
            relays_active: false,
            relay_stage: 0,
            relay_stage_ms: 0,
            power_on_grace: true,
            boot_ms: now_ms,
            session_runtime_secs: 0,
            last_runtime_tick_ms: now_ms,
            settings_dirty: false,
            settings_dirty_ms: 0,
        };

        controller.apply_profile(config);
        controller
    }

    // --- Accessors ---

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, MotorState::Running | MotorState::Starting)
    }

    pub fn is_standby(&self) -> bool {
        self.state == MotorState::Standby
    }

    /// Logical drive frequency (always positive, pitch applied).
    pub fn current_frequency(&self) -> f32 {
        self.current_freq
    }

    pub fn pitch_percent(&self) -> f32 {
        self.pitch_percent
    }

    pub fn pitch_range(&self) -> u8 {
        self.pitch_range
    }

    pub fn session_runtime_secs(&self) -> u32 {
        self.session_runtime_secs
    }

    // --- Main tick ---

    /// Advance the state machine. Call frequently (every few ms) from the
    /// control loop; the watchdog rides on this cadence.
    pub fn update(&mut self, config: &mut GlobalConfig, relays: &mut dyn RelayIo, now_ms: u32) {
        match self.state {
            MotorState::Standby | MotorState::Stopped => {}
            MotorState::Starting => self.update_starting(config, now_ms),
            MotorState::Running => self.update_running(config, now_ms),
            MotorState::Stopping => self.update_stopping(config, relays, now_ms),
        }

        self.update_relay_stagger(config, relays, now_ms);
        self.flush();
    }

    fn update_starting(&mut self, config: &GlobalConfig, now_ms: u32) {
        let profile = *config.current_profile();

        self.update_kick(&profile, now_ms);
        if !self.kicking && !self.kick_ramping && self.dds.frequency_hz != self.target_freq {
            self.set_wave_frequency(self.target_freq);
        }

        // Soft-start amplitude ramp. Zero duration completes on the first
        // tick after start().
        let duration = profile.soft_start_secs * 1000.0;
        let elapsed = now_ms.wrapping_sub(self.state_started_ms) as f32;
        if elapsed >= duration {
            self.state = MotorState::Running;
            self.current_amp = self.target_amp;
            self.amp_reduction_epoch_ms = now_ms;
            self.last_runtime_tick_ms = now_ms;
        } else {
            self.current_amp = self.soft_start_amp(config, elapsed, duration);
        }

        // Frequency-dependent amplitude: scale the ramped amplitude so the
        // output tracks V/f while the frequency is below target. The factor
        // is r + (1-r)*q with q = clamp(f/target, 0, 1); FDA=0 gives 1.
        if config.fda_pct > 0 {
            let r = config.fda_pct as f32 / 100.0;
            let q = if self.target_freq > 0.1 {
                (self.dds.frequency_hz / self.target_freq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            self.current_amp *= r + (1.0 - r) * q;
        }

        self.set_wave_amplitude(self.current_amp);
    }

    fn update_running(&mut self, config: &mut GlobalConfig, now_ms: u32) {
        let profile = *config.current_profile();

        // A kick ramp longer than the soft start finishes here.
        self.update_kick(&profile, now_ms);

        // Pitch tracking. The kick ramp and the smooth-switch ramp own the
        // frequency while they are active.
        self.target_freq = self.pitched_target(&profile);
        if !self.speed_ramping
            && !self.kicking
            && !self.kick_ramping
            && self.current_freq != self.target_freq
        {
            self.current_freq = self.target_freq;
            self.set_wave_frequency(self.current_freq);
        }

        // One-shot amplitude reduction, latched until the next start.
        if !self.reduced_amp_applied {
            let delay_ms = profile.reduced_amplitude_delay_secs as u32 * 1000;
            if now_ms.wrapping_sub(self.amp_reduction_epoch_ms) >= delay_ms {
                self.reduced_amp_applied = true;
                self.current_amp = self.target_amp * profile.reduced_amplitude_pct as f32 / 100.0;
                self.set_wave_amplitude(self.current_amp);
            }
        }

        if self.speed_ramping {
            let duration = self.ramp_secs * 1000.0;
            let elapsed = now_ms.wrapping_sub(self.ramp_start_ms) as f32;
            if elapsed >= duration {
                self.speed_ramping = false;
                self.current_freq = self.ramp_to;
            } else {
                let t = elapsed / duration;
                self.current_freq = self.ramp_from + (self.ramp_to - self.ramp_from) * t;
            }
            self.set_wave_frequency(self.current_freq);
        }

        self.advance_runtime(config, now_ms);
    }

    /// Kick hold expiry and the linear ramp back down to target. Runs in
    /// Starting, and still in Running when the ramp outlives the soft start.
    fn update_kick(&mut self, profile: &SpeedProfile, now_ms: u32) {
        if self.kicking {
            let hold_ms = profile.kick_hold_secs as u32 * 1000;
            if now_ms.wrapping_sub(self.state_started_ms) >= hold_ms {
                self.kicking = false;
                if profile.kick_ramp_secs > 0.0 {
                    self.kick_ramping = true;
                    self.kick_ramp_start_ms = now_ms;
                    self.kick_ramp_from = self.dds.frequency_hz;
                } else {
                    self.set_wave_frequency(self.target_freq);
                }
            }
        }

        if self.kick_ramping {
            let duration = profile.kick_ramp_secs * 1000.0;
            let elapsed = now_ms.wrapping_sub(self.kick_ramp_start_ms) as f32;
            if elapsed >= duration {
                self.kick_ramping = false;
                self.set_wave_frequency(self.target_freq);
            } else {
                let t = elapsed / duration;
                let f = self.kick_ramp_from - (self.kick_ramp_from - self.target_freq) * t;
                self.set_wave_frequency(f);
            }
        }
    }

    fn update_stopping(&mut self, config: &GlobalConfig, relays: &mut dyn RelayIo, now_ms: u32) {
        let duration = config.brake_duration_secs * 1000.0;
        let elapsed = now_ms.wrapping_sub(self.state_started_ms) as f32;

        if elapsed >= duration {
            self.state = MotorState::Stopped;
            self.current_amp = 0.0;
            self.set_wave_amplitude(0.0);
            self.set_wave_enabled(false);
            if config.mute_link_start_stop {
                self.set_relays(config, relays, false, now_ms);
            }
            // Undo any pulse-brake reversal.
            self.set_wave_frequency(libm::fabsf(self.target_freq));
            return;
        }

        match config.brake_mode {
            BrakeMode::Ramp => {
                let t = elapsed / duration;
                let f = config.brake_start_freq
                    - (config.brake_start_freq - config.brake_stop_freq) * t;
                self.set_wave_frequency(f);
                self.current_amp = self.target_amp * (1.0 - t);
                self.set_wave_amplitude(self.current_amp);
            }
            BrakeMode::Pulse => {
                let gap = config.brake_pulse_gap_secs * 1000.0;
                if now_ms.wrapping_sub(self.brake_last_toggle_ms) as f32 >= gap {
                    self.brake_last_toggle_ms = now_ms;
                    self.brake_pulse_on = !self.brake_pulse_on;
                    let amp = if self.brake_pulse_on { self.target_amp } else { 0.0 };
                    self.set_wave_amplitude(amp);
                }
            }
            BrakeMode::Off => {
                self.current_amp = self.target_amp * (1.0 - elapsed / duration);
                self.set_wave_amplitude(self.current_amp);
            }
        }
    }

    // --- Commands ---

    pub fn start(&mut self, config: &mut GlobalConfig, relays: &mut dyn RelayIo, now_ms: u32) {
        if matches!(self.state, MotorState::Running | MotorState::Starting) {
            return;
        }
        if self.state == MotorState::Standby {
            self.wake(config, relays, now_ms);
        }

        self.state = MotorState::Starting;
        self.state_started_ms = now_ms;

        self.apply_profile(config);
        self.target_amp = config.max_amplitude_pct as f32 / 100.0;
        self.current_amp = 0.0;
        self.reduced_amp_applied = false;
        self.kick_ramping = false;
        self.speed_ramping = false;

        let profile = *config.current_profile();
        if profile.kick_multiplier > 1 {
            self.kicking = true;
            self.set_wave_frequency(self.target_freq * profile.kick_multiplier as f32);
        } else {
            self.kicking = false;
            self.set_wave_frequency(self.target_freq);
        }

        if config.mute_link_start_stop {
            self.set_relays(config, relays, true, now_ms);
        }

        self.set_wave_enabled(true);
        self.set_wave_amplitude(0.0);
        self.flush();
    }

    pub fn stop(&mut self, config: &mut GlobalConfig, now_ms: u32) {
        if matches!(self.state, MotorState::Stopped | MotorState::Standby) {
            return;
        }

        self.state = MotorState::Stopping;
        self.state_started_ms = now_ms;
        self.kicking = false;
        self.kick_ramping = false;
        self.speed_ramping = false;

        match config.brake_mode {
            BrakeMode::Pulse => {
                self.brake_pulse_on = true;
                self.brake_last_toggle_ms = now_ms;
                // Reversed phase sequence applies braking torque.
                self.set_wave_frequency(-self.target_freq);
                self.set_wave_amplitude(self.target_amp);
            }
            BrakeMode::Ramp => {
                self.set_wave_frequency(config.brake_start_freq);
            }
            BrakeMode::Off => {}
        }

        if config.pitch_reset_on_stop {
            self.pitch_percent = 0.0;
        }
        self.flush();
    }

    pub fn toggle_start_stop(
        &mut self,
        config: &mut GlobalConfig,
        relays: &mut dyn RelayIo,
        now_ms: u32,
    ) {
        if self.is_running() {
            self.stop(config, now_ms);
        } else {
            self.start(config, relays, now_ms);
        }
    }

    pub fn toggle_standby(
        &mut self,
        config: &mut GlobalConfig,
        relays: &mut dyn RelayIo,
        now_ms: u32,
    ) {
        if self.state == MotorState::Standby {
            self.wake(config, relays, now_ms);
        } else {
            // Standby means muted output: cut the generator immediately
            // rather than running a brake cycle.
            self.state = MotorState::Standby;
            self.kicking = false;
            self.kick_ramping = false;
            self.speed_ramping = false;
            self.current_amp = 0.0;
            self.set_wave_amplitude(0.0);
            self.set_wave_enabled(false);
            if config.pitch_reset_on_stop {
                self.pitch_percent = 0.0;
            }
            if config.mute_link_standby {
                self.set_relays(config, relays, false, now_ms);
            }
            self.session_runtime_secs = 0;
            // Persist the accumulated total runtime.
            self.request_save_now(now_ms);
        }
        self.flush();
    }

    fn wake(&mut self, config: &GlobalConfig, relays: &mut dyn RelayIo, now_ms: u32) {
        self.state = MotorState::Stopped;
        // Unmute on wake only when the relays follow standby alone; if they
        // also follow start/stop they stay muted until the next start.
        if config.mute_link_standby && !config.mute_link_start_stop {
            self.set_relays(config, relays, true, now_ms);
        } else {
            self.set_relays(config, relays, false, now_ms);
        }
    }

    // --- Speed selection ---

    pub fn set_speed(&mut self, config: &mut GlobalConfig, now_ms: u32, slot: SpeedSlot) {
        if config.current_speed == slot {
            return;
        }

        let previous_freq = self.current_freq;
        config.current_speed = slot;

        let profile = *config.current_profile();
        let new_target = self.pitched_target(&profile);

        if self.state == MotorState::Running {
            self.apply_profile_params(config);
            if config.smooth_switching {
                self.speed_ramping = true;
                self.ramp_from = previous_freq;
                self.ramp_to = new_target;
                self.ramp_start_ms = now_ms;
                self.ramp_secs = config.switch_ramp_secs as f32;
                self.target_freq = new_target;
                self.set_wave_frequency(previous_freq);
            } else {
                self.target_freq = new_target;
                self.current_freq = new_target;
                self.set_wave_frequency(new_target);
            }
        } else {
            self.apply_profile(config);
        }

        self.request_deferred_save(now_ms);
        self.flush();
    }

    /// Cycle 33 → 45 → 78 → 33, skipping 78 when disabled.
    pub fn cycle_speed(&mut self, config: &mut GlobalConfig, now_ms: u32) {
        let mut next = config.current_speed.index() + 1;
        if next > SpeedSlot::Rpm78.index() {
            next = 0;
        }
        if next == SpeedSlot::Rpm78.index() && !config.enable_78rpm {
            next = 0;
        }
        if let Some(slot) = SpeedSlot::from_index(next as u8) {
            self.set_speed(config, now_ms, slot);
        }
    }

    /// Step the speed selection up or down, clamped; 78 falls back to 45
    /// when disabled.
    pub fn adjust_speed(&mut self, config: &mut GlobalConfig, now_ms: u32, delta: i32) {
        let mut next = (config.current_speed.index() as i32 + delta)
            .clamp(0, SpeedSlot::Rpm78.index() as i32) as usize;
        if next == SpeedSlot::Rpm78.index() && !config.enable_78rpm {
            next = SpeedSlot::Rpm45.index();
        }
        if let Some(slot) = SpeedSlot::from_index(next as u8) {
            self.set_speed(config, now_ms, slot);
        }
    }

    // --- Pitch ---

    pub fn set_pitch(&mut self, percent: f32) {
        let range = self.pitch_range as f32;
        self.pitch_percent = percent.clamp(-range, range);
    }

    pub fn reset_pitch(&mut self) {
        self.pitch_percent = 0.0;
    }

    /// Nudge the pitch by a frequency delta (pitch encoder path).
    pub fn adjust_pitch_hz(&mut self, config: &GlobalConfig, delta_hz: f32) {
        let base = config.current_profile().frequency;
        if base <= 0.0 {
            return;
        }
        let range = self.pitch_range as f32;
        let max_hz = base * range / 100.0;
        let pitched = (base * self.pitch_percent / 100.0 + delta_hz).clamp(-max_hz, max_hz);
        self.pitch_percent = pitched / base * 100.0;
    }

    /// Cycle the pitch range 10 → 20 → 30 → 40 → 50 → 10 %.
    pub fn cycle_pitch_range(&mut self) {
        let next = self.pitch_range + 10;
        self.pitch_range = if next > PITCH_RANGES[PITCH_RANGES.len() - 1] {
            PITCH_RANGES[0]
        } else {
            next
        };
        self.set_pitch(self.pitch_percent);
    }

    // --- Relays ---

    /// Drive every mute relay to the muted level immediately. Used by the
    /// critical-error path; the state machine is left where it is.
    pub fn emergency_mute(&mut self, config: &GlobalConfig, relays: &mut dyn RelayIo) {
        self.relays_active = false;
        self.relay_stage = 0;
        for ch in 0..MUTE_CHANNELS {
            relays.write_mute(ch, !config.relay_active_high);
        }
    }

    fn set_relays(
        &mut self,
        config: &GlobalConfig,
        relays: &mut dyn RelayIo,
        requested: bool,
        now_ms: u32,
    ) {
        let mut active = requested;

        // Power-on grace: nothing unmutes until the delay has passed.
        if self.power_on_grace {
            let delay_ms = config.power_on_relay_delay_secs as u32 * 1000;
            if now_ms.wrapping_sub(self.boot_ms) < delay_ms {
                active = false;
            } else {
                self.power_on_grace = false;
            }
        }

        if active {
            // Staggered unmute; stages advance in update().
            self.relays_active = true;
            self.relay_stage = 0;
            self.relay_stage_ms = now_ms;
        } else {
            self.relays_active = false;
            self.relay_stage = 0;
            for ch in 0..MUTE_CHANNELS {
                relays.write_mute(ch, !config.relay_active_high);
            }
        }

        if config.mute_link_standby && active {
            relays.write_standby(config.relay_active_high);
        }
    }

    fn update_relay_stagger(
        &mut self,
        config: &GlobalConfig,
        relays: &mut dyn RelayIo,
        now_ms: u32,
    ) {
        let stages = config.phase_mode.min(MUTE_CHANNELS as u8);
        if self.relays_active
            && self.relay_stage < stages
            && now_ms.wrapping_sub(self.relay_stage_ms) > RELAY_STAGGER_MS
        {
            self.relay_stage_ms = now_ms;
            let channel = self.relay_stage as usize;
            self.relay_stage += 1;
            relays.write_mute(channel, config.relay_active_high);
        }
    }

    // --- Settings application ---

    /// Re-stage frequency, offsets and filter for the current speed. Called
    /// after profile edits (CLI/menu) and on speed changes.
    pub fn apply_profile(&mut self, config: &GlobalConfig) {
        let profile = *config.current_profile();
        self.target_freq = self.pitched_target(&profile);
        self.current_freq = self.target_freq;
        self.apply_profile_params(config);
        self.set_wave_frequency(self.current_freq);
        self.flush();
    }

    fn apply_profile_params(&mut self, config: &GlobalConfig) {
        let profile = config.current_profile();
        for (i, deg) in profile.phase_offsets.iter().enumerate() {
            self.dds.phase_offsets[i] = degrees_to_phase(*deg);
        }
        self.dds.channels = config.phase_mode;
        self.dds.filter = profile.filter;
        self.dds.iir_alpha = profile.iir_alpha;
        self.dds.fir_profile = profile.fir_profile;
        self.dds_dirty = true;
    }

    // --- Deferred persistence ---

    fn request_deferred_save(&mut self, now_ms: u32) {
        self.settings_dirty = true;
        self.settings_dirty_ms = now_ms;
    }

    fn request_save_now(&mut self, now_ms: u32) {
        self.settings_dirty = true;
        self.settings_dirty_ms = now_ms.wrapping_sub(DEFERRED_SAVE_MS);
    }

    /// True once per pending save after the settle time; the caller persists
    /// the config.
    pub fn take_deferred_save(&mut self, now_ms: u32) -> bool {
        if self.settings_dirty
            && now_ms.wrapping_sub(self.settings_dirty_ms) >= DEFERRED_SAVE_MS
        {
            self.settings_dirty = false;
            return true;
        }
        false
    }

    // --- Internals ---

    fn pitched_target(&self, profile: &SpeedProfile) -> f32 {
        let f = profile.frequency * (1.0 + self.pitch_percent / 100.0);
        f.clamp(profile.min_frequency, profile.max_frequency)
    }

    fn soft_start_amp(&self, config: &GlobalConfig, elapsed_ms: f32, duration_ms: f32) -> f32 {
        let t = (elapsed_ms / duration_ms).clamp(0.0, 1.0);
        match config.ramp_curve {
            RampCurve::SCurve => {
                self.target_amp * 0.5 * (1.0 - libm::cosf(core::f32::consts::PI * t))
            }
            RampCurve::Linear => self.target_amp * t,
        }
    }

    fn advance_runtime(&mut self, config: &mut GlobalConfig, now_ms: u32) {
        let elapsed = now_ms.wrapping_sub(self.last_runtime_tick_ms);
        if elapsed >= 1000 {
            let secs = elapsed / 1000;
            self.last_runtime_tick_ms = now_ms;
            self.session_runtime_secs = self.session_runtime_secs.wrapping_add(secs);
            config.total_runtime_secs = config.total_runtime_secs.wrapping_add(secs);
        }
    }

    fn set_wave_frequency(&mut self, hz: f32) {
        self.dds.frequency_hz = hz;
        self.dds.phase_increment = phase_increment(hz);
        self.dds_dirty = true;
    }

    fn set_wave_amplitude(&mut self, amplitude: f32) {
        self.dds.amplitude = amplitude.clamp(0.0, 1.0);
        self.dds_dirty = true;
    }

    fn set_wave_enabled(&mut self, enabled: bool) {
        self.dds.enabled = enabled;
        self.dds_dirty = true;
    }

    fn flush(&mut self) {
        if self.dds_dirty && self.exchange.try_publish(&self.dds) {
            self.dds_dirty = false;
        }
    }
}
