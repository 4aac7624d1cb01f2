//! Running/Stopping tests: smooth speed switching, braking modes, standby,
//! relay sequencing, pitch and runtime counters.

use ttdrive::config::{BrakeMode, GlobalConfig, SpeedSlot};
use ttdrive::exchange::{DdsState, ParamExchange};
use ttdrive::motor::{MotorController, MotorState, RelayIo, PITCH_RANGES};

#[derive(Default)]
struct TestRelays {
    mute: [bool; 4],
    standby: bool,
}

impl RelayIo for TestRelays {
    fn write_mute(&mut self, channel: usize, level: bool) {
        self.mute[channel] = level;
    }
    fn write_standby(&mut self, level: bool) {
        self.standby = level;
    }
}

fn run_to(
    ctrl: &mut MotorController<'_>,
    cfg: &mut GlobalConfig,
    relays: &mut TestRelays,
    ex: &ParamExchange,
    from: u32,
    to: u32,
) -> DdsState {
    let mut state = ex.active_snapshot();
    let mut t = from;
    while t <= to {
        ctrl.update(cfg, relays, t);
        state = ex.begin_buffer();
        t += 10;
    }
    state
}

/// Bring a default-config controller into Running at 50 Hz by t=3000.
fn start_running<'e>(
    ex: &'e ParamExchange,
    cfg: &mut GlobalConfig,
    relays: &mut TestRelays,
) -> MotorController<'e> {
    let mut ctrl = MotorController::new(ex, cfg, 0);
    ctrl.start(cfg, relays, 0);
    run_to(&mut ctrl, cfg, relays, ex, 0, 3000);
    assert_eq!(ctrl.state(), MotorState::Running);
    ctrl
}

#[test]
fn test_smooth_speed_switch_ramps_frequency() {
    // Scenario: 33 → 45 while Running, 3 s linear ramp, pitch 0.
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.switch_ramp_secs = 3;
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.set_speed(&mut cfg, 4000, SpeedSlot::Rpm45);
    assert_eq!(ctrl.state(), MotorState::Running);

    // Halfway: 50 + 17.5/2 = 58.75 Hz.
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4000, 5500);
    assert!((s.frequency_hz - 58.75).abs() < 0.01, "mid-ramp: {}", s.frequency_hz);
    assert_eq!(ctrl.state(), MotorState::Running);

    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 5510, 7100);
    assert!((s.frequency_hz - 67.5).abs() < 1e-3);
    assert_eq!(ctrl.state(), MotorState::Running);
}

#[test]
fn test_instant_speed_switch_when_smoothing_disabled() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.smooth_switching = false;
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.set_speed(&mut cfg, 4000, SpeedSlot::Rpm45);
    let s = ex.begin_buffer();
    assert!((s.frequency_hz - 67.5).abs() < 1e-3, "snap: {}", s.frequency_hz);
}

#[test]
fn test_cycle_speed_skips_disabled_78() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.enable_78rpm = false;
    let mut ctrl = MotorController::new(&ex, &mut cfg, 0);
    let _ = ex.begin_buffer();

    assert_eq!(cfg.current_speed, SpeedSlot::Rpm33);
    ctrl.cycle_speed(&mut cfg, 0);
    assert_eq!(cfg.current_speed, SpeedSlot::Rpm45);
    ctrl.cycle_speed(&mut cfg, 0);
    assert_eq!(cfg.current_speed, SpeedSlot::Rpm33, "78 RPM disabled, wrap to 33");

    ctrl.adjust_speed(&mut cfg, 0, 2);
    assert_eq!(cfg.current_speed, SpeedSlot::Rpm45, "78 RPM disabled, fall back to 45");
}

#[test]
fn test_pulse_brake_sequence() {
    // Scenario: pulse brake, 4 s duration, 0.5 s gap, from 50 Hz Running.
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.brake_mode = BrakeMode::Pulse;
    cfg.brake_duration_secs = 4.0;
    cfg.brake_pulse_gap_secs = 0.5;
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.stop(&mut cfg, 4000);
    let s = ex.begin_buffer();
    assert_eq!(ctrl.state(), MotorState::Stopping);
    assert!((s.frequency_hz + 50.0).abs() < 1e-3, "reverse sequence: {}", s.frequency_hz);
    assert!((s.amplitude - 1.0).abs() < 1e-6);

    // After the first gap the amplitude toggles off…
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4010, 4700);
    assert_eq!(s.amplitude, 0.0);

    // …and back on after the next.
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4710, 5200);
    assert!((s.amplitude - 1.0).abs() < 1e-6);

    // At 4 s the drive is released: disabled, frequency restored positive.
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 5210, 8100);
    assert_eq!(ctrl.state(), MotorState::Stopped);
    assert!(!s.enabled);
    assert_eq!(s.amplitude, 0.0);
    assert!((s.frequency_hz - 50.0).abs() < 1e-3);
}

#[test]
fn test_ramp_brake_walks_frequency_down() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.brake_mode = BrakeMode::Ramp;
    cfg.brake_duration_secs = 2.0;
    cfg.brake_start_freq = 50.0;
    cfg.brake_stop_freq = 10.0;
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.stop(&mut cfg, 4000);

    // Midpoint: frequency 30 Hz, amplitude half.
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4000, 5000);
    assert!((s.frequency_hz - 30.0).abs() < 0.5, "mid-brake: {}", s.frequency_hz);
    assert!((s.amplitude - 0.5).abs() < 0.02);

    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 5010, 6100);
    assert_eq!(ctrl.state(), MotorState::Stopped);
    assert!(!s.enabled);
}

#[test]
fn test_off_brake_ramps_amplitude_only() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    cfg.brake_mode = BrakeMode::Off;
    cfg.brake_duration_secs = 2.0;
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.stop(&mut cfg, 4000);
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4000, 5000);
    assert!((s.amplitude - 0.5).abs() < 0.02);
    assert!((s.frequency_hz - 50.0).abs() < 1e-3, "frequency unchanged");
}

#[test]
fn test_reduced_amplitude_latches_after_delay() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    // Defaults: 80 % after 5 s.
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    // Running began at t=1000; reduction due at 6000.
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 3010, 5990);
    assert!((s.amplitude - 1.0).abs() < 1e-6);

    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 6000, 6100);
    assert!((s.amplitude - 0.8).abs() < 1e-6, "reduced: {}", s.amplitude);
}

#[test]
fn test_standby_silences_output() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.toggle_standby(&mut cfg, &mut relays, 4000);
    assert_eq!(ctrl.state(), MotorState::Standby);
    let s = ex.begin_buffer();
    assert!(!s.enabled);
    assert_eq!(s.amplitude, 0.0);
    assert_eq!(ctrl.session_runtime_secs(), 0);

    // The accumulated total runtime is flushed without the settle delay.
    assert!(ctrl.take_deferred_save(4000));

    ctrl.toggle_standby(&mut cfg, &mut relays, 5000);
    assert_eq!(ctrl.state(), MotorState::Stopped);
}

#[test]
fn test_relay_staircase_unmutes_in_order() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    // Defaults: active high, linked to start/stop, 2 s power-on grace,
    // 3-phase mode.
    let mut relays = TestRelays::default();
    let mut ctrl = MotorController::new(&ex, &mut cfg, 0);
    let _ = ex.begin_buffer();

    // Start after the grace period.
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 0, 2500);
    ctrl.start(&mut cfg, &mut relays, 2500);
    assert_eq!(relays.mute, [false; 4], "staircase has not begun yet");

    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 2510, 2650);
    assert_eq!(relays.mute, [true, false, false, false]);

    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 2660, 2760);
    assert_eq!(relays.mute, [true, true, false, false]);

    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 2770, 2870);
    assert_eq!(relays.mute, [true, true, true, false], "phase mode 3 leaves channel 4 muted");

    // Stop completes after the 2 s default ramp brake and mutes everything
    // at once.
    ctrl.stop(&mut cfg, 4000);
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 4000, 6100);
    assert_eq!(ctrl.state(), MotorState::Stopped);
    assert_eq!(relays.mute, [false; 4]);
}

#[test]
fn test_power_on_grace_forces_mute() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut relays = TestRelays::default();
    let mut ctrl = MotorController::new(&ex, &mut cfg, 0);
    let _ = ex.begin_buffer();

    // Start well inside the 2 s grace window.
    ctrl.start(&mut cfg, &mut relays, 100);
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 100, 1900);
    assert_eq!(relays.mute, [false; 4], "grace period must keep everything muted");
}

#[test]
fn test_pitch_tracks_and_clamps() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    ctrl.set_pitch(5.0);
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 3010, 3100);
    assert!((s.frequency_hz - 52.5).abs() < 1e-3);

    // Beyond the ±10 % range: clamped.
    ctrl.set_pitch(35.0);
    assert!((ctrl.pitch_percent() - 10.0).abs() < 1e-6);

    // Range boundary never exceeds the speed's max frequency.
    cfg.speeds[0].max_frequency = 52.0;
    ctrl.set_pitch(10.0);
    let s = run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 3110, 3200);
    assert!(s.frequency_hz <= 52.0 + 1e-3, "clamped to max: {}", s.frequency_hz);
}

#[test]
fn test_pitch_range_cycles() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut ctrl = MotorController::new(&ex, &mut cfg, 0);
    let _ = ex.begin_buffer();

    assert_eq!(ctrl.pitch_range(), PITCH_RANGES[0]);
    for expected in [20, 30, 40, 50, 10] {
        ctrl.cycle_pitch_range();
        assert_eq!(ctrl.pitch_range(), expected);
    }
}

#[test]
fn test_runtime_counters_advance_while_running() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut relays = TestRelays::default();
    let mut ctrl = start_running(&ex, &mut cfg, &mut relays);

    let base_total = cfg.total_runtime_secs;
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 3010, 8000);
    assert!(ctrl.session_runtime_secs() >= 4);
    assert!(cfg.total_runtime_secs >= base_total + 4);

    // Counters freeze outside Running.
    ctrl.stop(&mut cfg, 8000);
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 8010, 10100);
    let frozen = ctrl.session_runtime_secs();
    run_to(&mut ctrl, &mut cfg, &mut relays, &ex, 10110, 15000);
    assert_eq!(ctrl.session_runtime_secs(), frozen);
}

#[test]
fn test_deferred_save_after_speed_change() {
    let ex = ParamExchange::new();
    let mut cfg = GlobalConfig::default();
    let mut ctrl = MotorController::new(&ex, &mut cfg, 0);
    let _ = ex.begin_buffer();

    ctrl.set_speed(&mut cfg, 1000, SpeedSlot::Rpm45);
    assert!(!ctrl.take_deferred_save(1500), "settle time not elapsed");
    assert!(ctrl.take_deferred_save(3100));
    assert!(!ctrl.take_deferred_save(9999), "one-shot");
}
