//! Configuration validation tests: clamping, bound swapping, phase wrap.

use ttdrive::config::{wrap_degrees, GlobalConfig};

#[test]
fn test_defaults_pass_validation_unchanged() {
    let mut config = GlobalConfig::default();
    let before = config;
    config.validate();
    assert_eq!(config, before, "defaults must already be in range");
}

#[test]
fn test_inverted_frequency_bounds_are_swapped() {
    let mut config = GlobalConfig::default();
    config.speeds[0].min_frequency = 80.0;
    config.speeds[0].max_frequency = 40.0;
    config.speeds[0].frequency = 50.0;
    config.validate();

    let s = &config.speeds[0];
    assert_eq!(s.min_frequency, 40.0);
    assert_eq!(s.max_frequency, 80.0);
    assert!(s.min_frequency <= s.frequency && s.frequency <= s.max_frequency);
}

#[test]
fn test_nominal_clamped_into_bounds() {
    let mut config = GlobalConfig::default();
    config.speeds[1].frequency = 200.0; // above max 77.5
    config.validate();
    assert_eq!(config.speeds[1].frequency, config.speeds[1].max_frequency);

    config.speeds[1].frequency = 1.0; // below both the range floor and min
    config.validate();
    assert_eq!(config.speeds[1].frequency, config.speeds[1].min_frequency);
}

#[test]
fn test_frequencies_clamped_to_absolute_range() {
    let mut config = GlobalConfig::default();
    config.speeds[2].min_frequency = 1.0;
    config.speeds[2].max_frequency = 9000.0;
    config.validate();
    assert_eq!(config.speeds[2].min_frequency, 10.0);
    assert_eq!(config.speeds[2].max_frequency, 3000.0);
}

#[test]
fn test_phase_offsets_wrap_into_range() {
    let mut config = GlobalConfig::default();
    config.speeds[0].phase_offsets = [0.0, -90.0, 360.0, 480.5];
    config.validate();

    let offsets = config.speeds[0].phase_offsets;
    assert_eq!(offsets[0], 0.0);
    assert!((offsets[1] - 270.0).abs() < 1e-4);
    assert_eq!(offsets[2], 0.0);
    assert!((offsets[3] - 120.5).abs() < 1e-4);

    for o in offsets {
        assert!((0.0..360.0).contains(&o));
    }
}

#[test]
fn test_wrap_degrees_helper() {
    assert_eq!(wrap_degrees(0.0), 0.0);
    assert_eq!(wrap_degrees(360.0), 0.0);
    assert!((wrap_degrees(-360.0)).abs() < 1e-6);
    assert!((wrap_degrees(-30.0) - 330.0).abs() < 1e-4);
    assert!((wrap_degrees(725.0) - 5.0).abs() < 1e-4);
}

#[test]
fn test_scalar_clamps() {
    let mut config = GlobalConfig::default();
    config.phase_mode = 0;
    config.max_amplitude_pct = 150;
    config.switch_ramp_secs = 9;
    config.fda_pct = 200;
    config.pitch_step = 5.0;
    config.speeds[0].kick_multiplier = 9;
    config.speeds[0].kick_hold_secs = 99;
    config.speeds[0].reduced_amplitude_pct = 10;
    config.speeds[0].reduced_amplitude_delay_secs = 120;
    config.speeds[0].iir_alpha = 3.0;
    config.speeds[0].soft_start_secs = 99.0;
    config.validate();

    assert_eq!(config.phase_mode, 1);
    assert_eq!(config.max_amplitude_pct, 100);
    assert_eq!(config.switch_ramp_secs, 5);
    assert_eq!(config.fda_pct, 100);
    assert_eq!(config.pitch_step, 1.0);
    assert_eq!(config.speeds[0].kick_multiplier, 4);
    assert_eq!(config.speeds[0].kick_hold_secs, 15);
    assert_eq!(config.speeds[0].reduced_amplitude_pct, 50);
    assert_eq!(config.speeds[0].reduced_amplitude_delay_secs, 60);
    assert_eq!(config.speeds[0].iir_alpha, 0.99);
    assert_eq!(config.speeds[0].soft_start_secs, 10.0);
}

#[test]
fn test_non_finite_floats_fall_back() {
    let mut config = GlobalConfig::default();
    config.speeds[0].frequency = f32::NAN;
    config.speeds[0].phase_offsets[1] = f32::INFINITY;
    config.brake_duration_secs = f32::NAN;
    config.validate();

    assert!(config.speeds[0].frequency.is_finite());
    assert!((0.0..360.0).contains(&config.speeds[0].phase_offsets[1]));
    assert_eq!(config.brake_duration_secs, 0.0);
}

#[test]
fn test_preset_names() {
    let mut config = GlobalConfig::default();
    assert_eq!(config.preset_name(0), "Preset 1");
    assert_eq!(config.preset_name(4), "Preset 5");

    config.set_preset_name(2, "Garrard 301");
    assert_eq!(config.preset_name(2), "Garrard 301");

    // Longer than 16 characters: truncated, still NUL-terminated.
    config.set_preset_name(3, "A very long deck name indeed");
    assert_eq!(config.preset_name(3).len(), 16);
}
