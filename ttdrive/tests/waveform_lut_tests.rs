//! Sine LUT tests

use ttdrive::waveform::lut::{lookup, LUT_PEAK, LUT_SHIFT, LUT_SIZE, SINE_LUT};

#[test]
fn test_lut_size_is_power_of_two() {
    assert!(LUT_SIZE.is_power_of_two());
    assert_eq!(LUT_SHIFT, 32 - LUT_SIZE.trailing_zeros());
}

#[test]
fn test_lut_cardinal_points() {
    assert_eq!(SINE_LUT[0], 0);
    assert_eq!(SINE_LUT[LUT_SIZE / 4], LUT_PEAK as i16);
    // sin(pi) lands within the Taylor-series error band.
    assert!(SINE_LUT[LUT_SIZE / 2].abs() <= 4);
    assert_eq!(SINE_LUT[3 * LUT_SIZE / 4], -(LUT_PEAK as i16));
}

#[test]
fn test_lut_amplitude_bounded() {
    for &s in SINE_LUT.iter() {
        assert!(
            (s as i32).abs() <= LUT_PEAK,
            "sample {} exceeds ±{}",
            s,
            LUT_PEAK
        );
    }
}

#[test]
fn test_lut_half_wave_symmetry() {
    for i in 0..LUT_SIZE / 2 {
        let a = SINE_LUT[i] as i32;
        let b = SINE_LUT[i + LUT_SIZE / 2] as i32;
        assert!(
            (a + b).abs() <= 2,
            "sin(x) + sin(x+pi) should cancel at index {} ({} vs {})",
            i,
            a,
            b
        );
    }
}

#[test]
fn test_lookup_at_table_entries() {
    // A phase that is an exact table index has zero interpolation fraction.
    for i in [0usize, 1, LUT_SIZE / 4, LUT_SIZE - 1] {
        let phase = (i as u32) << LUT_SHIFT;
        assert_eq!(lookup(phase), SINE_LUT[i]);
    }
}

#[test]
fn test_lookup_interpolates_between_entries() {
    // Halfway between entry 0 and entry 1: expect the midpoint.
    let phase = 1u32 << (LUT_SHIFT - 1);
    let expected = (SINE_LUT[0] as i32 + SINE_LUT[1] as i32) / 2;
    let got = lookup(phase) as i32;
    assert!(
        (got - expected).abs() <= 1,
        "midpoint interpolation: got {}, expected {}",
        got,
        expected
    );
}

#[test]
fn test_lookup_wraps_at_table_end() {
    // Interpolating past the last entry must blend towards entry 0.
    let phase = ((LUT_SIZE as u32 - 1) << LUT_SHIFT) | (1 << (LUT_SHIFT - 1));
    let expected = (SINE_LUT[LUT_SIZE - 1] as i32 + SINE_LUT[0] as i32) / 2;
    let got = lookup(phase) as i32;
    assert!((got - expected).abs() <= 1);
}
