//! Input decoding tests: debounce, click classification, acceleration.

use ttdrive::input::{InputDecoder, InputEvent};

/// Simulate a debounced press of the given duration starting at `t0`.
/// Returns the time after the release has debounced.
fn press(input: &mut InputDecoder, t0: u32, duration: u32) -> u32 {
    input.update(t0, true);
    input.update(t0 + 25, true); // press debounced
    input.update(t0 + duration, false);
    let settled = t0 + duration + 25;
    input.update(settled, false); // release debounced
    settled
}

#[test]
fn test_short_press_is_select_after_window() {
    let mut input = InputDecoder::new();
    let t = press(&mut input, 1000, 100);

    assert_eq!(input.take_event(), None, "double-click window still open");

    input.update(t + 401, false);
    assert_eq!(input.take_event(), Some(InputEvent::Select));
}

#[test]
fn test_double_click() {
    let mut input = InputDecoder::new();
    let t = press(&mut input, 1000, 60);
    let t = press(&mut input, t + 50, 60);

    input.update(t + 401, false);
    assert_eq!(input.take_event(), Some(InputEvent::DoubleClick));
}

#[test]
fn test_long_press_is_back() {
    let mut input = InputDecoder::new();
    press(&mut input, 1000, 3500);
    assert_eq!(input.take_event(), Some(InputEvent::Back));
}

#[test]
fn test_very_long_press_is_exit() {
    let mut input = InputDecoder::new();
    press(&mut input, 1000, 5500);
    assert_eq!(input.take_event(), Some(InputEvent::Exit));
}

#[test]
fn test_bounce_is_ignored() {
    let mut input = InputDecoder::new();

    // A 10 ms glitch never debounces into a press.
    input.update(1000, true);
    input.update(1010, false);
    input.update(1500, false);
    assert_eq!(input.take_event(), None);
}

#[test]
fn test_rotation_events_and_delta() {
    let mut input = InputDecoder::new();

    input.inject_delta(1);
    input.update(1000, false);
    assert_eq!(input.take_event(), Some(InputEvent::NavUp));

    input.inject_delta(-1);
    input.update(2000, false);
    assert_eq!(input.take_event(), Some(InputEvent::NavDown));

    assert_eq!(input.take_delta(), 0, "the two steps cancel");
}

#[test]
fn test_slow_rotation_has_no_acceleration() {
    let mut input = InputDecoder::new();

    for i in 0..5 {
        input.inject_delta(1);
        input.update(1000 + i * 200, false);
    }
    assert_eq!(input.take_delta(), 5);
}

#[test]
fn test_fast_rotation_accelerates() {
    let mut input = InputDecoder::new();

    // Eight steps 20 ms apart: 1 + 1 + 1 + 2 + 2 + 2 + 5 + 5 = 19.
    // (First step resets the streak; ×2 applies above 2 fast steps, ×5
    // above 5.)
    let mut total = 0;
    for i in 0..8 {
        input.inject_delta(1);
        input.update(1000 + i * 20, false);
        total += input.take_delta();
    }
    assert_eq!(total, 19);
}

#[test]
fn test_quadrature_direction() {
    let mut input = InputDecoder::new();

    // CLK falls while DT still high: one step forward.
    input.sample_encoder(false, true);
    input.update(1000, false);
    assert_eq!(input.take_delta(), 1);

    // CLK rises while DT high too: step backward.
    input.sample_encoder(true, true);
    input.update(1200, false);
    assert_eq!(input.take_delta(), -1);
}

#[test]
fn test_injected_click_goes_through_window() {
    let mut input = InputDecoder::new();
    input.inject_click();
    input.update(1000, false);
    assert_eq!(input.take_event(), None);
    input.update(1401, false);
    assert_eq!(input.take_event(), Some(InputEvent::Select));
}
