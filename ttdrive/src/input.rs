//! Rotary encoder and button decoding.
//!
//! Pure logic: the caller samples the pins and passes levels plus a
//! millisecond timestamp. Produces discrete navigation events and a signed
//! accumulated delta for value editing. Supports event/delta injection so
//! the CLI and tests can drive the UI paths without hardware.
//!
//! Timing rules: 20 ms button debounce; releases over 5 s emit Exit and over
//! 3 s Back; shorter presses enter a 400 ms double-click window resolving to
//! Select or DoubleClick. Rotation faster than 50 ms/step accelerates the
//! delta ×2 after 2 fast steps and ×5 after 5.

/// Discrete input events consumed by the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    NavUp,
    NavDown,
    Select,
    Back,
    Exit,
    DoubleClick,
}

/// Button debounce window.
pub const DEBOUNCE_MS: u32 = 20;

/// Double-click detection window.
pub const DOUBLE_CLICK_MS: u32 = 400;

/// Press duration thresholds.
pub const BACK_PRESS_MS: u32 = 3000;
pub const EXIT_PRESS_MS: u32 = 5000;

/// Steps closer together than this accelerate.
pub const ACCEL_WINDOW_MS: u32 = 50;

pub struct InputDecoder {
    // Quadrature state
    last_clk: bool,
    position: i32,
    last_position: i32,

    // Acceleration
    accel_count: u8,
    last_step_ms: u32,

    // Accumulated delta for value editing
    delta: i32,

    // Button state machine
    raw_pressed: bool,
    raw_changed_ms: u32,
    pressed: bool,
    press_started_ms: u32,

    // Double-click window
    waiting_double: bool,
    double_started_ms: u32,
    click_count: u8,

    pending: Option<InputEvent>,

    // Injection
    injected_delta: i32,
    injected_clicks: u8,
    reverse: bool,
}

impl InputDecoder {
    pub const fn new() -> Self {
        Self {
            last_clk: true,
            position: 0,
            last_position: 0,
            accel_count: 0,
            last_step_ms: 0,
            delta: 0,
            raw_pressed: false,
            raw_changed_ms: 0,
            pressed: false,
            press_started_ms: 0,
            waiting_double: false,
            double_started_ms: 0,
            click_count: 0,
            pending: None,
            injected_delta: 0,
            injected_clicks: 0,
            reverse: false,
        }
    }

    /// Mirror the `reverse_encoder` setting.
    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    /// Quadrature edge sampling; call on every CLK change (ISR or fast
    /// poll). Direction comes from DT relative to CLK.
    pub fn sample_encoder(&mut self, clk: bool, dt: bool) {
        if clk != self.last_clk {
            let step = if dt != clk { 1 } else { -1 };
            self.position += if self.reverse { -step } else { step };
        }
        self.last_clk = clk;
    }

    /// Periodic update: folds encoder movement and the debounced button into
    /// events. `button_pressed` is the already-polarity-corrected switch
    /// state (true = pressed).
    pub fn update(&mut self, now_ms: u32, button_pressed: bool) {
        // --- Encoder movement ---
        let mut step = self.position - self.last_position;
        self.last_position = self.position;

        if self.injected_delta != 0 {
            step += self.injected_delta;
            self.injected_delta = 0;
        }

        if step != 0 {
            if now_ms.wrapping_sub(self.last_step_ms) < ACCEL_WINDOW_MS {
                self.accel_count = self.accel_count.saturating_add(1);
                if self.accel_count > 5 {
                    step *= 5;
                } else if self.accel_count > 2 {
                    step *= 2;
                }
            } else {
                self.accel_count = 0;
            }
            self.last_step_ms = now_ms;

            self.delta += step;
            self.pending = Some(if step > 0 {
                InputEvent::NavUp
            } else {
                InputEvent::NavDown
            });
        }

        // --- Button debounce ---
        if button_pressed != self.raw_pressed {
            self.raw_pressed = button_pressed;
            self.raw_changed_ms = now_ms;
        }

        if now_ms.wrapping_sub(self.raw_changed_ms) >= DEBOUNCE_MS {
            if self.raw_pressed && !self.pressed {
                self.pressed = true;
                self.press_started_ms = now_ms;
            } else if !self.raw_pressed && self.pressed {
                self.pressed = false;
                let duration = now_ms.wrapping_sub(self.press_started_ms);
                if duration > EXIT_PRESS_MS {
                    self.pending = Some(InputEvent::Exit);
                } else if duration > BACK_PRESS_MS {
                    self.pending = Some(InputEvent::Back);
                } else {
                    self.register_click(now_ms);
                }
            }
        }

        // --- Injected short presses ---
        while self.injected_clicks > 0 {
            self.injected_clicks -= 1;
            self.register_click(now_ms);
        }

        // --- Double-click resolution ---
        if self.waiting_double && now_ms.wrapping_sub(self.double_started_ms) > DOUBLE_CLICK_MS {
            self.waiting_double = false;
            self.pending = Some(if self.click_count >= 2 {
                InputEvent::DoubleClick
            } else {
                InputEvent::Select
            });
        }
    }

    fn register_click(&mut self, now_ms: u32) {
        if self.waiting_double {
            self.click_count += 1;
        } else {
            self.waiting_double = true;
            self.double_started_ms = now_ms;
            self.click_count = 1;
        }
    }

    /// Consume the pending event, if any.
    pub fn take_event(&mut self) -> Option<InputEvent> {
        self.pending.take()
    }

    /// Consume the accumulated signed delta.
    pub fn take_delta(&mut self) -> i32 {
        core::mem::take(&mut self.delta)
    }

    /// Inject encoder movement (CLI `j`/`l`, tests).
    pub fn inject_delta(&mut self, delta: i32) {
        self.injected_delta += delta;
    }

    /// Inject a short press (CLI `k`, tests). Goes through the double-click
    /// window like a real press.
    pub fn inject_click(&mut self) {
        self.injected_clicks = self.injected_clicks.saturating_add(1);
    }
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_click_resolves_after_window() {
        let mut input = InputDecoder::new();
        input.update(0, false);
        input.update(100, true); // press seen
        input.update(130, true); // debounced
        input.update(200, false);
        input.update(230, false); // release debounced, click registered

        // Still inside the double-click window.
        assert_eq!(input.take_event(), None);

        input.update(700, false);
        assert_eq!(input.take_event(), Some(InputEvent::Select));
    }

    #[test]
    fn test_reverse_flips_direction() {
        let mut input = InputDecoder::new();
        input.sample_encoder(false, true);
        input.update(10, false);
        assert_eq!(input.take_delta(), 1);

        let mut input = InputDecoder::new();
        input.set_reverse(true);
        input.sample_encoder(false, true);
        input.update(10, false);
        assert_eq!(input.take_delta(), -1);
    }
}
