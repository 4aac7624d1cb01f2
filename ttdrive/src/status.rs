//! Shared status bus: the handful of scalars the UI and CLI read.
//!
//! Single writer per field (the control core; `system_initialised` is written
//! once at the end of setup). Readers may observe a value one tick old and a
//! float published concurrently with a state change, but never a torn enum —
//! every field is one 32-bit-or-smaller atomic.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::motor::MotorState;

pub struct StatusBus {
    state: AtomicU8,
    frequency_bits: AtomicU32,
    pitch_bits: AtomicU32,
    initialised: AtomicBool,
}

impl StatusBus {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(MotorState::Standby as u8),
            frequency_bits: AtomicU32::new(0),
            pitch_bits: AtomicU32::new(0),
            initialised: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn set_state(&self, state: MotorState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn state(&self) -> MotorState {
        MotorState::from_u8(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_frequency(&self, hz: f32) {
        self.frequency_bits.store(hz.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        f32::from_bits(self.frequency_bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_pitch(&self, percent: f32) {
        self.pitch_bits.store(percent.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        f32::from_bits(self.pitch_bits.load(Ordering::Relaxed))
    }

    /// Mark control-core setup complete. The synthesis core spins on this
    /// before touching hardware; release/acquire orders everything set up
    /// before it.
    #[inline]
    pub fn mark_initialised(&self) {
        self.initialised.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire)
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
