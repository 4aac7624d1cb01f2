//! Lock-free parameter hand-off between the control and synthesis cores.
//!
//! Two [`DdsState`] blocks, a publish flag and an active index. The control
//! core publishes complete parameter blocks; the synthesis core promotes the
//! pending block at the start of a buffer refill, never mid-buffer. Every
//! buffer is therefore synthesised from exactly one consistent state, and
//! parameter changes are quantised to buffer boundaries (≈5.12 ms).
//!
//! # Rules
//!
//! - Only the control core calls [`ParamExchange::try_publish`].
//! - Only the synthesis core calls [`ParamExchange::begin_buffer`].
//! - The index swap inside `begin_buffer` is the linearisation point.
//!
//! # Memory ordering
//!
//! The publish flag carries ownership of the pending slot: the writer fills
//! the slot, then stores the flag with `Release`; the reader observes it with
//! `Acquire` before swapping. While the flag is set the writer refuses to
//! touch the slots, so the two sides never access the same block
//! concurrently. Only atomic load/store is used — the RP2040 cores have no
//! atomic read-modify-write.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::{FilterKind, FirProfile};

/// The parameter block consumed by the synthesis core, one buffer at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DdsState {
    /// Base frequency in Hz. Negative values reverse the phase sequence
    /// (braking torque); the increment below already encodes the sign.
    pub frequency_hz: f32,
    /// Phase accumulator step per PWM tick (two's complement for negative
    /// frequencies).
    pub phase_increment: u32,
    /// Per-channel phase offsets, degrees × 2³²/360. Channel 0 stays 0.
    pub phase_offsets: [u32; 4],
    /// Amplitude scalar in [0, 1], applied after LUT interpolation.
    pub amplitude: f32,
    /// Number of active channels (the configured phase mode); channels at or
    /// above this index synthesise centre output.
    pub channels: u8,
    /// When false the refill writes centre words and the phase freezes.
    pub enabled: bool,
    pub filter: FilterKind,
    pub iir_alpha: f32,
    pub fir_profile: FirProfile,
}

impl DdsState {
    /// Silent power-on state: output centred, nothing advancing.
    pub const SILENT: Self = Self {
        frequency_hz: 0.0,
        phase_increment: 0,
        phase_offsets: [0; 4],
        amplitude: 0.0,
        channels: 4,
        enabled: false,
        filter: FilterKind::None,
        iir_alpha: 0.5,
        fir_profile: FirProfile::Medium,
    };
}

impl Default for DdsState {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Double-buffered A/B state pair with single-bit publish hand-off.
pub struct ParamExchange {
    slots: [UnsafeCell<DdsState>; 2],
    /// Index of the slot the synthesis core reads. Written only by the
    /// synthesis core; the protocol on `publish` orders the accesses.
    active: AtomicU8,
    /// True while a published block awaits promotion.
    publish: AtomicBool,
}

// SAFETY: one writer per direction. The publish flag transfers exclusive
// ownership of the pending slot between the cores (see module docs); the
// active slot is only written by whichever side currently owns it as pending.
unsafe impl Sync for ParamExchange {}

impl ParamExchange {
    pub const fn new() -> Self {
        Self {
            slots: [
                UnsafeCell::new(DdsState::SILENT),
                UnsafeCell::new(DdsState::SILENT),
            ],
            active: AtomicU8::new(0),
            publish: AtomicBool::new(false),
        }
    }

    /// Publish a complete parameter block (control core only).
    ///
    /// Returns `false` without touching anything if the previous publish has
    /// not been consumed yet; the caller retries on its next tick. Never
    /// blocks.
    #[inline]
    pub fn try_publish(&self, state: &DdsState) -> bool {
        if self.publish.load(Ordering::Acquire) {
            return false;
        }

        let pending = 1 - self.active.load(Ordering::Relaxed) as usize;

        // SAFETY: the flag is clear, so the pending slot belongs to the
        // control core; the synthesis core only swaps when the flag is set.
        unsafe {
            *self.slots[pending].get() = *state;
        }

        self.publish.store(true, Ordering::Release);
        true
    }

    /// True if a published block is still waiting for the next buffer.
    #[inline]
    pub fn publish_pending(&self) -> bool {
        self.publish.load(Ordering::Relaxed)
    }

    /// Promote any pending block and snapshot the active state (synthesis
    /// core only). Called once at the start of each buffer refill; the
    /// returned copy is used for the whole buffer.
    #[inline]
    pub fn begin_buffer(&self) -> DdsState {
        if self.publish.load(Ordering::Acquire) {
            let next = 1 - self.active.load(Ordering::Relaxed);
            self.active.store(next, Ordering::Relaxed);
            self.publish.store(false, Ordering::Release);
        }

        let idx = self.active.load(Ordering::Relaxed) as usize;

        // SAFETY: the active slot is never the control core's write target
        // (it writes 1 - active, and only while the flag is clear).
        unsafe { *self.slots[idx].get() }
    }

    /// Snapshot of the currently active state without promoting a pending
    /// publish. Diagnostic use only (status, tests).
    pub fn active_snapshot(&self) -> DdsState {
        let idx = self.active.load(Ordering::Relaxed) as usize;
        // SAFETY: as in `begin_buffer`.
        unsafe { *self.slots[idx].get() }
    }
}

impl Default for ParamExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_silent() {
        let ex = ParamExchange::new();
        assert_eq!(ex.begin_buffer(), DdsState::SILENT);
        assert!(!ex.publish_pending());
    }

    #[test]
    fn test_publish_promotes_at_buffer_start() {
        let ex = ParamExchange::new();

        let mut s = DdsState::SILENT;
        s.frequency_hz = 50.0;
        s.enabled = true;
        assert!(ex.try_publish(&s));

        // Not visible until the next buffer boundary.
        assert!(ex.publish_pending());
        assert_eq!(ex.active_snapshot(), DdsState::SILENT);

        assert_eq!(ex.begin_buffer(), s);
        assert!(!ex.publish_pending());
    }

    #[test]
    fn test_second_publish_waits_for_consumption() {
        let ex = ParamExchange::new();

        let mut s = DdsState::SILENT;
        s.frequency_hz = 50.0;
        assert!(ex.try_publish(&s));

        s.frequency_hz = 67.5;
        assert!(!ex.try_publish(&s), "unconsumed publish must refuse a second writer");

        assert_eq!(ex.begin_buffer().frequency_hz, 50.0);
        assert!(ex.try_publish(&s));
        assert_eq!(ex.begin_buffer().frequency_hz, 67.5);
    }

    #[test]
    fn test_concurrent_publish_consume_is_consistent() {
        use std::sync::atomic::{AtomicBool as StopFlag, Ordering as O};
        use std::sync::Arc;
        use std::thread;

        let ex = Arc::new(ParamExchange::new());
        let stop = Arc::new(StopFlag::new(false));

        // Writer publishes states whose fields are all derived from one
        // counter; any torn read shows up as an inconsistent snapshot.
        let writer = {
            let ex = Arc::clone(&ex);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut k = 1u32;
                while !stop.load(O::Relaxed) {
                    let mut s = DdsState::SILENT;
                    s.frequency_hz = k as f32;
                    s.phase_increment = k;
                    s.phase_offsets = [k, k, k, k];
                    s.amplitude = (k % 1000) as f32 / 1000.0;
                    if ex.try_publish(&s) {
                        k = k.wrapping_add(1);
                    }
                }
            })
        };

        for _ in 0..100_000 {
            let s = ex.begin_buffer();
            if s.frequency_hz == 0.0 {
                continue; // still the silent initial state
            }
            let k = s.phase_increment;
            assert_eq!(s.frequency_hz, k as f32);
            assert_eq!(s.phase_offsets, [k, k, k, k]);
            assert_eq!(s.amplitude, (k % 1000) as f32 / 1000.0);
        }

        stop.store(true, O::Relaxed);
        writer.join().unwrap();
    }
}
