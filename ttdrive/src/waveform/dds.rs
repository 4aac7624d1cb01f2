//! Direct digital synthesis engine
//!
//! Renders 256-tick buffers of packed PWM compare values from a single
//! [`DdsState`] snapshot. The master phase accumulator advances by exactly
//! `phase_increment` per PWM tick; each channel samples the LUT at
//! `master_phase + channel_offset`. Channel 0 is the fixed reference
//! (offset 0).
//!
//! Buffer format matches the DMA layout: one 32-bit word per tick per PWM
//! slice, low half = channel A compare, high half = channel B compare.

use crate::exchange::DdsState;
use crate::waveform::filter::{ChannelFilters, CHANNELS};
use crate::waveform::lut;

/// PWM tick (wrap) rate in Hz. One DDS sample is produced per wrap.
pub const PWM_TICK_HZ: f64 = 50_000.0;

/// PWM counter wrap value; compare values span 0..=PWM_TOP.
pub const PWM_TOP: u16 = 1023;

/// DC offset applied to signed samples before packing.
pub const DC_OFFSET: i32 = 512;

/// Words per DMA buffer half, per slice. At 50 kHz one buffer spans ≈5.12 ms,
/// which is also the quantum for parameter changes.
pub const BUFFER_WORDS: usize = 256;

const CENTRE_WORD: u32 = ((DC_OFFSET as u32) << 16) | DC_OFFSET as u32;

/// Phase increment for a signed frequency: `round(f · 2³² / f_PWM)`.
///
/// Negative frequencies (reverse phase sequence, used by pulse braking) wrap
/// to a two's-complement increment that steps the accumulator backwards.
pub fn phase_increment(freq_hz: f32) -> u32 {
    let inc = libm::round(freq_hz as f64 * 4294967296.0 / PWM_TICK_HZ);
    inc as i64 as u32
}

/// Convert a phase offset in degrees to accumulator units, normalised into
/// [0, 360) first.
pub fn degrees_to_phase(degrees: f32) -> u32 {
    let mut d = degrees % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    (d as f64 / 360.0 * 4294967296.0) as u32
}

/// Synthesis state owned by the refill task. Everything mutable lives here;
/// the exchanged [`DdsState`] is read-only for one buffer at a time.
pub struct DdsEngine {
    master_phase: u32,
    filters: ChannelFilters,
}

impl DdsEngine {
    pub const fn new() -> Self {
        Self {
            master_phase: 0,
            filters: ChannelFilters::new(),
        }
    }

    /// Current master phase accumulator value.
    pub fn master_phase(&self) -> u32 {
        self.master_phase
    }

    /// Render one buffer pair from `state`.
    ///
    /// `slice_a` packs channels 0 (low) and 1 (high); `slice_b` packs
    /// channels 2 and 3. While disabled the output sits at centre (512),
    /// the phase does not advance and filter histories are retained.
    pub fn fill(
        &mut self,
        state: &DdsState,
        slice_a: &mut [u32; BUFFER_WORDS],
        slice_b: &mut [u32; BUFFER_WORDS],
    ) {
        if !state.enabled {
            slice_a.fill(CENTRE_WORD);
            slice_b.fill(CENTRE_WORD);
            return;
        }

        self.filters
            .configure(state.filter, state.iir_alpha, state.fir_profile);

        let active = (state.channels as usize).min(CHANNELS);

        for i in 0..BUFFER_WORDS {
            let mut values = [DC_OFFSET as u32; CHANNELS];
            for (ch, value) in values.iter_mut().enumerate().take(active) {
                let s = self.sample(state, ch);
                *value = (DC_OFFSET + s).clamp(0, PWM_TOP as i32) as u32;
            }

            self.master_phase = self.master_phase.wrapping_add(state.phase_increment);

            slice_a[i] = (values[1] << 16) | values[0];
            slice_b[i] = (values[3] << 16) | values[2];
        }
    }

    #[inline]
    fn sample(&mut self, state: &DdsState, ch: usize) -> i32 {
        let phase = self.master_phase.wrapping_add(state.phase_offsets[ch]);
        let raw = lut::lookup(phase) as f32 * state.amplitude;
        self.filters.apply(ch, raw) as i32
    }
}

impl Default for DdsEngine {
    fn default() -> Self {
        Self::new()
    }
}
