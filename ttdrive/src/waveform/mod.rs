//! Waveform synthesis: sine LUT, per-channel filtering, DDS buffer refill.

pub mod dds;
pub mod filter;
pub mod lut;

pub use dds::{degrees_to_phase, phase_increment, DdsEngine, BUFFER_WORDS, PWM_TOP};
pub use filter::ChannelFilters;
