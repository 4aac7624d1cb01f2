//! Versioned binary codec for the persisted configuration.
//!
//! A settings blob is a `u32` schema version followed by a packed,
//! little-endian, field-by-field encoding of [`GlobalConfig`]. Presets use
//! the identical layout. Decoders exist for the two legacy layouts still in
//! the field; migration copies the shared fields and defaults the newer ones.
//!
//! # Version history
//!
//! - **v2**: before frequency-dependent amplitude and the boot-speed policy.
//! - **v3**: adds `fda_pct`.
//! - **v4** (current): adds `boot_speed`.

use super::{
    BootSpeed, BrakeMode, FilterKind, FirProfile, GlobalConfig, RampCurve, SpeedProfile,
    SpeedSlot, PRESET_NAME_LEN, PRESET_SLOTS,
};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 4;

/// Upper bound for any encoded blob; callers size their buffers with this.
pub const MAX_ENCODED_LEN: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Blob ended before the layout did.
    Truncated,
    /// Version is unknown or newer than this firmware understands.
    UnsupportedVersion(u32),
    /// Destination buffer too small for an encode.
    BufferTooSmall,
}

/// How a blob was brought up to the current schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    UpToDate,
    Migrated { from: u32 },
}

/// Encode `config` at the current schema version. Returns the byte length.
pub fn encode(config: &GlobalConfig, buf: &mut [u8]) -> Result<usize, CodecError> {
    let mut w = Writer { buf, pos: 0 };

    w.u32(SCHEMA_VERSION)?;
    w.u8(config.phase_mode)?;
    w.u8(config.max_amplitude_pct)?;
    w.bool(config.smooth_switching)?;
    w.u8(config.switch_ramp_secs)?;

    w.u8(config.brake_mode as u8)?;
    w.f32(config.brake_duration_secs)?;
    w.f32(config.brake_pulse_gap_secs)?;
    w.f32(config.brake_start_freq)?;
    w.f32(config.brake_stop_freq)?;

    w.bool(config.relay_active_high)?;
    w.bool(config.mute_link_standby)?;
    w.bool(config.mute_link_start_stop)?;
    w.u8(config.power_on_relay_delay_secs)?;

    w.u8(config.display_brightness)?;
    w.u8(config.display_sleep_delay)?;
    w.bool(config.screensaver_enabled)?;
    w.u8(config.auto_dim_mins)?;
    w.bool(config.show_runtime)?;
    w.bool(config.error_display_enabled)?;
    w.u8(config.error_display_secs)?;

    w.u8(config.auto_standby_mins)?;
    w.bool(config.auto_start)?;
    w.bool(config.auto_boot)?;
    w.bool(config.pitch_reset_on_stop)?;

    for speed in &config.speeds {
        encode_speed(&mut w, speed)?;
    }

    for name in &config.preset_names {
        w.bytes(name)?;
    }

    w.u32(config.total_runtime_secs)?;
    w.bool(config.reverse_encoder)?;
    w.f32(config.pitch_step)?;
    w.u8(config.ramp_curve as u8)?;
    w.u8(config.screensaver_mode)?;
    w.bool(config.enable_78rpm)?;

    w.u8(config.fda_pct)?;
    w.u8(config.boot_speed as u8)?;
    w.u8(config.current_speed as u8)?;

    Ok(w.pos)
}

/// Decode any supported version, migrating legacy layouts to the current
/// schema. New fields take their defaults: `fda_pct = 0`,
/// `boot_speed = LastUsed`.
pub fn decode_any(bytes: &[u8]) -> Result<(GlobalConfig, LoadOutcome), CodecError> {
    let mut r = Reader { buf: bytes, pos: 0 };
    let version = r.u32()?;

    match version {
        2 | 3 | 4 => {
            let config = decode_body(&mut r, version)?;
            let outcome = if version == SCHEMA_VERSION {
                LoadOutcome::UpToDate
            } else {
                LoadOutcome::Migrated { from: version }
            };
            Ok((config, outcome))
        }
        other => Err(CodecError::UnsupportedVersion(other)),
    }
}

fn decode_body(r: &mut Reader<'_>, version: u32) -> Result<GlobalConfig, CodecError> {
    // Start from defaults so fields a legacy layout lacks come out defaulted.
    let mut config = GlobalConfig::default();

    config.phase_mode = r.u8()?;
    config.max_amplitude_pct = r.u8()?;
    config.smooth_switching = r.bool()?;
    config.switch_ramp_secs = r.u8()?;

    config.brake_mode = BrakeMode::from_u8(r.u8()?);
    config.brake_duration_secs = r.f32()?;
    config.brake_pulse_gap_secs = r.f32()?;
    config.brake_start_freq = r.f32()?;
    config.brake_stop_freq = r.f32()?;

    config.relay_active_high = r.bool()?;
    config.mute_link_standby = r.bool()?;
    config.mute_link_start_stop = r.bool()?;
    config.power_on_relay_delay_secs = r.u8()?;

    config.display_brightness = r.u8()?;
    config.display_sleep_delay = r.u8()?;
    config.screensaver_enabled = r.bool()?;
    config.auto_dim_mins = r.u8()?;
    config.show_runtime = r.bool()?;
    config.error_display_enabled = r.bool()?;
    config.error_display_secs = r.u8()?;

    config.auto_standby_mins = r.u8()?;
    config.auto_start = r.bool()?;
    config.auto_boot = r.bool()?;
    config.pitch_reset_on_stop = r.bool()?;

    for speed in config.speeds.iter_mut() {
        *speed = decode_speed(r)?;
    }

    for slot in 0..PRESET_SLOTS {
        let mut name = [0u8; PRESET_NAME_LEN];
        r.bytes(&mut name)?;
        config.preset_names[slot] = name;
    }

    config.total_runtime_secs = r.u32()?;
    config.reverse_encoder = r.bool()?;
    config.pitch_step = r.f32()?;
    config.ramp_curve = RampCurve::from_u8(r.u8()?);
    config.screensaver_mode = r.u8()?;
    config.enable_78rpm = r.bool()?;

    if version >= 3 {
        config.fda_pct = r.u8()?;
    }
    if version >= 4 {
        config.boot_speed = BootSpeed::from_u8(r.u8()?);
    }
    config.current_speed = SpeedSlot::from_index(r.u8()?).unwrap_or(SpeedSlot::Rpm33);

    Ok(config)
}

fn encode_speed(w: &mut Writer<'_>, speed: &SpeedProfile) -> Result<(), CodecError> {
    w.f32(speed.frequency)?;
    w.f32(speed.min_frequency)?;
    w.f32(speed.max_frequency)?;
    for offset in &speed.phase_offsets {
        w.f32(*offset)?;
    }
    w.f32(speed.soft_start_secs)?;
    w.u8(speed.reduced_amplitude_pct)?;
    w.u8(speed.reduced_amplitude_delay_secs)?;
    w.u8(speed.kick_multiplier)?;
    w.u8(speed.kick_hold_secs)?;
    w.f32(speed.kick_ramp_secs)?;
    w.u8(speed.filter as u8)?;
    w.f32(speed.iir_alpha)?;
    w.u8(speed.fir_profile as u8)
}

fn decode_speed(r: &mut Reader<'_>) -> Result<SpeedProfile, CodecError> {
    let frequency = r.f32()?;
    let min_frequency = r.f32()?;
    let max_frequency = r.f32()?;
    let mut phase_offsets = [0.0f32; 4];
    for offset in phase_offsets.iter_mut() {
        *offset = r.f32()?;
    }

    Ok(SpeedProfile {
        frequency,
        min_frequency,
        max_frequency,
        phase_offsets,
        soft_start_secs: r.f32()?,
        reduced_amplitude_pct: r.u8()?,
        reduced_amplitude_delay_secs: r.u8()?,
        kick_multiplier: r.u8()?,
        kick_hold_secs: r.u8()?,
        kick_ramp_secs: r.f32()?,
        filter: FilterKind::from_u8(r.u8()?),
        iir_alpha: r.f32()?,
        fir_profile: FirProfile::from_u8(r.u8()?),
    })
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl Writer<'_> {
    fn bytes(&mut self, data: &[u8]) -> Result<(), CodecError> {
        let end = self.pos + data.len();
        if end > self.buf.len() {
            return Err(CodecError::BufferTooSmall);
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    fn u8(&mut self, v: u8) -> Result<(), CodecError> {
        self.bytes(&[v])
    }

    fn bool(&mut self, v: bool) -> Result<(), CodecError> {
        self.u8(v as u8)
    }

    fn u32(&mut self, v: u32) -> Result<(), CodecError> {
        self.bytes(&v.to_le_bytes())
    }

    fn f32(&mut self, v: f32) -> Result<(), CodecError> {
        self.bytes(&v.to_le_bytes())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn bytes(&mut self, out: &mut [u8]) -> Result<(), CodecError> {
        let end = self.pos + out.len();
        if end > self.buf.len() {
            return Err(CodecError::Truncated);
        }
        out.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        let mut b = [0u8; 1];
        self.bytes(&mut b)?;
        Ok(b[0])
    }

    fn bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.u8()? != 0)
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let mut b = [0u8; 4];
        self.bytes(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn f32(&mut self) -> Result<f32, CodecError> {
        let mut b = [0u8; 4];
        self.bytes(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }
}

/// Encode a legacy blob for tests and tooling. Writes the same layout as the
/// given version did.
#[doc(hidden)]
pub fn encode_legacy(config: &GlobalConfig, version: u32, buf: &mut [u8]) -> Result<usize, CodecError> {
    let len = encode(config, buf)?;
    // v4 trails with [fda, boot_speed, current_speed]; the legacy layouts are
    // strict prefixes of it with current_speed re-appended.
    match version {
        4 => Ok(len),
        3 => {
            buf.copy_within(len - 1..len, len - 2);
            buf[..4].copy_from_slice(&3u32.to_le_bytes());
            Ok(len - 1)
        }
        2 => {
            buf.copy_within(len - 1..len, len - 3);
            buf[..4].copy_from_slice(&2u32.to_le_bytes());
            Ok(len - 2)
        }
        other => Err(CodecError::UnsupportedVersion(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut config = GlobalConfig::default();
        config.fda_pct = 25;
        config.current_speed = SpeedSlot::Rpm45;
        config.set_preset_name(2, "Stanton");

        let mut a = [0u8; MAX_ENCODED_LEN];
        let mut b = [0u8; MAX_ENCODED_LEN];
        let len_a = encode(&config, &mut a).unwrap();

        let (decoded, outcome) = decode_any(&a[..len_a]).unwrap();
        assert_eq!(outcome, LoadOutcome::UpToDate);
        assert_eq!(decoded, config);

        let len_b = encode(&decoded, &mut b).unwrap();
        assert_eq!(&a[..len_a], &b[..len_b]);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = encode(&GlobalConfig::default(), &mut buf).unwrap();
        buf[..4].copy_from_slice(&9u32.to_le_bytes());
        assert_eq!(
            decode_any(&buf[..len]).unwrap_err(),
            CodecError::UnsupportedVersion(9)
        );
    }

    #[test]
    fn test_truncated_blob_is_rejected() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = encode(&GlobalConfig::default(), &mut buf).unwrap();
        assert_eq!(decode_any(&buf[..len - 10]).unwrap_err(), CodecError::Truncated);
    }
}
