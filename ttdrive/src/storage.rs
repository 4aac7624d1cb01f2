//! Settings, preset and error-log persistence.
//!
//! The filesystem itself is a collaborator: anything that can store named
//! byte blobs implements [`StorageBackend`] (the firmware backs it with a
//! flash filesystem; hosts and tests use [`MemBackend`]). All calls are
//! blocking and happen on the control core outside the hot paths.
//!
//! Files:
//! - `settings.bin` — version-tagged [`GlobalConfig`] blob.
//! - `preset_0.bin` … `preset_4.bin` — same layout, copy-on-save snapshots.
//! - `error.log` — append-only `millis,code,message` lines, rotated to
//!   `error.bak` once it grows past 10 KiB.

use crate::config::codec::{self, CodecError, LoadOutcome, MAX_ENCODED_LEN};
use crate::config::{GlobalConfig, PRESET_SLOTS};
use crate::eventlog::format_into;

pub const SETTINGS_FILE: &str = "settings.bin";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const ERROR_BAK_FILE: &str = "error.bak";

/// Rotate the error log once it exceeds this many bytes.
pub const ERROR_LOG_ROTATE_BYTES: usize = 10 * 1024;

const PRESET_FILES: [&str; PRESET_SLOTS] = [
    "preset_0.bin",
    "preset_1.bin",
    "preset_2.bin",
    "preset_3.bin",
    "preset_4.bin",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    /// Backend I/O failure.
    Io,
    /// Blob or file exceeds a fixed capacity.
    TooLarge,
    /// Stored bytes did not decode.
    Corrupt(CodecError),
    /// Preset slot index out of range.
    InvalidSlot,
}

impl From<CodecError> for StorageError {
    fn from(e: CodecError) -> Self {
        StorageError::Corrupt(e)
    }
}

/// Blocking byte-blob store. Implementations only need flat named files.
pub trait StorageBackend {
    /// Read a whole file into `buf`, returning the byte count.
    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StorageError>;
    /// Create or replace a file.
    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError>;
    /// Append to a file, creating it if absent.
    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError>;
    fn size(&mut self, name: &str) -> Option<usize>;
    fn remove(&mut self, name: &str) -> Result<(), StorageError>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError>;
    fn exists(&mut self, name: &str) -> bool;
}

/// Where the active configuration came from at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsOrigin {
    /// Current-version file loaded directly.
    Loaded,
    /// Legacy file migrated and rewritten at the current version.
    Migrated { from: u32 },
    /// Missing or corrupt file; defaults in use.
    Defaults,
}

/// Persistence facade over a backend.
pub struct Storage<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> Storage<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Load the configuration, migrating legacy schemas in place. Corrupt or
    /// missing settings fall back to validated defaults — never an error.
    pub fn load_config(&mut self) -> (GlobalConfig, SettingsOrigin) {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let loaded = self
            .backend
            .read(SETTINGS_FILE, &mut buf)
            .and_then(|len| codec::decode_any(&buf[..len]).map_err(StorageError::from));

        match loaded {
            Ok((mut config, outcome)) => {
                config.validate();
                match outcome {
                    LoadOutcome::UpToDate => (config, SettingsOrigin::Loaded),
                    LoadOutcome::Migrated { from } => {
                        // Rewrite at the current version so the next boot
                        // loads without migration.
                        let _ = self.save_config(&config);
                        (config, SettingsOrigin::Migrated { from })
                    }
                }
            }
            Err(_) => {
                let mut config = GlobalConfig::default();
                config.validate();
                (config, SettingsOrigin::Defaults)
            }
        }
    }

    pub fn save_config(&mut self, config: &GlobalConfig) -> Result<(), StorageError> {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = codec::encode(config, &mut buf)?;
        self.backend.write(SETTINGS_FILE, &buf[..len])
    }

    /// Load a preset snapshot. Legacy preset files migrate like settings.
    pub fn load_preset(&mut self, slot: usize) -> Result<GlobalConfig, StorageError> {
        let name = preset_file(slot)?;
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = self.backend.read(name, &mut buf)?;
        let (mut config, _) = codec::decode_any(&buf[..len])?;
        config.validate();
        Ok(config)
    }

    pub fn save_preset(&mut self, slot: usize, config: &GlobalConfig) -> Result<(), StorageError> {
        let name = preset_file(slot)?;
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = codec::encode(config, &mut buf)?;
        self.backend.write(name, &buf[..len])
    }

    /// Delete a preset slot's file (missing file is fine).
    pub fn reset_preset(&mut self, slot: usize) -> Result<(), StorageError> {
        let name = preset_file(slot)?;
        match self.backend.remove(name) {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn duplicate_preset(&mut self, src: usize, dest: usize) -> Result<(), StorageError> {
        let config = self.load_preset(src)?;
        self.save_preset(dest, &config)
    }

    /// Factory reset: remove settings, presets and error logs.
    pub fn reset_all(&mut self) {
        let _ = self.backend.remove(SETTINGS_FILE);
        for name in PRESET_FILES {
            let _ = self.backend.remove(name);
        }
        let _ = self.backend.remove(ERROR_LOG_FILE);
        let _ = self.backend.remove(ERROR_BAK_FILE);
    }

    /// Append one `millis,code,message` line, rotating first if the log has
    /// outgrown its size limit.
    pub fn append_error(&mut self, millis: u32, code: u8, message: &str) -> Result<(), StorageError> {
        if let Some(size) = self.backend.size(ERROR_LOG_FILE) {
            if size > ERROR_LOG_ROTATE_BYTES {
                let _ = self.backend.remove(ERROR_BAK_FILE);
                let _ = self.backend.rename(ERROR_LOG_FILE, ERROR_BAK_FILE);
            }
        }

        let mut line = [0u8; 160];
        let len = format_into(&mut line, format_args!("{},{},{}\n", millis, code, message));
        self.backend.append(ERROR_LOG_FILE, &line[..len])
    }

    /// Read the whole error log into `buf`; 0 if there is none.
    pub fn read_error_log(&mut self, buf: &mut [u8]) -> usize {
        self.backend.read(ERROR_LOG_FILE, buf).unwrap_or(0)
    }

    pub fn clear_error_log(&mut self) {
        let _ = self.backend.remove(ERROR_LOG_FILE);
    }

    pub fn error_log_size(&mut self) -> usize {
        self.backend.size(ERROR_LOG_FILE).unwrap_or(0)
    }
}

fn preset_file(slot: usize) -> Result<&'static str, StorageError> {
    PRESET_FILES.get(slot).copied().ok_or(StorageError::InvalidSlot)
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Capacity of one [`MemBackend`] file. Sized so the error log can pass its
/// rotation threshold.
pub const MEM_FILE_CAPACITY: usize = 12 * 1024;

const MEM_FILES: usize = 8;
const MEM_NAME_LEN: usize = 16;

struct MemFile {
    used: bool,
    name_len: u8,
    name: [u8; MEM_NAME_LEN],
    len: usize,
    data: [u8; MEM_FILE_CAPACITY],
}

impl MemFile {
    const EMPTY: Self = Self {
        used: false,
        name_len: 0,
        name: [0; MEM_NAME_LEN],
        len: 0,
        data: [0; MEM_FILE_CAPACITY],
    };

    fn matches(&self, name: &str) -> bool {
        self.used && &self.name[..self.name_len as usize] == name.as_bytes()
    }

    fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(MEM_NAME_LEN);
        self.name[..len].copy_from_slice(&bytes[..len]);
        self.name_len = len as u8;
    }
}

/// Fixed-slot in-memory [`StorageBackend`] for hosts and tests.
pub struct MemBackend {
    files: [MemFile; MEM_FILES],
}

impl MemBackend {
    pub fn new() -> Self {
        Self {
            files: [MemFile::EMPTY; MEM_FILES],
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.matches(name))
    }

    fn find_or_alloc(&mut self, name: &str) -> Result<usize, StorageError> {
        if let Some(i) = self.find(name) {
            return Ok(i);
        }
        let i = self
            .files
            .iter()
            .position(|f| !f.used)
            .ok_or(StorageError::Io)?;
        let file = &mut self.files[i];
        file.used = true;
        file.len = 0;
        file.set_name(name);
        Ok(i)
    }
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemBackend {
    fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let i = self.find(name).ok_or(StorageError::NotFound)?;
        let file = &self.files[i];
        if file.len > buf.len() {
            return Err(StorageError::TooLarge);
        }
        buf[..file.len].copy_from_slice(&file.data[..file.len]);
        Ok(file.len)
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MEM_FILE_CAPACITY {
            return Err(StorageError::TooLarge);
        }
        let i = self.find_or_alloc(name)?;
        let file = &mut self.files[i];
        file.data[..data.len()].copy_from_slice(data);
        file.len = data.len();
        Ok(())
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let i = self.find_or_alloc(name)?;
        let file = &mut self.files[i];
        if file.len + data.len() > MEM_FILE_CAPACITY {
            return Err(StorageError::TooLarge);
        }
        file.data[file.len..file.len + data.len()].copy_from_slice(data);
        file.len += data.len();
        Ok(())
    }

    fn size(&mut self, name: &str) -> Option<usize> {
        self.find(name).map(|i| self.files[i].len)
    }

    fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        let i = self.find(name).ok_or(StorageError::NotFound)?;
        self.files[i].used = false;
        self.files[i].len = 0;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        if let Some(existing) = self.find(to) {
            self.files[existing].used = false;
        }
        let i = self.find(from).ok_or(StorageError::NotFound)?;
        self.files[i].set_name(to);
        Ok(())
    }

    fn exists(&mut self, name: &str) -> bool {
        self.find(name).is_some()
    }
}


impl core::fmt::Debug for MemBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        for file in self.files.iter().filter(|f| f.used) {
            let name = core::str::from_utf8(&file.name[..file.name_len as usize]).unwrap_or("?");
            list.entry(&(name, file.len));
        }
        list.finish()
    }
}
