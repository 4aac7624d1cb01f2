//! Top-level application state for the control core.
//!
//! Owns the configuration, persistence, error handling, input decoding and
//! the motor controller; the synthesis core only ever sees the shared
//! [`ParamExchange`]. The firmware constructs one `App` in `main` and calls
//! [`App::tick`] from its control loop; hosts construct it around
//! [`MemBackend`](crate::storage::MemBackend) for end-to-end tests.

use core::fmt::Write;

use crate::config::GlobalConfig;
use crate::console::{self, CliDeps};
use crate::errors::{ErrorHandler, ErrorKind, ErrorOutcome};
use crate::exchange::ParamExchange;
use crate::input::InputDecoder;
use crate::motor::{MotorController, RelayIo};
use crate::status::StatusBus;
use crate::storage::{SettingsOrigin, Storage, StorageBackend, SETTINGS_FILE};

pub struct App<'e, R: RelayIo, B: StorageBackend> {
    pub config: GlobalConfig,
    pub storage: Storage<B>,
    pub errors: ErrorHandler,
    pub input: InputDecoder,
    pub controller: MotorController<'e>,
    pub relays: R,
    status: &'e StatusBus,
}

impl<'e, R: RelayIo, B: StorageBackend> App<'e, R, B> {
    /// Boot the control core: load (or migrate) settings, apply the boot
    /// policy, optionally auto-start, and mark the system initialised so the
    /// synthesis core may proceed.
    pub fn new(
        exchange: &'e ParamExchange,
        status: &'e StatusBus,
        backend: B,
        relays: R,
        now_ms: u32,
    ) -> Self {
        let mut storage = Storage::new(backend);
        let had_settings = storage.backend_mut().exists(SETTINGS_FILE);
        let (mut config, origin) = storage.load_config();

        let errors = ErrorHandler::new();
        let controller = MotorController::new(exchange, &mut config, now_ms);

        let mut input = InputDecoder::new();
        input.set_reverse(config.reverse_encoder);

        let mut app = Self {
            config,
            storage,
            errors,
            input,
            controller,
            relays,
            status,
        };

        // A settings file that existed but would not load is recoverable:
        // defaults are already active, report and continue booting.
        if had_settings && origin == SettingsOrigin::Defaults {
            app.report_error(now_ms, ErrorKind::SettingsCorrupt, "settings reset to defaults", false);
        }

        if app.config.auto_boot && app.config.auto_start {
            app.controller
                .start(&mut app.config, &mut app.relays, now_ms);
        }

        app.publish_status();
        status.mark_initialised();
        app
    }

    /// One control-loop iteration: advance the state machine, refresh the
    /// status bus, flush any deferred settings save.
    pub fn tick(&mut self, now_ms: u32) {
        self.controller
            .update(&mut self.config, &mut self.relays, now_ms);
        self.publish_status();

        if self.controller.take_deferred_save(now_ms) {
            let _ = self.storage.save_config(&self.config);
        }
    }

    /// Handle one console line.
    pub fn handle_line(&mut self, line: &str, now_ms: u32, out: &mut dyn Write) {
        let mut deps = CliDeps {
            controller: &mut self.controller,
            config: &mut self.config,
            storage: &mut self.storage,
            errors: &self.errors,
            input: &mut self.input,
            relays: &mut self.relays,
            now_ms,
        };
        console::execute(line, &mut deps, out);

        self.input.set_reverse(self.config.reverse_encoder);
        self.publish_status();
    }

    /// Report a system error. Critical reports force every mute relay to the
    /// muted level immediately; the state machine is left untouched.
    pub fn report_error(
        &mut self,
        now_ms: u32,
        kind: ErrorKind,
        message: &str,
        critical: bool,
    ) -> ErrorOutcome {
        let outcome = self.errors.report(
            &mut self.storage,
            &self.config,
            now_ms,
            kind,
            message,
            critical,
        );
        if outcome.mute_required {
            self.controller.emergency_mute(&self.config, &mut self.relays);
        }
        outcome
    }

    /// Snapshot the current configuration into a preset slot.
    pub fn save_preset(&mut self, slot: usize) -> bool {
        self.storage.save_preset(slot, &self.config).is_ok()
    }

    /// Replace the configuration from a preset slot and re-stage the
    /// synthesis parameters.
    pub fn load_preset(&mut self, slot: usize) -> bool {
        match self.storage.load_preset(slot) {
            Ok(config) => {
                self.config = config;
                self.input.set_reverse(self.config.reverse_encoder);
                self.controller.apply_profile(&self.config);
                true
            }
            Err(_) => false,
        }
    }

    fn publish_status(&self) {
        self.status.set_state(self.controller.state());
        self.status.set_frequency(self.controller.current_frequency());
        self.status.set_pitch(self.controller.pitch_percent());
    }
}
