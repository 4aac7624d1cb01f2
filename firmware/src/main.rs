//! TT Control firmware entry point (RP2040).
//!
//! Core 0: configuration, motor state machine, relays, encoder, console,
//! watchdog. Core 1: DDS buffer refill (see `synth`). The cores share only
//! the parameter exchange and the status bus.
//!
//! Pin map: PWM phases A-D on GPIO 0-3; console UART1 on GPIO 8/9; main
//! encoder CLK/DT/SW on GPIO 10/11/12; standby relay on GPIO 16; per-phase
//! mute relays on GPIO 17-20.

#![no_std]
#![no_main]

mod flash;
mod synth;

use core::fmt::Write;

use cortex_m_rt::entry;
use defmt::info;
use defmt_rtt as _;
use embedded_hal::digital::{InputPin, OutputPin};
use fugit::{ExtU32, RateExtU32};
use panic_probe as _;

use rp2040_hal::{
    self as hal,
    clocks::init_clocks_and_plls,
    dma::DMAExt,
    gpio::{DynPinId, FunctionSioOutput, Pin, PullDown},
    multicore::{Multicore, Stack},
    pac,
    pwm::Slices,
    sio::Sio,
    uart::{DataBits, StopBits, UartConfig, UartPeripheral},
    watchdog::Watchdog,
    Clock, Timer,
};

use flash::FlashStore;
use ttdrive::app::App;
use ttdrive::eventlog::EventLog;
use ttdrive::exchange::ParamExchange;
use ttdrive::input::InputEvent;
use ttdrive::motor::RelayIo;
use ttdrive::status::StatusBus;
use ttdrive::waveform::PWM_TOP;

#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

const XTAL_FREQ_HZ: u32 = 12_000_000;

static EXCHANGE: ParamExchange = ParamExchange::new();
static STATUS: StatusBus = StatusBus::new();
static CORE0_LOG: EventLog = EventLog::new();
static CORE1_LOG: EventLog = EventLog::new();
static mut CORE1_STACK: Stack<4096> = Stack::new();

type OutPin = Pin<DynPinId, FunctionSioOutput, PullDown>;

/// Relay pins, raw levels; polarity lives in the controller.
struct BoardRelays {
    standby: OutPin,
    mutes: [OutPin; 4],
}

impl RelayIo for BoardRelays {
    fn write_mute(&mut self, channel: usize, level: bool) {
        if let Some(pin) = self.mutes.get_mut(channel) {
            let _ = if level { pin.set_high() } else { pin.set_low() };
        }
    }

    fn write_standby(&mut self, level: bool) {
        let _ = if level {
            self.standby.set_high()
        } else {
            self.standby.set_low()
        };
    }
}

fn millis(timer: &Timer) -> u32 {
    (timer.get_counter().ticks() / 1000) as u32
}

#[entry]
fn main() -> ! {
    info!("TT Control boot");

    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let clocks = init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let mut sio = Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Two PWM slices at ~50 kHz, 10-bit compare range.
    // 125 MHz / (50 kHz * 1024) = 2.44; nearest 8.4 divider is 2 + 7/16.
    let pwm_slices = Slices::new(pac.PWM, &mut pac.RESETS);
    let mut pwm0 = pwm_slices.pwm0;
    pwm0.set_top(PWM_TOP);
    pwm0.set_div_int(2);
    pwm0.set_div_frac(7);
    pwm0.enable();
    let mut pwm1 = pwm_slices.pwm1;
    pwm1.set_top(PWM_TOP);
    pwm1.set_div_int(2);
    pwm1.set_div_frac(7);
    pwm1.enable();

    // GPIO 0/1 ride slice 0 channels A/B, GPIO 2/3 slice 1.
    pwm0.channel_a.output_to(pins.gpio0);
    pwm0.channel_b.output_to(pins.gpio1);
    pwm1.channel_a.output_to(pins.gpio2);
    pwm1.channel_b.output_to(pins.gpio3);

    // Console: UART1 on GPIO 8/9, 115200 8N1.
    let uart_pins = (pins.gpio8.into_function(), pins.gpio9.into_function());
    let mut uart = UartPeripheral::new(pac.UART1, uart_pins, &mut pac.RESETS)
        .enable(
            UartConfig::new(115_200.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

    let mut enc_clk = pins.gpio10.into_pull_up_input();
    let mut enc_dt = pins.gpio11.into_pull_up_input();
    let mut enc_sw = pins.gpio12.into_pull_up_input();

    let relays = BoardRelays {
        standby: pins.gpio16.into_push_pull_output().into_dyn_pin(),
        mutes: [
            pins.gpio17.into_push_pull_output().into_dyn_pin(),
            pins.gpio18.into_push_pull_output().into_dyn_pin(),
            pins.gpio19.into_push_pull_output().into_dyn_pin(),
            pins.gpio20.into_push_pull_output().into_dyn_pin(),
        ],
    };

    let dma = pac.DMA.split(&mut pac.RESETS);
    let (ch0, ch1, ch2, ch3) = (dma.ch0, dma.ch1, dma.ch2, dma.ch3);

    // Launch the refill loop; it spins on the status bus until setup below
    // completes, then claims the DMA and starts streaming.
    let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
    let core1 = &mut mc.cores()[1];
    #[allow(static_mut_refs)]
    let core1_stack = unsafe { &mut CORE1_STACK.mem };
    core1
        .spawn(core1_stack, move || {
            synth::core1_task(
                &EXCHANGE, &STATUS, &CORE1_LOG, timer, ch0, ch1, ch2, ch3, 0, 1,
            )
        })
        .unwrap();

    let now = millis(&timer);
    let mut app: App<'_, BoardRelays, FlashStore> =
        App::new(&EXCHANGE, &STATUS, FlashStore::new(), relays, now);
    info!("control core up");
    ttdrive::log_info!(CORE0_LOG, now, "boot complete, state {}", app.controller.state().label());

    // Hardware watchdog: reset unless the control loop keeps ticking.
    watchdog.start(2_000_000u32.micros());

    let mut line = [0u8; 128];
    let mut line_len = 0usize;

    loop {
        let now = millis(&timer);

        // Encoder and switch.
        let clk = enc_clk.is_high().unwrap_or(false);
        let dt = enc_dt.is_high().unwrap_or(false);
        app.input.sample_encoder(clk, dt);
        let pressed = enc_sw.is_low().unwrap_or(false);
        app.input.update(now, pressed);

        if let Some(event) = app.input.take_event() {
            handle_event(&mut app, event, now);
        }
        let delta = app.input.take_delta();
        if delta != 0 && app.controller.is_running() {
            // With the display collaborator absent the encoder adjusts pitch.
            let pitch = app.controller.pitch_percent() + delta as f32 * app.config.pitch_step;
            app.controller.set_pitch(pitch);
        }

        // Console input, newline-terminated.
        while uart.uart_is_readable() {
            let mut byte = [0u8; 1];
            let n = match uart.read_raw(&mut byte) {
                Ok(n) => n,
                Err(_) => break,
            };
            if n == 0 {
                break;
            }

            let b = byte[0];
            if b == b'\n' || b == b'\r' {
                if line_len > 0 {
                    let text = core::str::from_utf8(&line[..line_len]).unwrap_or("");
                    app.handle_line(text, now, &mut uart);
                    line_len = 0;
                }
            } else if line_len < line.len() {
                line[line_len] = b;
                line_len += 1;
            }
        }

        app.tick(now);

        // Drain both cores' event logs to the console.
        for log in [&CORE0_LOG, &CORE1_LOG] {
            while let Some(entry) = log.pop() {
                let _ = writeln!(
                    uart,
                    "[{}] {} {}",
                    entry.millis,
                    entry.level.as_str(),
                    entry.message()
                );
            }
        }

        watchdog.feed();
    }
}

/// Front-panel policy while the display/menu collaborator is absent.
fn handle_event(app: &mut App<'_, BoardRelays, FlashStore>, event: InputEvent, now_ms: u32) {
    match event {
        InputEvent::Select => {
            app.controller
                .toggle_start_stop(&mut app.config, &mut app.relays, now_ms);
        }
        InputEvent::DoubleClick => {
            app.controller.cycle_speed(&mut app.config, now_ms);
        }
        InputEvent::Back => {
            app.controller
                .toggle_standby(&mut app.config, &mut app.relays, now_ms);
        }
        InputEvent::Exit | InputEvent::NavUp | InputEvent::NavDown => {}
    }
}
