//! Synthesis-core hardware: PWM slices, chained DMA and the refill loop.
//!
//! Two PWM slices carry the four phases (slice 0 → GPIO 0/1, slice 1 →
//! GPIO 2/3). Each slice gets a ping/pong pair of DMA channels chain-linked
//! to each other, paced by that slice's PWM-wrap DREQ, writing packed
//! compare values straight into the slice CC register. Transfers restart
//! without CPU involvement; the DMA completion interrupt only resets read
//! addresses and signals which buffer half is free to rewrite.
//!
//! Core 1 runs [`core1_task`]: wait for a free half, promote any pending
//! parameter block, render 256 ticks into it.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use rp2040_hal::dma::{Channel, SingleChannel, CH0, CH1, CH2, CH3};
use rp2040_hal::pac::{self, interrupt};
use rp2040_hal::Timer;

use ttdrive::eventlog::EventLog;
use ttdrive::exchange::ParamExchange;
use ttdrive::{log_info, log_warn};
use ttdrive::status::StatusBus;
use ttdrive::waveform::{DdsEngine, BUFFER_WORDS};

/// PWM wrap DREQ for slice 0; slice n is `DREQ_PWM_WRAP0 + n`.
const DREQ_PWM_WRAP0: u32 = 24;

/// Centre compare for both slice channels (silent output).
const CENTRE_WORD: u32 = (512 << 16) | 512;

/// No buffer pending.
const IDX_NONE: u8 = 0xFF;

// Wrapper to make UnsafeCell Sync for the static DMA buffers.
// SAFETY: the ping/pong protocol guarantees the refill task only writes the
// half the DMA is not reading, and the ISR only resets read addresses.
#[repr(transparent)]
struct SyncCell<T>(UnsafeCell<T>);
unsafe impl<T> Sync for SyncCell<T> {}

impl<T> SyncCell<T> {
    const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

// Double buffers, one pair per slice, pre-set to centre so the output is
// quiet until the first refill.
static SLICE_A_BUF: [SyncCell<[u32; BUFFER_WORDS]>; 2] = [
    SyncCell::new([CENTRE_WORD; BUFFER_WORDS]),
    SyncCell::new([CENTRE_WORD; BUFFER_WORDS]),
];
static SLICE_B_BUF: [SyncCell<[u32; BUFFER_WORDS]>; 2] = [
    SyncCell::new([CENTRE_WORD; BUFFER_WORDS]),
    SyncCell::new([CENTRE_WORD; BUFFER_WORDS]),
];

// ISR → refill task signal. The ISR is the only writer of both; sequence is
// bumped after the index so a reader that sees a new sequence reads a valid
// index. Load/store only, no RMW on this core.
static BUFFER_SEQ: AtomicU32 = AtomicU32::new(0);
static FREE_IDX: AtomicU8 = AtomicU8::new(IDX_NONE);

struct DmaPlan {
    read0: u32,
    read1: u32,
    read2: u32,
    read3: u32,
}

static DMA_PLAN: SyncCell<DmaPlan> = SyncCell::new(DmaPlan {
    read0: 0,
    read1: 0,
    read2: 0,
    read3: 0,
});

/// Program the four DMA channels: ch0/ch1 ping-pong into slice A's CC
/// register, ch2/ch3 into slice B's, each chained to its partner and paced
/// by the owning slice's wrap DREQ. Returns with nothing started.
fn setup_dma(
    ch0: &mut Channel<CH0>,
    ch1: &mut Channel<CH1>,
    ch2: &mut Channel<CH2>,
    ch3: &mut Channel<CH3>,
    slice_a: usize,
    slice_b: usize,
) {
    let cc_a = unsafe { (*pac::PWM::ptr()).ch(slice_a).cc().as_ptr() } as u32;
    let cc_b = unsafe { (*pac::PWM::ptr()).ch(slice_b).cc().as_ptr() } as u32;

    let read0 = SLICE_A_BUF[0].0.get() as u32;
    let read1 = SLICE_A_BUF[1].0.get() as u32;
    let read2 = SLICE_B_BUF[0].0.get() as u32;
    let read3 = SLICE_B_BUF[1].0.get() as u32;

    // The ISR needs the buffer addresses to reset read pointers.
    // SAFETY: written once before interrupts are enabled.
    unsafe {
        *DMA_PLAN.0.get() = DmaPlan {
            read0,
            read1,
            read2,
            read3,
        };
    }

    program_channel(ch0.ch(), read0, cc_a, DREQ_PWM_WRAP0 + slice_a as u32, 1);
    program_channel(ch1.ch(), read1, cc_a, DREQ_PWM_WRAP0 + slice_a as u32, 0);
    program_channel(ch2.ch(), read2, cc_b, DREQ_PWM_WRAP0 + slice_b as u32, 3);
    program_channel(ch3.ch(), read3, cc_b, DREQ_PWM_WRAP0 + slice_b as u32, 2);

    // Completion interrupts from slice A's pair are enough to know when a
    // half is free: all four channels run in lockstep off the same PWM rate.
    ch0.enable_irq0();
    ch1.enable_irq0();
}

fn program_channel(ch: &pac::dma::CH, read: u32, write: u32, treq: u32, chain_to: u32) {
    ch.ch_read_addr().write(|w| unsafe { w.bits(read) });
    ch.ch_write_addr().write(|w| unsafe { w.bits(write) });
    ch.ch_trans_count()
        .write(|w| unsafe { w.bits(BUFFER_WORDS as u32) });

    let irq_quiet: u32 = 0;
    let ring_sel: u32 = 0;
    let ring_size: u32 = 0;
    let incr_write: u32 = 0; // fixed CC register
    let incr_read: u32 = 1; // walk the buffer
    let data_size: u32 = 2; // 32-bit words
    let high_priority: u32 = 1;
    let en: u32 = 1;

    let ctrl = (irq_quiet << 21)
        | (treq << 15)
        | (chain_to << 11)
        | (ring_sel << 10)
        | (ring_size << 9)
        | (incr_write << 5)
        | (incr_read << 4)
        | (data_size << 2)
        | (high_priority << 1)
        | en;

    // AL1 alias: configure without triggering.
    ch.ch_al1_ctrl().write(|w| unsafe { w.bits(ctrl) });
}

/// Kick both ping channels in the same cycle so the slices stay aligned.
fn start_dma() {
    let dma = unsafe { &*pac::DMA::ptr() };
    dma.multi_chan_trigger()
        .write(|w| unsafe { w.bits((1 << 0) | (1 << 2)) });
}

/// DMA completion: one half just finished streaming. Reset the finished
/// channels' read addresses for their next (chained) turn and hand the half
/// to the refill task. Synthesis state stays with the refill task; this
/// only does DMA bookkeeping.
#[interrupt]
fn DMA_IRQ_0() {
    let dma = unsafe { &*pac::DMA::ptr() };
    let ints = dma.ints0().read().bits();
    // SAFETY: read-only after setup_dma.
    let plan = unsafe { &*DMA_PLAN.0.get() };

    if ints & (1 << 0) != 0 {
        dma.ints0().write(|w| unsafe { w.bits(1 << 0) });
        // ch0/ch2 finished half 0; ch1/ch3 are streaming half 1.
        dma.ch(0).ch_read_addr().write(|w| unsafe { w.bits(plan.read0) });
        dma.ch(2).ch_read_addr().write(|w| unsafe { w.bits(plan.read2) });
        signal_free(0);
    }
    if ints & (1 << 1) != 0 {
        dma.ints0().write(|w| unsafe { w.bits(1 << 1) });
        dma.ch(1).ch_read_addr().write(|w| unsafe { w.bits(plan.read1) });
        dma.ch(3).ch_read_addr().write(|w| unsafe { w.bits(plan.read3) });
        signal_free(1);
    }
}

#[inline]
fn signal_free(index: u8) {
    FREE_IDX.store(index, Ordering::Relaxed);
    let seq = BUFFER_SEQ.load(Ordering::Relaxed);
    BUFFER_SEQ.store(seq.wrapping_add(1), Ordering::Release);
}

/// Core 1 entry: buffer refill loop.
///
/// Spins until the control core finishes setup, programs the DMA, then
/// renders every freed half from the freshly promoted parameter snapshot.
pub fn core1_task(
    exchange: &'static ParamExchange,
    status: &'static StatusBus,
    log: &'static EventLog,
    timer: Timer,
    mut ch0: Channel<CH0>,
    mut ch1: Channel<CH1>,
    mut ch2: Channel<CH2>,
    mut ch3: Channel<CH3>,
    slice_a: usize,
    slice_b: usize,
) -> ! {
    while !status.is_initialised() {
        core::hint::spin_loop();
    }

    let mut engine = DdsEngine::new();

    // Both halves start valid (centre), so the DMA can run ahead of the
    // first refill.
    setup_dma(&mut ch0, &mut ch1, &mut ch2, &mut ch3, slice_a, slice_b);

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::DMA_IRQ_0);
    }

    start_dma();

    let millis = |t: &Timer| (t.get_counter().ticks() / 1000) as u32;
    log_info!(log, millis(&timer), "synthesis core up");

    let mut last_seq = BUFFER_SEQ.load(Ordering::Acquire);
    loop {
        let seq = BUFFER_SEQ.load(Ordering::Acquire);
        if seq == last_seq {
            core::hint::spin_loop();
            continue;
        }
        if seq.wrapping_sub(last_seq) > 1 {
            // A half went out stale; parameters were late by one buffer.
            log_warn!(log, millis(&timer), "refill overrun ({} missed)", seq.wrapping_sub(last_seq) - 1);
        }
        last_seq = seq;

        let index = FREE_IDX.load(Ordering::Relaxed);
        if index == IDX_NONE {
            continue;
        }
        let index = index as usize & 1;

        // Parameter promotion happens here, at the buffer boundary.
        let state = exchange.begin_buffer();

        // SAFETY: `index` was just handed over by the ISR; the DMA is
        // streaming the other half until our next signal.
        let (buf_a, buf_b) = unsafe {
            (
                &mut *SLICE_A_BUF[index].0.get(),
                &mut *SLICE_B_BUF[index].0.get(),
            )
        };
        engine.fill(&state, buf_a, buf_b);
    }
}
