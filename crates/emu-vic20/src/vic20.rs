//! Top-level VIC-20 system.
//!
//! The machine clocks every component in lock-step at the bus frequency
//! (1,108,404 Hz PAL / 1,022,727 Hz NTSC). Each tick, in order:
//!
//! 1. sample VIA1's IRQ line
//! 2. VIA1 `cycle_up`
//! 3. VIA2 `cycle_up`
//! 4. a rising VIA1 line requests NMI (edge-triggered)
//! 5. an asserted VIA2 line requests IRQ (level-triggered)
//! 6. CPU cycle
//! 7. VIC cycle
//! 8. VIA1 `cycle_down`
//! 9. VIA2 `cycle_down`
//!
//! The run loop is a state machine: `Stopped` until ROMs are in and
//! `reset` is called (`Loaded`), `start` begins `Running`, and a
//! breakpoint match drops into `Breakpoint` until restarted. Fatal CPU
//! errors stop the machine and keep the fault for inspection.

use std::time::Instant;

use emu_6502::{CpuError, History, Mos6502};
use emu_core::{MasterClock, Observable, Tickable, Value};

use crate::bus::{JoystickState, Vic20Bus};
use crate::cartridge::Cartridge;
use crate::config::{MemoryModel, Region, Vic20Config};
use crate::debug::{Breakpoint, DebugError, Debugger};
use crate::input::{InputQueue, Vic20Key};
use crate::rom::{RomError, RomImage, RomSet};
use crate::vic::VicRevision;

/// Keyboard buffer location in zero page / low RAM.
const KEYBOARD_BUFFER: u16 = 0x0277;
/// Pending-key count location.
const KEYBOARD_COUNT: u16 = 0x00C6;
/// Kernal keyboard buffer capacity.
const KEYBOARD_BUFFER_SIZE: usize = 10;

/// Where the non-autoboot cartridge bootstrap lives (SYS320).
const BOOTSTRAP_ADDR: u16 = 0x0140;

/// Fixed ROM load addresses.
const CHARACTER_ROM_ADDR: u16 = 0x8000;
const BASIC_ROM_ADDR: u16 = 0xC000;
const KERNAL_ROM_ADDR: u16 = 0xE000;

/// Frames between actual-FPS measurements.
const RECALIBRATE_FRAMES: u32 = 50;

/// Run-loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    /// No ticks run. A fatal CPU error also lands here.
    Stopped,
    /// ROMs installed and CPU reset; ready to start.
    Loaded,
    /// The frame loop is live.
    Running,
    /// Paused by a breakpoint match.
    Breakpoint,
}

/// Frame pacing: measures the achieved frame rate every
/// `RECALIBRATE_FRAMES` frames and, with auto-speed on, adjusts the
/// host's inter-frame delay multiplicatively toward the target rate.
/// The host owns the actual sleeping; this only does the arithmetic.
pub struct FramePacer {
    frame_delay_ms: f64,
    target_fps: f64,
    auto_speed: bool,
    frames_in_window: u32,
    window_start: Instant,
    actual_fps: f64,
}

impl FramePacer {
    #[must_use]
    pub fn new(target_fps: f64) -> Self {
        Self {
            frame_delay_ms: 1000.0 / target_fps,
            target_fps,
            auto_speed: true,
            frames_in_window: 0,
            window_start: Instant::now(),
            actual_fps: target_fps,
        }
    }

    /// Account one finished frame.
    pub fn end_frame(&mut self) {
        self.frames_in_window += 1;
        if self.frames_in_window < RECALIBRATE_FRAMES {
            return;
        }

        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.actual_fps = f64::from(RECALIBRATE_FRAMES) / elapsed;
            if self.auto_speed {
                let ratio = self.actual_fps / self.target_fps;
                self.frame_delay_ms = (self.frame_delay_ms * ratio).clamp(0.1, 1000.0);
                log::debug!(
                    "pacing: {:.2} fps measured, frame delay now {:.3} ms",
                    self.actual_fps,
                    self.frame_delay_ms
                );
            }
        }
        self.frames_in_window = 0;
        self.window_start = Instant::now();
    }

    /// Delay the host should wait between frames, in milliseconds.
    #[must_use]
    pub fn frame_delay_ms(&self) -> f64 {
        self.frame_delay_ms
    }

    /// Most recently measured frame rate.
    #[must_use]
    pub fn actual_fps(&self) -> f64 {
        self.actual_fps
    }

    #[must_use]
    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    pub fn set_auto_speed(&mut self, enabled: bool) {
        self.auto_speed = enabled;
    }
}

/// The VIC-20.
pub struct Vic20 {
    cpu: Mos6502,
    bus: Vic20Bus,
    state: MachineState,
    region: Region,
    master_clock: u64,
    frame_count: u64,
    pacer: FramePacer,
    input_queue: InputQueue,
    debugger: Debugger,
    fault: Option<CpuError>,
}

impl Vic20 {
    /// Build a machine and install its ROMs. The machine starts
    /// `Stopped`; call `reset` and `start` to run it.
    #[must_use]
    pub fn new(config: &Vic20Config) -> Self {
        let revision = match config.region {
            Region::Pal => VicRevision::Pal6561,
            Region::Ntsc => VicRevision::Ntsc6560,
        };
        let mut bus = Vic20Bus::new(revision, config.memory);

        bus.load_block(CHARACTER_ROM_ADDR, &config.character_rom);
        bus.load_block(BASIC_ROM_ADDR, &config.basic_rom);
        bus.load_block(KERNAL_ROM_ADDR, &config.kernal_rom);
        log::info!(
            "installed ROMs ({:?}, {} memory): char {} bytes, basic {} bytes, kernal {} bytes",
            config.region,
            config.memory,
            config.character_rom.len(),
            config.basic_rom.len(),
            config.kernal_rom.len(),
        );

        let target_fps = bus.vic.frames_per_second();

        Self {
            cpu: Mos6502::new(),
            bus,
            state: MachineState::Stopped,
            region: config.region,
            master_clock: 0,
            frame_count: 0,
            pacer: FramePacer::new(target_fps),
            input_queue: InputQueue::new(),
            debugger: Debugger::new(),
            fault: None,
        }
    }

    /// Build a machine from a loaded ROM package, choosing the kernal
    /// for the requested region.
    #[must_use]
    pub fn from_rom_set(roms: &RomSet, region: Region, memory: MemoryModel) -> Self {
        Self::new(&Vic20Config {
            region,
            memory,
            character_rom: roms.character.data.clone(),
            basic_rom: roms.basic.data.clone(),
            kernal_rom: roms.kernal_for(region).data.clone(),
        })
    }

    /// Reset every device and the CPU (PC from the kernal reset vector),
    /// moving to `Loaded`.
    pub fn reset(&mut self) {
        self.bus.vic.reset();
        self.bus.via1.reset();
        self.bus.via2.reset();
        self.bus.keyboard.release_all();
        self.cpu.reset(&mut self.bus, None, None);
        self.fault = None;
        self.state = MachineState::Loaded;
        log::debug!("reset: PC={:#06X}", self.cpu.regs.pc);
    }

    /// Begin (or resume) running.
    pub fn start(&mut self) {
        if matches!(self.state, MachineState::Loaded | MachineState::Breakpoint) {
            self.state = MachineState::Running;
        }
    }

    /// Pause cooperatively.
    pub fn pause(&mut self) {
        if self.state == MachineState::Running {
            self.state = MachineState::Breakpoint;
        }
    }

    /// Stop the run loop entirely.
    pub fn stop(&mut self) {
        self.state = MachineState::Stopped;
    }

    #[must_use]
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// The fatal CPU error that stopped the machine, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&CpuError> {
        self.fault.as_ref()
    }

    // ---------------------------------------------------------------------
    // Clocking
    // ---------------------------------------------------------------------

    /// One bus tick with the full device wiring.
    fn tick_internal(&mut self) -> Result<(), CpuError> {
        self.master_clock += 1;

        let last_nmi = self.bus.via1.irq_line();
        self.bus.via1.cycle_up();
        self.bus.via2.cycle_up();

        // VIA1 drives NMI: edge-triggered, once per low-to-high
        // transition. The samples must not disturb guest-visible VIA
        // state, so they read the pure line level.
        if !last_nmi && self.bus.via1.irq_line() {
            self.cpu.request_nmi();
        }
        // VIA2 drives IRQ: level-triggered.
        if self.bus.via2.irq_line() {
            self.cpu.request_irq();
        }

        self.cpu.cycle(&mut self.bus)?;

        let Vic20Bus { vic, ram, .. } = &mut self.bus;
        vic.tick(ram);

        self.bus.via1.cycle_down();
        self.bus.via2.cycle_down();
        Ok(())
    }

    /// Run a fixed number of ticks (for tests and single-stepping).
    ///
    /// # Errors
    ///
    /// Propagates fatal CPU conditions; the machine stops on the first.
    pub fn run_cycles(&mut self, count: u64) -> Result<(), CpuError> {
        for _ in 0..count {
            if let Err(err) = self.tick_internal() {
                self.fault = Some(err.clone());
                self.state = MachineState::Stopped;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Run one frame of emulation.
    ///
    /// Applies due input-queue events, then ticks until the VIC signals
    /// frame completion or a breakpoint fires. Returns the ticks run.
    ///
    /// # Errors
    ///
    /// A fatal CPU error stops the machine; the partially rendered frame
    /// is not flushed.
    pub fn run_frame(&mut self) -> Result<u64, CpuError> {
        if self.state != MachineState::Running {
            return Ok(0);
        }

        self.input_queue
            .process(self.frame_count, &mut self.bus.keyboard);
        self.frame_count += 1;

        let start = self.master_clock;
        loop {
            let retired_before = self.cpu.history().total_recorded();

            if let Err(err) = self.tick_internal() {
                log::info!("fatal CPU error: {err}");
                self.fault = Some(err.clone());
                self.state = MachineState::Stopped;
                return Err(err);
            }

            if !self.debugger.is_empty()
                && self.cpu.history().total_recorded() != retired_before
            {
                if let Some(entry) = self.cpu.history().last() {
                    if let Some(breakpoint) = self.debugger.matches(entry) {
                        log::info!("breakpoint {breakpoint:?} hit at {:#06X}", entry.pc);
                        self.state = MachineState::Breakpoint;
                        break;
                    }
                }
            }

            if self.bus.vic.take_frame_complete() {
                self.pacer.end_frame();
                break;
            }
        }

        Ok(self.master_clock - start)
    }

    // ---------------------------------------------------------------------
    // Program and cartridge loading
    // ---------------------------------------------------------------------

    /// Install a cartridge.
    ///
    /// Parts land at their embedded load addresses. A BLK5 ($A000) part
    /// autoboots through the kernal; anything else gets a bootstrap stub
    /// at $0140 and `SYS320` typed into the keyboard buffer.
    pub fn attach_cartridge(&mut self, cartridge: &Cartridge) {
        for part in &cartridge.parts {
            log::info!(
                "cartridge {:?}: {} bytes at {:#06X}",
                cartridge.name,
                part.data.len(),
                part.load_addr
            );
            self.bus.load_block(part.load_addr, &part.data);
        }

        if !cartridge.is_autoboot() {
            let target = cartridge
                .parts
                .first()
                .map_or(BOOTSTRAP_ADDR, |part| part.load_addr);
            let [lo, hi] = target.to_le_bytes();
            self.bus.load_block(BOOTSTRAP_ADDR, &[0x4C, lo, hi]);
            self.inject_keyboard_buffer("SYS320\r");
        }
    }

    /// Install a raw ROM image at its embedded load address.
    pub fn install_rom(&mut self, image: &RomImage) {
        self.bus.load_block(image.load_addr, &image.data);
    }

    /// Load a PRG-style program (2-byte load address + payload) into RAM.
    ///
    /// When it lands at the BASIC text start, the variable/array/string
    /// pointers are fixed up so the interpreter sees the program.
    ///
    /// # Errors
    ///
    /// The image must be at least three bytes.
    pub fn load_prg(&mut self, data: &[u8]) -> Result<u16, RomError> {
        if data.len() < 3 {
            return Err(RomError::ImageTooShort {
                name: "prg".to_string(),
            });
        }
        let load_addr = u16::from_le_bytes([data[0], data[1]]);
        self.bus.load_block(load_addr, &data[2..]);

        let txttab = u16::from_le_bytes([self.bus.ram[0x2B], self.bus.ram[0x2C]]);
        if load_addr == txttab {
            let end = load_addr.wrapping_add((data.len() - 2) as u16);
            let [lo, hi] = end.to_le_bytes();
            // VARTAB, ARYTAB, STREND all point at the end of the program.
            self.bus.load_block(0x2D, &[lo, hi, lo, hi, lo, hi]);
        }

        Ok(load_addr)
    }

    /// Type into the kernal keyboard buffer directly: PETSCII bytes at
    /// $0277, pending count at $C6.
    pub fn inject_keyboard_buffer(&mut self, text: &str) {
        let bytes: Vec<u8> = text.bytes().take(KEYBOARD_BUFFER_SIZE).collect();
        self.bus.load_block(KEYBOARD_BUFFER, &bytes);
        self.bus.load_block(KEYBOARD_COUNT, &[bytes.len() as u8]);
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    /// Press a key immediately.
    pub fn press_key(&mut self, key: Vic20Key) {
        let (row, col) = key.matrix();
        self.bus.keyboard.set_key(row, col, true);
    }

    /// Release a key.
    pub fn release_key(&mut self, key: Vic20Key) {
        let (row, col) = key.matrix();
        self.bus.keyboard.set_key(row, col, false);
    }

    /// Release every key.
    pub fn release_all_keys(&mut self) {
        self.bus.keyboard.release_all();
    }

    /// Set the joystick lines.
    pub fn set_joystick(&mut self, state: JoystickState) {
        self.bus.joystick = state;
    }

    /// The timed input queue.
    pub fn input_queue(&mut self) -> &mut InputQueue {
        &mut self.input_queue
    }

    // ---------------------------------------------------------------------
    // Debugging
    // ---------------------------------------------------------------------

    /// The breakpoint set.
    pub fn debugger(&mut self) -> &mut Debugger {
        &mut self.debugger
    }

    /// Add a breakpoint (convenience).
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.debugger.add(breakpoint);
    }

    /// A 256-byte page of the address space, read without side effects.
    ///
    /// # Errors
    ///
    /// Pages above 255 are rejected.
    pub fn memory_page(&self, page: usize) -> Result<[u8; 256], DebugError> {
        if page > 0xFF {
            return Err(DebugError::InvalidPage { page });
        }
        let base = (page as u16) << 8;
        let mut out = [0u8; 256];
        for (offset, byte) in out.iter_mut().enumerate() {
            *byte = self.bus.peek(base | offset as u16);
        }
        Ok(out)
    }

    /// Return addresses currently on the stack page, innermost first.
    #[must_use]
    pub fn call_stack(&self) -> Vec<u16> {
        let mut frames = Vec::new();
        let mut sp = self.cpu.regs.s;
        while sp < 0xFE {
            let lo = self.bus.ram[0x0100 + usize::from(sp) + 1];
            let hi = self.bus.ram[0x0100 + usize::from(sp) + 2];
            frames.push(u16::from_le_bytes([lo, hi]).wrapping_add(1));
            sp += 2;
        }
        frames
    }

    /// CPU execution history.
    #[must_use]
    pub fn history(&self) -> &History {
        self.cpu.history()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &Vic20Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Vic20Bus {
        &mut self.bus
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The machine's bus clock.
    #[must_use]
    pub fn clock(&self) -> MasterClock {
        MasterClock::new(u64::from(self.bus.vic.timing().bus_frequency_hz))
    }

    pub fn pacer(&mut self) -> &mut FramePacer {
        &mut self.pacer
    }

    /// Reference to the framebuffer (ARGB32).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        self.bus.vic.framebuffer()
    }

    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        self.bus.vic.screen_width()
    }

    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        self.bus.vic.screen_height()
    }
}

impl Tickable for Vic20 {
    /// One bus tick. Fatal CPU errors stop the machine and are kept in
    /// `fault()` (the trait has no error channel).
    fn tick(&mut self) {
        if let Err(err) = self.tick_internal() {
            self.fault = Some(err);
            self.state = MachineState::Stopped;
        }
    }
}

impl Observable for Vic20 {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("via1.") {
            return self.query_via(rest, true);
        }
        if let Some(rest) = path.strip_prefix("via2.") {
            return self.query_via(rest, false);
        }
        if let Some(rest) = path.strip_prefix("vic.") {
            return match rest {
                "line" => Some(Value::U32(self.bus.vic.raster_line().max(0) as u32)),
                "cycle" => Some(self.bus.vic.raster_cycle().into()),
                _ => None,
            };
        }
        if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$'))
            {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            return addr.map(|a| Value::U8(self.bus.peek(a)));
        }
        match path {
            "pc" => Some(self.cpu.regs.pc.into()),
            "a" => Some(self.cpu.regs.a.into()),
            "x" => Some(self.cpu.regs.x.into()),
            "y" => Some(self.cpu.regs.y.into()),
            "sp" => Some(self.cpu.regs.s.into()),
            "p" => Some(self.cpu.regs.p.0.into()),
            "master_clock" => Some(self.master_clock.into()),
            "frame_count" => Some(self.frame_count.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "sp",
            "p",
            "vic.line",
            "vic.cycle",
            "via1.timer1",
            "via1.timer2",
            "via1.ifr",
            "via1.ier",
            "via2.timer1",
            "via2.timer2",
            "via2.ifr",
            "via2.ier",
            "memory.<address>",
            "master_clock",
            "frame_count",
        ]
    }
}

impl Vic20 {
    fn query_via(&self, rest: &str, first: bool) -> Option<Value> {
        let via = if first { &self.bus.via1 } else { &self.bus.via2 };
        match rest {
            "timer1" => Some(via.timer1().into()),
            "timer2" => Some(via.timer2().into()),
            "ifr" => Some(via.ifr().into()),
            "ier" => Some(via.ier().into()),
            _ => None,
        }
    }
}
