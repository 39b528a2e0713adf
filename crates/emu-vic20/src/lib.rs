//! Cycle-accurate Commodore VIC-20 emulator.
//!
//! A composition of a MOS 6502 CPU, a 64 KiB bus with per-address
//! dispatch and bank-level write protection, two VIA 6522 interface
//! adapters and a VIC 6560/6561 video chip, all clocked in lock-step at
//! the bus frequency (1,108,404 Hz PAL, 1,022,727 Hz NTSC). One frame is
//! 312 lines x 71 cycles (PAL) or 261 x 65 (NTSC).
//!
//! VIA1 drives the CPU's NMI line and VIA2 its IRQ line; the keyboard
//! matrix hangs off VIA2 and the joystick is split across both chips.

mod bus;
mod cartridge;
mod config;
mod debug;
pub mod input;
mod keyboard;
mod palette;
mod rom;
pub mod vic;
mod vic20;

pub use bus::{JoystickState, Vic20Bus};
pub use cartridge::{Cartridge, CartridgeImage, AUTOBOOT_ADDR};
pub use config::{MemoryModel, Region, Vic20Config};
pub use debug::{Breakpoint, DebugError, Debugger};
pub use input::{InputQueue, Vic20Key};
pub use keyboard::KeyboardMatrix;
pub use palette::PALETTE;
pub use rom::{
    CartridgeEntry, RomError, RomFileType, RomImage, RomIndexEntry, RomRegion, RomSet,
};
pub use vic::{SoundState, Vic, VicRevision, VicTiming, Voice};
pub use vic20::{FramePacer, MachineState, Vic20};
