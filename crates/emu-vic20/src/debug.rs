//! Typed debug interface: breakpoints and argument validation.
//!
//! The machine checks the breakpoint set against each retired
//! instruction; a match moves the run loop into the `Breakpoint` state.

use emu_6502::{ExecutedInstruction, Mnemonic};
use thiserror::Error;

/// Programmer errors on the debug interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    #[error("invalid memory page {page} (valid pages are 0-255)")]
    InvalidPage { page: usize },
}

/// A condition that pauses the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// An instruction was fetched from this address.
    Instruction(u16),
    /// An instruction with this mnemonic retired.
    Mnemonic(Mnemonic),
    /// An instruction read or wrote this address.
    MemoryAccess(u16),
}

/// The machine's breakpoint set.
#[derive(Debug, Default)]
pub struct Debugger {
    breakpoints: Vec<Breakpoint>,
}

impl Debugger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            breakpoints: Vec::new(),
        }
    }

    pub fn add(&mut self, breakpoint: Breakpoint) {
        if !self.breakpoints.contains(&breakpoint) {
            self.breakpoints.push(breakpoint);
        }
    }

    pub fn remove(&mut self, breakpoint: Breakpoint) {
        self.breakpoints.retain(|bp| *bp != breakpoint);
    }

    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// First breakpoint matching a retired instruction.
    #[must_use]
    pub fn matches(&self, executed: &ExecutedInstruction) -> Option<Breakpoint> {
        self.breakpoints.iter().copied().find(|bp| match bp {
            Breakpoint::Instruction(addr) => executed.pc == *addr,
            Breakpoint::Mnemonic(mnemonic) => executed.mnemonic == *mnemonic,
            Breakpoint::MemoryAccess(addr) => executed.mem_addr == Some(*addr),
        })
    }
}
