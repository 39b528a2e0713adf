//! MOS 6502 interpreter.
//!
//! Each `cycle()` call accounts for exactly one bus cycle. An instruction
//! executes in full on its first cycle and then owes the remainder of its
//! base cycle count, tracked in `cycles_remaining`. `instruction_complete`
//! is true exactly when no cycles are owed, which is the only point where
//! interrupts are taken and new opcodes fetched.

use emu_core::Bus;
use thiserror::Error;

use crate::flags::{C, D, I, N, V, Z};
use crate::history::{ExecutedInstruction, History, DEFAULT_HISTORY_CAPACITY};
use crate::opcodes::{Mnemonic, Mode, OPCODES};
use crate::Registers;

/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFA;

/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFC;

/// IRQ/BRK vector address.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles consumed by an interrupt entry sequence.
const INTERRUPT_CYCLES: u8 = 7;

/// Fatal CPU conditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    /// An opcode outside the documented set (and the tolerated NOPs).
    #[error("illegal opcode {opcode:#04X} at {pc:#06X}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    /// A JAM/KIL/HLT opcode locked the CPU.
    #[error("CPU jammed by opcode {opcode:#04X} at {pc:#06X}")]
    Jammed { opcode: u8, pc: u16 },

    /// A tight self-loop at an address other than the armed trap.
    #[error("trap loop at {pc:#06X}, expected success trap at {expected:#06X}")]
    TrapLoop { pc: u16, expected: u16 },

    /// History capacity outside the accepted range.
    #[error("history capacity {requested} out of range 1..=65536")]
    HistoryCapacity { requested: usize },
}

/// Resolved operand of the instruction being executed.
#[derive(Debug, Clone, Copy)]
enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Memory(u16),
}

/// The MOS 6502 CPU.
pub struct Mos6502 {
    pub regs: Registers,

    /// Cycles still owed for the current instruction.
    cycles_remaining: u8,

    /// Latched maskable interrupt request.
    irq_pending: bool,

    /// Latched non-maskable interrupt request.
    nmi_pending: bool,

    /// Test-harness trap address. A self-loop here parks the CPU; a
    /// self-loop anywhere else is a fatal diagnostic.
    trap_pc: Option<u16>,

    /// The armed trap address has been reached.
    trapped: bool,

    history: History,

    total_cycles: u64,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles_remaining: 0,
            irq_pending: false,
            nmi_pending: false,
            trap_pc: None,
            trapped: false,
            history: History::new(DEFAULT_HISTORY_CAPACITY),
            total_cycles: 0,
        }
    }

    /// Reset the CPU.
    ///
    /// A/X/Y/SP are zeroed and the I flag is set. PC comes from `pc` when
    /// given, otherwise from the reset vector at $FFFC. `trap_pc` arms the
    /// test-harness self-loop detector.
    pub fn reset<B: Bus>(&mut self, bus: &mut B, pc: Option<u16>, trap_pc: Option<u16>) {
        self.regs = Registers::new();
        self.regs.pc = match pc {
            Some(pc) => pc,
            None => self.read_word(bus, RESET_VECTOR),
        };
        self.cycles_remaining = 0;
        self.irq_pending = false;
        self.nmi_pending = false;
        self.trap_pc = trap_pc;
        self.trapped = false;
        self.history.clear();
    }

    /// Advance exactly one bus cycle.
    ///
    /// # Errors
    ///
    /// Undefined opcodes, JAM opcodes and trap-loop divergence are fatal.
    pub fn cycle<B: Bus>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        self.total_cycles += 1;

        if self.cycles_remaining > 0 {
            self.cycles_remaining -= 1;
            return Ok(());
        }

        if self.trapped {
            return Ok(());
        }

        if self.nmi_pending {
            // NMI is taken regardless of the I flag.
            self.nmi_pending = false;
            self.service_interrupt(bus, NMI_VECTOR);
        } else if self.irq_pending && !self.regs.p.is_set(I) {
            self.irq_pending = false;
            self.service_interrupt(bus, IRQ_VECTOR);
        } else {
            self.execute_instruction(bus)?;
        }

        // The work above consumed this call's cycle.
        self.cycles_remaining = self.cycles_remaining.saturating_sub(1);
        Ok(())
    }

    /// Run cycles until the current instruction (or interrupt entry)
    /// completes. Convenience for instruction-granular harnesses.
    ///
    /// # Errors
    ///
    /// Propagates any fatal condition from `cycle`.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        self.cycle(bus)?;
        while !self.instruction_complete() {
            self.cycle(bus)?;
        }
        Ok(())
    }

    /// True when no cycles are owed for an in-flight instruction.
    #[must_use]
    pub fn instruction_complete(&self) -> bool {
        self.cycles_remaining == 0
    }

    /// Latch a maskable interrupt request.
    pub fn request_irq(&mut self) {
        self.irq_pending = true;
    }

    /// Latch a non-maskable interrupt request.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// The armed trap address has been reached (test success).
    #[must_use]
    pub fn trapped(&self) -> bool {
        self.trapped
    }

    /// Total cycles since construction.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Execution history ring.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Resize the execution history ring.
    ///
    /// # Errors
    ///
    /// Rejects capacities outside `1..=65536`.
    pub fn set_history_capacity(&mut self, capacity: usize) -> Result<(), CpuError> {
        self.history.set_capacity(capacity)
    }

    // ---------------------------------------------------------------------
    // Bus helpers
    // ---------------------------------------------------------------------

    fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    fn read_word<B: Bus>(&self, bus: &mut B, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Word read with the documented 6502 page-wrap bug: when `addr` is
    /// `$xxFF` the high byte comes from `$xx00`.
    fn read_word_page_bug<B: Bus>(&self, bus: &mut B, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.write(0x0100 | u16::from(self.regs.s), value);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    fn pull<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.regs.s = self.regs.s.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.regs.s))
    }

    fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    fn pull_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    // ---------------------------------------------------------------------
    // Interrupts
    // ---------------------------------------------------------------------

    fn service_interrupt<B: Bus>(&mut self, bus: &mut B, vector: u16) {
        self.push_word(bus, self.regs.pc);
        let p = self.regs.p.to_byte_irq();
        self.push(bus, p);
        self.regs.p.set(I);
        self.regs.pc = self.read_word(bus, vector);
        self.cycles_remaining = INTERRUPT_CYCLES;
    }

    // ---------------------------------------------------------------------
    // Instruction execution
    // ---------------------------------------------------------------------

    fn execute_instruction<B: Bus>(&mut self, bus: &mut B) -> Result<(), CpuError> {
        let start_pc = self.regs.pc;
        let opcode = self.fetch(bus);
        let entry = OPCODES[opcode as usize];

        match entry.mnemonic {
            Mnemonic::Jam => {
                return Err(CpuError::Jammed {
                    opcode,
                    pc: start_pc,
                })
            }
            Mnemonic::Undefined => {
                return Err(CpuError::IllegalOpcode {
                    opcode,
                    pc: start_pc,
                })
            }
            _ => {}
        }

        self.cycles_remaining = entry.cycles;

        let mut raw = [opcode, 0, 0];
        let operand = self.resolve_operand(bus, entry.mode, &mut raw);

        let mut touched = None;
        let value = if entry.reads {
            match operand {
                Operand::Accumulator => self.regs.a,
                Operand::Immediate(v) => v,
                Operand::Memory(addr) => {
                    touched = Some(addr);
                    bus.read(addr)
                }
                Operand::None => 0,
            }
        } else {
            0
        };

        let result = self.apply(bus, entry.mnemonic, value, operand);

        if entry.writes {
            if let Some(result) = result {
                match operand {
                    Operand::Accumulator => self.regs.a = result,
                    Operand::Memory(addr) => {
                        touched = Some(addr);
                        bus.write(addr, result);
                    }
                    _ => {}
                }
            }
        }

        let operand_word = match entry.mode.operand_len() {
            0 => 0,
            1 => u16::from(raw[1]),
            _ => u16::from_le_bytes([raw[1], raw[2]]),
        };
        self.history.record(ExecutedInstruction {
            pc: start_pc,
            bytes: raw,
            len: 1 + entry.mode.operand_len(),
            mnemonic: entry.mnemonic,
            operand: operand_word,
            a: self.regs.a,
            x: self.regs.x,
            y: self.regs.y,
            sp: self.regs.s,
            p: self.regs.p.0,
            mem_addr: touched,
        });

        if let Some(trap) = self.trap_pc {
            if self.regs.pc == start_pc {
                if start_pc == trap {
                    self.trapped = true;
                } else {
                    return Err(CpuError::TrapLoop {
                        pc: start_pc,
                        expected: trap,
                    });
                }
            }
        }

        Ok(())
    }

    /// Fetch operand bytes and compute the effective operand.
    fn resolve_operand<B: Bus>(&mut self, bus: &mut B, mode: Mode, raw: &mut [u8; 3]) -> Operand {
        match mode {
            Mode::Implied => Operand::None,
            Mode::Accumulator => Operand::Accumulator,
            Mode::Immediate => {
                let value = self.fetch(bus);
                raw[1] = value;
                Operand::Immediate(value)
            }
            Mode::ZeroPage => {
                let base = self.fetch(bus);
                raw[1] = base;
                Operand::Memory(u16::from(base))
            }
            Mode::ZeroPageX => {
                let base = self.fetch(bus);
                raw[1] = base;
                Operand::Memory(u16::from(base.wrapping_add(self.regs.x)))
            }
            Mode::ZeroPageY => {
                let base = self.fetch(bus);
                raw[1] = base;
                Operand::Memory(u16::from(base.wrapping_add(self.regs.y)))
            }
            Mode::Absolute => {
                let base = self.fetch_word(bus);
                let [lo, hi] = base.to_le_bytes();
                raw[1] = lo;
                raw[2] = hi;
                Operand::Memory(base)
            }
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let [lo, hi] = base.to_le_bytes();
                raw[1] = lo;
                raw[2] = hi;
                Operand::Memory(base.wrapping_add(u16::from(self.regs.x)))
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let [lo, hi] = base.to_le_bytes();
                raw[1] = lo;
                raw[2] = hi;
                Operand::Memory(base.wrapping_add(u16::from(self.regs.y)))
            }
            Mode::Indirect => {
                let base = self.fetch_word(bus);
                let [lo, hi] = base.to_le_bytes();
                raw[1] = lo;
                raw[2] = hi;
                Operand::Memory(self.read_word_page_bug(bus, base))
            }
            Mode::IndexedIndirect => {
                let base = self.fetch(bus);
                raw[1] = base;
                let pointer = base.wrapping_add(self.regs.x);
                let low = bus.read(u16::from(pointer));
                let high = bus.read(u16::from(pointer.wrapping_add(1)));
                Operand::Memory(u16::from_le_bytes([low, high]))
            }
            Mode::IndirectIndexed => {
                let pointer = self.fetch(bus);
                raw[1] = pointer;
                let low = bus.read(u16::from(pointer));
                let high = bus.read(u16::from(pointer.wrapping_add(1)));
                let base = u16::from_le_bytes([low, high]);
                Operand::Memory(base.wrapping_add(u16::from(self.regs.y)))
            }
            Mode::Relative => {
                let offset = self.fetch(bus) as i8;
                raw[1] = offset as u8;
                Operand::Memory(self.regs.pc.wrapping_add(offset as u16))
            }
        }
    }

    /// Run one operation. Returns the byte to write back for instructions
    /// whose table entry has `writes` set.
    fn apply<B: Bus>(
        &mut self,
        bus: &mut B,
        mnemonic: Mnemonic,
        value: u8,
        operand: Operand,
    ) -> Option<u8> {
        match mnemonic {
            // Loads and stores
            Mnemonic::Lda => {
                self.regs.a = self.setzn(value);
                None
            }
            Mnemonic::Ldx => {
                self.regs.x = self.setzn(value);
                None
            }
            Mnemonic::Ldy => {
                self.regs.y = self.setzn(value);
                None
            }
            Mnemonic::Sta => Some(self.regs.a),
            Mnemonic::Stx => Some(self.regs.x),
            Mnemonic::Sty => Some(self.regs.y),

            // Register transfers
            Mnemonic::Tax => {
                self.regs.x = self.setzn(self.regs.a);
                None
            }
            Mnemonic::Tay => {
                self.regs.y = self.setzn(self.regs.a);
                None
            }
            Mnemonic::Txa => {
                self.regs.a = self.setzn(self.regs.x);
                None
            }
            Mnemonic::Tya => {
                self.regs.a = self.setzn(self.regs.y);
                None
            }
            Mnemonic::Tsx => {
                self.regs.x = self.setzn(self.regs.s);
                None
            }
            Mnemonic::Txs => {
                self.regs.s = self.regs.x;
                None
            }

            // Stack
            Mnemonic::Pha => {
                self.push(bus, self.regs.a);
                None
            }
            Mnemonic::Php => {
                let p = self.regs.p.to_byte_brk();
                self.push(bus, p);
                None
            }
            Mnemonic::Pla => {
                let v = self.pull(bus);
                self.regs.a = self.setzn(v);
                None
            }
            Mnemonic::Plp => {
                let v = self.pull(bus);
                self.regs.p.restore_from_stack(v);
                None
            }

            // Arithmetic
            Mnemonic::Adc => {
                self.adc(value);
                None
            }
            Mnemonic::Sbc => {
                self.sbc(value);
                None
            }
            Mnemonic::Cmp => {
                self.compare(self.regs.a, value);
                None
            }
            Mnemonic::Cpx => {
                self.compare(self.regs.x, value);
                None
            }
            Mnemonic::Cpy => {
                self.compare(self.regs.y, value);
                None
            }

            // Increment / decrement
            Mnemonic::Inc => Some(self.setzn(value.wrapping_add(1))),
            Mnemonic::Dec => Some(self.setzn(value.wrapping_sub(1))),
            Mnemonic::Inx => {
                self.regs.x = self.setzn(self.regs.x.wrapping_add(1));
                None
            }
            Mnemonic::Iny => {
                self.regs.y = self.setzn(self.regs.y.wrapping_add(1));
                None
            }
            Mnemonic::Dex => {
                self.regs.x = self.setzn(self.regs.x.wrapping_sub(1));
                None
            }
            Mnemonic::Dey => {
                self.regs.y = self.setzn(self.regs.y.wrapping_sub(1));
                None
            }

            // Logic
            Mnemonic::And => {
                self.regs.a = self.setzn(self.regs.a & value);
                None
            }
            Mnemonic::Eor => {
                self.regs.a = self.setzn(self.regs.a ^ value);
                None
            }
            Mnemonic::Ora => {
                self.regs.a = self.setzn(self.regs.a | value);
                None
            }
            Mnemonic::Bit => {
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                self.regs.p.set_if(N, value & 0x80 != 0);
                self.regs.p.set_if(V, value & 0x40 != 0);
                None
            }

            // Shifts and rotates
            Mnemonic::Asl => Some(self.asl(value)),
            Mnemonic::Lsr => Some(self.lsr(value)),
            Mnemonic::Rol => Some(self.rol(value)),
            Mnemonic::Ror => Some(self.ror(value)),

            // Jumps and subroutines
            Mnemonic::Jmp => {
                if let Operand::Memory(addr) = operand {
                    self.regs.pc = addr;
                }
                None
            }
            Mnemonic::Jsr => {
                if let Operand::Memory(addr) = operand {
                    let ret = self.regs.pc.wrapping_sub(1);
                    self.push_word(bus, ret);
                    self.regs.pc = addr;
                }
                None
            }
            Mnemonic::Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                None
            }
            Mnemonic::Rti => {
                let p = self.pull(bus);
                self.regs.p.restore_from_stack(p);
                self.regs.pc = self.pull_word(bus);
                None
            }
            Mnemonic::Brk => {
                // Padding byte after BRK is fetched and ignored.
                let _ = self.fetch(bus);
                self.push_word(bus, self.regs.pc);
                let p = self.regs.p.to_byte_brk();
                self.push(bus, p);
                self.regs.p.set(I);
                self.regs.pc = self.read_word(bus, IRQ_VECTOR);
                None
            }

            // Branches
            Mnemonic::Bpl => {
                self.branch(!self.regs.p.is_set(N), operand);
                None
            }
            Mnemonic::Bmi => {
                self.branch(self.regs.p.is_set(N), operand);
                None
            }
            Mnemonic::Bvc => {
                self.branch(!self.regs.p.is_set(V), operand);
                None
            }
            Mnemonic::Bvs => {
                self.branch(self.regs.p.is_set(V), operand);
                None
            }
            Mnemonic::Bcc => {
                self.branch(!self.regs.p.is_set(C), operand);
                None
            }
            Mnemonic::Bcs => {
                self.branch(self.regs.p.is_set(C), operand);
                None
            }
            Mnemonic::Bne => {
                self.branch(!self.regs.p.is_set(Z), operand);
                None
            }
            Mnemonic::Beq => {
                self.branch(self.regs.p.is_set(Z), operand);
                None
            }

            // Flag operations
            Mnemonic::Clc => {
                self.regs.p.clear(C);
                None
            }
            Mnemonic::Sec => {
                self.regs.p.set(C);
                None
            }
            Mnemonic::Cli => {
                self.regs.p.clear(I);
                None
            }
            Mnemonic::Sei => {
                self.regs.p.set(I);
                None
            }
            Mnemonic::Cld => {
                self.regs.p.clear(D);
                None
            }
            Mnemonic::Sed => {
                self.regs.p.set(D);
                None
            }
            Mnemonic::Clv => {
                self.regs.p.clear(V);
                None
            }

            Mnemonic::Nop => None,

            // Filtered before dispatch.
            Mnemonic::Jam | Mnemonic::Undefined => None,
        }
    }

    // ---------------------------------------------------------------------
    // ALU
    // ---------------------------------------------------------------------

    /// Set Z and N from a value and return it.
    fn setzn(&mut self, value: u8) -> u8 {
        self.regs.p.update_nz(value);
        value
    }

    /// Compare helper: C set when `reg >= value`, Z/N from the difference.
    fn compare(&mut self, reg: u8, value: u8) {
        self.regs.p.set_if(C, reg >= value);
        self.regs.p.update_nz(reg.wrapping_sub(value));
    }

    fn adc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.adc_decimal(value);
        } else {
            self.adc_binary(value);
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let v = u16::from(value);
        let c = u16::from(self.regs.p.is_set(C));

        let result = a + v + c;
        let result8 = result as u8;

        self.regs.p.set_if(C, result > 0xFF);
        self.regs
            .p
            .set_if(V, (self.regs.a ^ result8) & (value ^ result8) & 0x80 != 0);
        self.regs.p.update_nz(result8);
        self.regs.a = result8;
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = u16::from(self.regs.a);
        let v = u16::from(value);
        let c = u16::from(self.regs.p.is_set(C));

        let mut low = (a & 0x0F) + (v & 0x0F) + c;
        if low > 9 {
            low += 6;
        }

        let mut high = (a >> 4) + (v >> 4) + u16::from(low > 0x0F);

        // Z, N, V come from the intermediate binary result (NMOS behaviour).
        let binary = (a + v + c) as u8;
        let binary16 = u16::from(binary);
        self.regs.p.set_if(Z, binary == 0);
        self.regs.p.set_if(N, high & 0x08 != 0);
        self.regs
            .p
            .set_if(V, (a ^ binary16) & (v ^ binary16) & 0x80 != 0);

        if high > 9 {
            high += 6;
        }

        self.regs.p.set_if(C, high > 0x0F);
        self.regs.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    fn sbc(&mut self, value: u8) {
        if self.regs.p.is_set(D) {
            self.sbc_decimal(value);
        } else {
            // Binary SBC is ADC of the one's complement.
            self.adc_binary(value ^ 0xFF);
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = i16::from(self.regs.a);
        let v = i16::from(value);
        let c = i16::from(!self.regs.p.is_set(C));

        let mut low = (a & 0x0F) - (v & 0x0F) - c;
        if low < 0 {
            low = ((low - 6) & 0x0F) - 0x10;
        }

        let mut high = (a >> 4) - (v >> 4) - i16::from(low < 0);
        if high < 0 {
            high = (high - 6) & 0x0F;
        }

        // Flags come from the binary result (NMOS behaviour).
        let binary = a.wrapping_sub(v).wrapping_sub(c);
        let nv = !v;
        self.regs.p.set_if(C, binary >= 0);
        self.regs.p.set_if(Z, (binary as u8) == 0);
        self.regs.p.set_if(N, binary & 0x80 != 0);
        self.regs
            .p
            .set_if(V, (a ^ binary) & (nv ^ binary) & 0x80 != 0);

        self.regs.a = ((high << 4) | (low & 0x0F)) as u8;
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        self.setzn(value << 1)
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        self.setzn(value >> 1)
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        self.setzn((value << 1) | carry_in)
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, value & 0x01 != 0);
        self.setzn((value >> 1) | carry_in)
    }

    /// Take a branch when `cond` holds: +1 cycle, +1 more on page cross.
    fn branch(&mut self, cond: bool, operand: Operand) {
        if let Operand::Memory(target) = operand {
            if cond {
                self.cycles_remaining += 1;
                if (self.regs.pc & 0xFF00) != (target & 0xFF00) {
                    self.cycles_remaining += 1;
                }
                self.regs.pc = target;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{B, U};
    use emu_core::SimpleBus;

    /// Load a program at `addr` and reset the CPU to it.
    fn setup(addr: u16, program: &[u8]) -> (Mos6502, SimpleBus) {
        let mut bus = SimpleBus::new();
        bus.load(addr, program);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut bus, Some(addr), None);
        (cpu, bus)
    }

    #[test]
    fn reset_zeroes_registers_and_reads_vector() {
        let mut bus = SimpleBus::new();
        bus.load(RESET_VECTOR, &[0x34, 0x12]);
        let mut cpu = Mos6502::new();
        cpu.regs.a = 0x55;
        cpu.regs.s = 0x80;
        cpu.reset(&mut bus, None, None);
        assert_eq!(cpu.regs.pc, 0x1234);
        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.x, 0);
        assert_eq!(cpu.regs.y, 0);
        assert_eq!(cpu.regs.s, 0);
        assert!(cpu.regs.p.is_set(I));
        assert!(cpu.instruction_complete());
    }

    #[test]
    fn lda_immediate_takes_two_cycles() {
        let (mut cpu, mut bus) = setup(0x0200, &[0xA9, 0x42]);
        cpu.cycle(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x42);
        assert!(!cpu.instruction_complete());
        cpu.cycle(&mut bus).unwrap();
        assert!(cpu.instruction_complete());
    }

    #[test]
    fn setzn_matches_value() {
        for value in [0x00u8, 0x01, 0x7F, 0x80, 0xFF] {
            let (mut cpu, mut bus) = setup(0x0200, &[0xA9, value]);
            cpu.step(&mut bus).unwrap();
            assert_eq!(cpu.regs.a, value);
            assert_eq!(cpu.regs.p.is_set(Z), value == 0);
            assert_eq!(cpu.regs.p.is_set(N), value & 0x80 != 0);
        }
    }

    #[test]
    fn bcd_adc_scenario() {
        // D=1, C=0, A=$19 + $28 -> $47 with C/Z/N clear.
        let (mut cpu, mut bus) = setup(0x0200, &[0xF8, 0x69, 0x28]);
        cpu.regs.a = 0x19;
        cpu.step(&mut bus).unwrap(); // SED
        cpu.step(&mut bus).unwrap(); // ADC #$28
        assert_eq!(cpu.regs.a, 0x47);
        assert!(!cpu.regs.p.is_set(C));
        assert!(!cpu.regs.p.is_set(Z));
        assert!(!cpu.regs.p.is_set(N));
    }

    #[test]
    fn adc_signed_overflow_scenario() {
        // $50 + $50 = $A0, V and N set, C clear.
        let (mut cpu, mut bus) = setup(0x0200, &[0x69, 0x50]);
        cpu.regs.a = 0x50;
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0xA0);
        assert!(cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(N));
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn adc_binary_carry_chain() {
        let (mut cpu, mut bus) = setup(0x0200, &[0x38, 0x69, 0xFF]);
        cpu.regs.a = 0x01;
        cpu.step(&mut bus).unwrap(); // SEC
        cpu.step(&mut bus).unwrap(); // ADC #$FF -> 1 + 255 + 1 = 0x101
        assert_eq!(cpu.regs.a, 0x01);
        assert!(cpu.regs.p.is_set(C));
        assert!(!cpu.regs.p.is_set(Z));
    }

    #[test]
    fn sbc_binary_equals_adc_of_complement() {
        for (a, m, carry) in [(0x50u8, 0x30u8, true), (0x00, 0x01, true), (0x80, 0x7F, false)] {
            let (mut cpu, mut bus) = setup(0x0200, &[0xE9, m]);
            cpu.regs.a = a;
            cpu.regs.p.set_if(C, carry);
            cpu.step(&mut bus).unwrap();
            let sbc_result = (cpu.regs.a, cpu.regs.p);

            let (mut cpu, mut bus) = setup(0x0200, &[0x69, m ^ 0xFF]);
            cpu.regs.a = a;
            cpu.regs.p.set_if(C, carry);
            cpu.step(&mut bus).unwrap();
            assert_eq!((cpu.regs.a, cpu.regs.p), sbc_result);
        }
    }

    #[test]
    fn bcd_sbc() {
        // D=1, C=1 (no borrow): $46 - $12 = $34.
        let (mut cpu, mut bus) = setup(0x0200, &[0xF8, 0x38, 0xE9, 0x12]);
        cpu.regs.a = 0x46;
        cpu.step(&mut bus).unwrap();
        cpu.step(&mut bus).unwrap();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x34);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn pha_pla_roundtrip() {
        let (mut cpu, mut bus) = setup(0x0200, &[0x48, 0xA9, 0x00, 0x68]);
        cpu.regs.a = 0x5A;
        cpu.regs.s = 0xFF;
        cpu.step(&mut bus).unwrap(); // PHA
        assert_eq!(cpu.regs.s, 0xFE);
        cpu.step(&mut bus).unwrap(); // LDA #0
        assert_eq!(cpu.regs.a, 0x00);
        cpu.step(&mut bus).unwrap(); // PLA
        assert_eq!(cpu.regs.a, 0x5A);
        assert_eq!(cpu.regs.s, 0xFF);
    }

    #[test]
    fn jsr_rts_roundtrip() {
        // JSR $2000 at $1000; RTS at $2000. Ends at $1003 with SP intact.
        let (mut cpu, mut bus) = setup(0x1000, &[0x20, 0x00, 0x20]);
        bus.load(0x2000, &[0x60]);
        cpu.regs.s = 0xFF;
        cpu.step(&mut bus).unwrap(); // JSR
        assert_eq!(cpu.regs.pc, 0x2000);
        assert_eq!(cpu.regs.s, 0xFD);
        // Return address on the stack is the JSR's last byte.
        assert_eq!(bus.peek(0x01FF), 0x10);
        assert_eq!(bus.peek(0x01FE), 0x02);
        cpu.step(&mut bus).unwrap(); // RTS
        assert_eq!(cpu.regs.pc, 0x1003);
        assert_eq!(cpu.regs.s, 0xFF);
    }

    #[test]
    fn brk_pushes_break_flag_and_vectors() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x00]);
        bus.load(IRQ_VECTOR, &[0x00, 0x80]);
        cpu.regs.s = 0xFF;
        cpu.regs.p.clear(I);
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x8000);
        assert!(cpu.regs.p.is_set(I));
        // Return address skips the padding byte.
        assert_eq!(bus.peek(0x01FF), 0x03);
        assert_eq!(bus.peek(0x01FE), 0x02);
        // Pushed status has B and U set.
        let pushed = bus.peek(0x01FD);
        assert!(pushed & B != 0);
        assert!(pushed & U != 0);
    }

    #[test]
    fn irq_service_and_rti_restore() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xA9, 0x11, 0xA9, 0x22]);
        bus.load(IRQ_VECTOR, &[0x00, 0x90]);
        bus.load(0x9000, &[0x40]); // RTI
        cpu.regs.s = 0xFF;
        cpu.regs.p.clear(I);

        cpu.step(&mut bus).unwrap(); // LDA #$11
        cpu.request_irq();
        cpu.step(&mut bus).unwrap(); // interrupt entry
        assert_eq!(cpu.regs.pc, 0x9000);
        assert!(cpu.regs.p.is_set(I));
        // Pushed status has B clear.
        assert_eq!(bus.peek(0x01FD) & B, 0);

        cpu.step(&mut bus).unwrap(); // RTI
        assert_eq!(cpu.regs.pc, 0x0302);
        assert!(!cpu.regs.p.is_set(I));
        assert_eq!(cpu.regs.s, 0xFF);

        cpu.step(&mut bus).unwrap(); // LDA #$22 resumes normally
        assert_eq!(cpu.regs.a, 0x22);
    }

    #[test]
    fn irq_masked_by_i_flag() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xA9, 0x11]);
        cpu.request_irq();
        cpu.step(&mut bus).unwrap();
        // I is set after reset, so the instruction runs instead.
        assert_eq!(cpu.regs.a, 0x11);
    }

    #[test]
    fn nmi_ignores_i_flag_and_beats_irq() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xA9, 0x11]);
        bus.load(NMI_VECTOR, &[0x00, 0xA0]);
        bus.load(IRQ_VECTOR, &[0x00, 0xB0]);
        cpu.regs.s = 0xFF;
        cpu.request_irq();
        cpu.request_nmi();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0xA000);
    }

    #[test]
    fn interrupt_entry_takes_seven_cycles() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xA9, 0x11]);
        bus.load(NMI_VECTOR, &[0x00, 0xA0]);
        cpu.regs.s = 0xFF;
        cpu.request_nmi();
        cpu.cycle(&mut bus).unwrap();
        assert!(!cpu.instruction_complete());
        for _ in 0..6 {
            cpu.cycle(&mut bus).unwrap();
        }
        assert!(cpu.instruction_complete());
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x6C, 0xFF, 0x02]);
        bus.write(0x02FF, 0x34);
        bus.write(0x0200, 0x12); // high byte from $0200, not $0300
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x1234);
    }

    #[test]
    fn zero_page_x_wraps_in_page() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xB5, 0xFF]);
        bus.write(0x0001, 0x77);
        cpu.regs.x = 0x02;
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x77);
    }

    #[test]
    fn indirect_indexed_carries_into_high_byte() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xB1, 0x80]);
        bus.write(0x0080, 0xFF);
        bus.write(0x0081, 0x10);
        bus.write(0x1101, 0x55);
        cpu.regs.y = 0x02;
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x55);
    }

    #[test]
    fn branch_cycle_penalties() {
        // Not taken: 2 cycles.
        let (mut cpu, mut bus) = setup(0x0300, &[0xD0, 0x02]);
        cpu.regs.p.set(Z);
        cpu.cycle(&mut bus).unwrap();
        cpu.cycle(&mut bus).unwrap();
        assert!(cpu.instruction_complete());

        // Taken, same page: 3 cycles.
        let (mut cpu, mut bus) = setup(0x0300, &[0xD0, 0x02]);
        cpu.regs.p.clear(Z);
        for _ in 0..2 {
            cpu.cycle(&mut bus).unwrap();
        }
        assert!(!cpu.instruction_complete());
        cpu.cycle(&mut bus).unwrap();
        assert!(cpu.instruction_complete());
        assert_eq!(cpu.regs.pc, 0x0304);

        // Taken across a page: 4 cycles.
        let (mut cpu, mut bus) = setup(0x02F0, &[0xD0, 0x20]);
        cpu.regs.p.clear(Z);
        for _ in 0..3 {
            cpu.cycle(&mut bus).unwrap();
        }
        assert!(!cpu.instruction_complete());
        cpu.cycle(&mut bus).unwrap();
        assert!(cpu.instruction_complete());
        assert_eq!(cpu.regs.pc, 0x0312);
    }

    #[test]
    fn compare_sets_flags() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xC9, 0x10]);
        cpu.regs.a = 0x10;
        cpu.step(&mut bus).unwrap();
        assert!(cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(Z));

        let (mut cpu, mut bus) = setup(0x0300, &[0xC9, 0x20]);
        cpu.regs.a = 0x10;
        cpu.step(&mut bus).unwrap();
        assert!(!cpu.regs.p.is_set(C));
        assert!(!cpu.regs.p.is_set(Z));
        assert!(cpu.regs.p.is_set(N)); // 0x10 - 0x20 = 0xF0
    }

    #[test]
    fn rotate_carry_chain() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x2A, 0x2A]);
        cpu.regs.a = 0x80;
        cpu.step(&mut bus).unwrap(); // ROL: carry out, A = 0
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.p.is_set(C));
        assert!(cpu.regs.p.is_set(Z));
        cpu.step(&mut bus).unwrap(); // ROL: carry back in
        assert_eq!(cpu.regs.a, 0x01);
        assert!(!cpu.regs.p.is_set(C));
    }

    #[test]
    fn bit_copies_memory_bits() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x24, 0x10]);
        bus.write(0x0010, 0xC0);
        cpu.regs.a = 0x3F;
        cpu.step(&mut bus).unwrap();
        assert!(cpu.regs.p.is_set(N));
        assert!(cpu.regs.p.is_set(V));
        assert!(cpu.regs.p.is_set(Z)); // $3F & $C0 == 0
    }

    #[test]
    fn rmw_writes_back_to_memory() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xEE, 0x00, 0x40]);
        bus.write(0x4000, 0x7F);
        cpu.step(&mut bus).unwrap();
        assert_eq!(bus.peek(0x4000), 0x80);
        assert!(cpu.regs.p.is_set(N));
    }

    #[test]
    fn asl_accumulator() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x0A]);
        cpu.regs.a = 0xC1;
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x82);
        assert!(cpu.regs.p.is_set(C));
    }

    #[test]
    fn illegal_opcode_is_fatal() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x03]);
        let err = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(
            err,
            CpuError::IllegalOpcode {
                opcode: 0x03,
                pc: 0x0300
            }
        );
    }

    #[test]
    fn jam_is_fatal() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x02]);
        let err = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(
            err,
            CpuError::Jammed {
                opcode: 0x02,
                pc: 0x0300
            }
        );
    }

    #[test]
    fn trap_at_armed_address_parks_cpu() {
        // JMP $0300 at $0300 - self loop at the armed trap.
        let mut bus = SimpleBus::new();
        bus.load(0x0300, &[0x4C, 0x00, 0x03]);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut bus, Some(0x0300), Some(0x0300));
        cpu.step(&mut bus).unwrap();
        assert!(cpu.trapped());
        // Further cycles are inert.
        cpu.cycle(&mut bus).unwrap();
        assert_eq!(cpu.regs.pc, 0x0300);
    }

    #[test]
    fn trap_elsewhere_is_fatal() {
        let mut bus = SimpleBus::new();
        bus.load(0x0300, &[0x4C, 0x00, 0x03]);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut bus, Some(0x0300), Some(0x3469));
        let err = loop {
            match cpu.step(&mut bus) {
                Ok(()) => {}
                Err(err) => break err,
            }
        };
        assert_eq!(
            err,
            CpuError::TrapLoop {
                pc: 0x0300,
                expected: 0x3469
            }
        );
    }

    #[test]
    fn self_loop_without_trap_is_not_fatal() {
        let mut bus = SimpleBus::new();
        bus.load(0x0300, &[0x4C, 0x00, 0x03]);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut bus, Some(0x0300), None);
        for _ in 0..10 {
            cpu.step(&mut bus).unwrap();
        }
        assert_eq!(cpu.regs.pc, 0x0300);
    }

    #[test]
    fn history_records_executed_instructions() {
        let (mut cpu, mut bus) = setup(0x0300, &[0xA9, 0x42, 0x8D, 0x00, 0x40]);
        cpu.step(&mut bus).unwrap();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.history().len(), 2);
        let last = cpu.history().last().unwrap();
        assert_eq!(last.pc, 0x0302);
        assert_eq!(last.mnemonic, Mnemonic::Sta);
        assert_eq!(last.operand, 0x4000);
        assert_eq!(last.mem_addr, Some(0x4000));
        assert_eq!(last.a, 0x42);
        assert_eq!(last.bytes, [0x8D, 0x00, 0x40]);
        assert_eq!(last.len, 3);
    }

    #[test]
    fn stack_pointer_wraps_modulo_256() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x48]);
        cpu.regs.s = 0x00;
        cpu.regs.a = 0x99;
        cpu.step(&mut bus).unwrap();
        assert_eq!(bus.peek(0x0100), 0x99);
        assert_eq!(cpu.regs.s, 0xFF);
    }

    #[test]
    fn txs_does_not_touch_flags() {
        let (mut cpu, mut bus) = setup(0x0300, &[0x9A]);
        cpu.regs.x = 0x00;
        cpu.regs.p.clear(Z);
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.s, 0x00);
        assert!(!cpu.regs.p.is_set(Z));
    }
}
