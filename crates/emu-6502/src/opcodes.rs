//! The 6502 opcode table.
//!
//! One entry per opcode byte: mnemonic, addressing mode, base cycle count
//! and whether the instruction reads and/or writes its memory operand. The
//! dispatch loop resolves the operand once, fetches the value for readers,
//! runs the operation, and writes back the result for writers - so the
//! table drives the whole hot path without per-opcode closures.
//!
//! The 151 documented opcodes are filled in, plus the undocumented NOP
//! variants and the JAM opcodes. Every other byte is `Undefined` and is
//! reported as a fatal error when executed.

use std::fmt;

/// 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Operates on the accumulator (e.g. `ASL A`).
    Accumulator,
    /// `#$nn` - literal operand byte.
    Immediate,
    /// No operand.
    Implied,
    /// `$nn` - 8-bit address in page zero.
    ZeroPage,
    /// `$nn,X` - zero page plus X, wraps within page zero.
    ZeroPageX,
    /// `$nn,Y` - zero page plus Y, wraps within page zero.
    ZeroPageY,
    /// `$nnnn` - 16-bit address.
    Absolute,
    /// `$nnnn,X`.
    AbsoluteX,
    /// `$nnnn,Y`.
    AbsoluteY,
    /// `($nnnn)` - JMP only, with the documented page-wrap bug.
    Indirect,
    /// `($nn,X)` - pointer in zero page indexed by X.
    IndexedIndirect,
    /// `($nn),Y` - zero page pointer plus Y.
    IndirectIndexed,
    /// Branch offset, -128 to +127.
    Relative,
}

impl Mode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u8 {
        match self {
            Mode::Accumulator | Mode::Implied => 0,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::IndexedIndirect
            | Mode::IndirectIndexed
            | Mode::Relative => 1,
            Mode::Absolute | Mode::AbsoluteX | Mode::AbsoluteY | Mode::Indirect => 2,
        }
    }
}

/// Instruction mnemonics, including the undocumented NOP/JAM stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    /// Undocumented halt opcode (KIL/HLT). Fatal when executed.
    Jam,
    /// Any opcode the table does not define. Fatal when executed.
    Undefined,
}

impl Mnemonic {
    /// Canonical assembler spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::And => "AND",
            Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC",
            Mnemonic::Bcs => "BCS",
            Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT",
            Mnemonic::Bmi => "BMI",
            Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL",
            Mnemonic::Brk => "BRK",
            Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS",
            Mnemonic::Clc => "CLC",
            Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI",
            Mnemonic::Clv => "CLV",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX",
            Mnemonic::Cpy => "CPY",
            Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX",
            Mnemonic::Dey => "DEY",
            Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC",
            Mnemonic::Inx => "INX",
            Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jsr => "JSR",
            Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX",
            Mnemonic::Ldy => "LDY",
            Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP",
            Mnemonic::Ora => "ORA",
            Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP",
            Mnemonic::Pla => "PLA",
            Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL",
            Mnemonic::Ror => "ROR",
            Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED",
            Mnemonic::Sei => "SEI",
            Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX",
            Mnemonic::Sty => "STY",
            Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY",
            Mnemonic::Tsx => "TSX",
            Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS",
            Mnemonic::Tya => "TYA",
            Mnemonic::Jam => "JAM",
            Mnemonic::Undefined => "???",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One opcode table entry.
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode: Mode,
    /// Base cycle count. Branch penalties are added during execution.
    pub cycles: u8,
    /// Instruction fetches its memory operand.
    pub reads: bool,
    /// Instruction stores a result to its memory operand (or A).
    pub writes: bool,
}

/// Instruction that reads its operand (loads, ALU, compares).
const fn rd(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
        reads: true,
        writes: false,
    }
}

/// Instruction that only stores (STA/STX/STY).
const fn wr(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
        reads: false,
        writes: true,
    }
}

/// Read-modify-write instruction (shifts, INC/DEC).
const fn rmw(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
        reads: true,
        writes: true,
    }
}

/// Control-flow or register-only instruction.
const fn ctl(mnemonic: Mnemonic, mode: Mode, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        mode,
        cycles,
        reads: false,
        writes: false,
    }
}

/// The full 256-entry opcode table.
pub static OPCODES: [Opcode; 256] = build_table();

#[allow(clippy::too_many_lines)]
const fn build_table() -> [Opcode; 256] {
    use Mnemonic::*;
    use Mode::*;

    let mut t = [ctl(Undefined, Implied, 2); 256];

    // Load
    t[0xA9] = rd(Lda, Immediate, 2);
    t[0xA5] = rd(Lda, ZeroPage, 3);
    t[0xB5] = rd(Lda, ZeroPageX, 4);
    t[0xAD] = rd(Lda, Absolute, 4);
    t[0xBD] = rd(Lda, AbsoluteX, 4);
    t[0xB9] = rd(Lda, AbsoluteY, 4);
    t[0xA1] = rd(Lda, IndexedIndirect, 6);
    t[0xB1] = rd(Lda, IndirectIndexed, 5);
    t[0xA2] = rd(Ldx, Immediate, 2);
    t[0xA6] = rd(Ldx, ZeroPage, 3);
    t[0xB6] = rd(Ldx, ZeroPageY, 4);
    t[0xAE] = rd(Ldx, Absolute, 4);
    t[0xBE] = rd(Ldx, AbsoluteY, 4);
    t[0xA0] = rd(Ldy, Immediate, 2);
    t[0xA4] = rd(Ldy, ZeroPage, 3);
    t[0xB4] = rd(Ldy, ZeroPageX, 4);
    t[0xAC] = rd(Ldy, Absolute, 4);
    t[0xBC] = rd(Ldy, AbsoluteX, 4);

    // Store
    t[0x85] = wr(Sta, ZeroPage, 3);
    t[0x95] = wr(Sta, ZeroPageX, 4);
    t[0x8D] = wr(Sta, Absolute, 4);
    t[0x9D] = wr(Sta, AbsoluteX, 5);
    t[0x99] = wr(Sta, AbsoluteY, 5);
    t[0x81] = wr(Sta, IndexedIndirect, 6);
    t[0x91] = wr(Sta, IndirectIndexed, 6);
    t[0x86] = wr(Stx, ZeroPage, 3);
    t[0x96] = wr(Stx, ZeroPageY, 4);
    t[0x8E] = wr(Stx, Absolute, 4);
    t[0x84] = wr(Sty, ZeroPage, 3);
    t[0x94] = wr(Sty, ZeroPageX, 4);
    t[0x8C] = wr(Sty, Absolute, 4);

    // Register transfers
    t[0xAA] = ctl(Tax, Implied, 2);
    t[0xA8] = ctl(Tay, Implied, 2);
    t[0x8A] = ctl(Txa, Implied, 2);
    t[0x98] = ctl(Tya, Implied, 2);
    t[0xBA] = ctl(Tsx, Implied, 2);
    t[0x9A] = ctl(Txs, Implied, 2);

    // Stack
    t[0x48] = ctl(Pha, Implied, 3);
    t[0x08] = ctl(Php, Implied, 3);
    t[0x68] = ctl(Pla, Implied, 4);
    t[0x28] = ctl(Plp, Implied, 4);

    // Arithmetic
    t[0x69] = rd(Adc, Immediate, 2);
    t[0x65] = rd(Adc, ZeroPage, 3);
    t[0x75] = rd(Adc, ZeroPageX, 4);
    t[0x6D] = rd(Adc, Absolute, 4);
    t[0x7D] = rd(Adc, AbsoluteX, 4);
    t[0x79] = rd(Adc, AbsoluteY, 4);
    t[0x61] = rd(Adc, IndexedIndirect, 6);
    t[0x71] = rd(Adc, IndirectIndexed, 5);
    t[0xE9] = rd(Sbc, Immediate, 2);
    t[0xE5] = rd(Sbc, ZeroPage, 3);
    t[0xF5] = rd(Sbc, ZeroPageX, 4);
    t[0xED] = rd(Sbc, Absolute, 4);
    t[0xFD] = rd(Sbc, AbsoluteX, 4);
    t[0xF9] = rd(Sbc, AbsoluteY, 4);
    t[0xE1] = rd(Sbc, IndexedIndirect, 6);
    t[0xF1] = rd(Sbc, IndirectIndexed, 5);

    // Compare
    t[0xC9] = rd(Cmp, Immediate, 2);
    t[0xC5] = rd(Cmp, ZeroPage, 3);
    t[0xD5] = rd(Cmp, ZeroPageX, 4);
    t[0xCD] = rd(Cmp, Absolute, 4);
    t[0xDD] = rd(Cmp, AbsoluteX, 4);
    t[0xD9] = rd(Cmp, AbsoluteY, 4);
    t[0xC1] = rd(Cmp, IndexedIndirect, 6);
    t[0xD1] = rd(Cmp, IndirectIndexed, 5);
    t[0xE0] = rd(Cpx, Immediate, 2);
    t[0xE4] = rd(Cpx, ZeroPage, 3);
    t[0xEC] = rd(Cpx, Absolute, 4);
    t[0xC0] = rd(Cpy, Immediate, 2);
    t[0xC4] = rd(Cpy, ZeroPage, 3);
    t[0xCC] = rd(Cpy, Absolute, 4);

    // Increment / decrement
    t[0xE6] = rmw(Inc, ZeroPage, 5);
    t[0xF6] = rmw(Inc, ZeroPageX, 6);
    t[0xEE] = rmw(Inc, Absolute, 6);
    t[0xFE] = rmw(Inc, AbsoluteX, 7);
    t[0xE8] = ctl(Inx, Implied, 2);
    t[0xC8] = ctl(Iny, Implied, 2);
    t[0xC6] = rmw(Dec, ZeroPage, 5);
    t[0xD6] = rmw(Dec, ZeroPageX, 6);
    t[0xCE] = rmw(Dec, Absolute, 6);
    t[0xDE] = rmw(Dec, AbsoluteX, 7);
    t[0xCA] = ctl(Dex, Implied, 2);
    t[0x88] = ctl(Dey, Implied, 2);

    // Logic
    t[0x29] = rd(And, Immediate, 2);
    t[0x25] = rd(And, ZeroPage, 3);
    t[0x35] = rd(And, ZeroPageX, 4);
    t[0x2D] = rd(And, Absolute, 4);
    t[0x3D] = rd(And, AbsoluteX, 4);
    t[0x39] = rd(And, AbsoluteY, 4);
    t[0x21] = rd(And, IndexedIndirect, 6);
    t[0x31] = rd(And, IndirectIndexed, 5);
    t[0x49] = rd(Eor, Immediate, 2);
    t[0x45] = rd(Eor, ZeroPage, 3);
    t[0x55] = rd(Eor, ZeroPageX, 4);
    t[0x4D] = rd(Eor, Absolute, 4);
    t[0x5D] = rd(Eor, AbsoluteX, 4);
    t[0x59] = rd(Eor, AbsoluteY, 4);
    t[0x41] = rd(Eor, IndexedIndirect, 6);
    t[0x51] = rd(Eor, IndirectIndexed, 5);
    t[0x09] = rd(Ora, Immediate, 2);
    t[0x05] = rd(Ora, ZeroPage, 3);
    t[0x15] = rd(Ora, ZeroPageX, 4);
    t[0x0D] = rd(Ora, Absolute, 4);
    t[0x1D] = rd(Ora, AbsoluteX, 4);
    t[0x19] = rd(Ora, AbsoluteY, 4);
    t[0x01] = rd(Ora, IndexedIndirect, 6);
    t[0x11] = rd(Ora, IndirectIndexed, 5);
    t[0x24] = rd(Bit, ZeroPage, 3);
    t[0x2C] = rd(Bit, Absolute, 4);

    // Shifts and rotates
    t[0x0A] = rmw(Asl, Accumulator, 2);
    t[0x06] = rmw(Asl, ZeroPage, 5);
    t[0x16] = rmw(Asl, ZeroPageX, 6);
    t[0x0E] = rmw(Asl, Absolute, 6);
    t[0x1E] = rmw(Asl, AbsoluteX, 7);
    t[0x4A] = rmw(Lsr, Accumulator, 2);
    t[0x46] = rmw(Lsr, ZeroPage, 5);
    t[0x56] = rmw(Lsr, ZeroPageX, 6);
    t[0x4E] = rmw(Lsr, Absolute, 6);
    t[0x5E] = rmw(Lsr, AbsoluteX, 7);
    t[0x2A] = rmw(Rol, Accumulator, 2);
    t[0x26] = rmw(Rol, ZeroPage, 5);
    t[0x36] = rmw(Rol, ZeroPageX, 6);
    t[0x2E] = rmw(Rol, Absolute, 6);
    t[0x3E] = rmw(Rol, AbsoluteX, 7);
    t[0x6A] = rmw(Ror, Accumulator, 2);
    t[0x66] = rmw(Ror, ZeroPage, 5);
    t[0x76] = rmw(Ror, ZeroPageX, 6);
    t[0x6E] = rmw(Ror, Absolute, 6);
    t[0x7E] = rmw(Ror, AbsoluteX, 7);

    // Jumps and subroutines
    t[0x4C] = ctl(Jmp, Absolute, 3);
    t[0x6C] = ctl(Jmp, Indirect, 5);
    t[0x20] = ctl(Jsr, Absolute, 6);
    t[0x60] = ctl(Rts, Implied, 6);
    t[0x40] = ctl(Rti, Implied, 6);

    // Branches
    t[0x10] = ctl(Bpl, Relative, 2);
    t[0x30] = ctl(Bmi, Relative, 2);
    t[0x50] = ctl(Bvc, Relative, 2);
    t[0x70] = ctl(Bvs, Relative, 2);
    t[0x90] = ctl(Bcc, Relative, 2);
    t[0xB0] = ctl(Bcs, Relative, 2);
    t[0xD0] = ctl(Bne, Relative, 2);
    t[0xF0] = ctl(Beq, Relative, 2);

    // Flags
    t[0x18] = ctl(Clc, Implied, 2);
    t[0x38] = ctl(Sec, Implied, 2);
    t[0x58] = ctl(Cli, Implied, 2);
    t[0x78] = ctl(Sei, Implied, 2);
    t[0xD8] = ctl(Cld, Implied, 2);
    t[0xF8] = ctl(Sed, Implied, 2);
    t[0xB8] = ctl(Clv, Implied, 2);

    // System
    t[0x00] = ctl(Brk, Implied, 7);
    t[0xEA] = ctl(Nop, Implied, 2);

    // Undocumented NOPs. The memory-referencing variants perform their
    // dummy read so MMIO side effects stay faithful.
    t[0x1A] = ctl(Nop, Implied, 2);
    t[0x3A] = ctl(Nop, Implied, 2);
    t[0x5A] = ctl(Nop, Implied, 2);
    t[0x7A] = ctl(Nop, Implied, 2);
    t[0xDA] = ctl(Nop, Implied, 2);
    t[0xFA] = ctl(Nop, Implied, 2);
    t[0x80] = rd(Nop, Immediate, 2);
    t[0x82] = rd(Nop, Immediate, 2);
    t[0x89] = rd(Nop, Immediate, 2);
    t[0xC2] = rd(Nop, Immediate, 2);
    t[0xE2] = rd(Nop, Immediate, 2);
    t[0x04] = rd(Nop, ZeroPage, 3);
    t[0x44] = rd(Nop, ZeroPage, 3);
    t[0x64] = rd(Nop, ZeroPage, 3);
    t[0x14] = rd(Nop, ZeroPageX, 4);
    t[0x34] = rd(Nop, ZeroPageX, 4);
    t[0x54] = rd(Nop, ZeroPageX, 4);
    t[0x74] = rd(Nop, ZeroPageX, 4);
    t[0xD4] = rd(Nop, ZeroPageX, 4);
    t[0xF4] = rd(Nop, ZeroPageX, 4);
    t[0x0C] = rd(Nop, Absolute, 4);
    t[0x1C] = rd(Nop, AbsoluteX, 4);
    t[0x3C] = rd(Nop, AbsoluteX, 4);
    t[0x5C] = rd(Nop, AbsoluteX, 4);
    t[0x7C] = rd(Nop, AbsoluteX, 4);
    t[0xDC] = rd(Nop, AbsoluteX, 4);
    t[0xFC] = rd(Nop, AbsoluteX, 4);

    // JAM/KIL: executing any of these is a fatal error.
    t[0x02] = ctl(Jam, Implied, 2);
    t[0x12] = ctl(Jam, Implied, 2);
    t[0x22] = ctl(Jam, Implied, 2);
    t[0x32] = ctl(Jam, Implied, 2);
    t[0x42] = ctl(Jam, Implied, 2);
    t[0x52] = ctl(Jam, Implied, 2);
    t[0x62] = ctl(Jam, Implied, 2);
    t[0x72] = ctl(Jam, Implied, 2);
    t[0x92] = ctl(Jam, Implied, 2);
    t[0xB2] = ctl(Jam, Implied, 2);
    t[0xD2] = ctl(Jam, Implied, 2);
    t[0xF2] = ctl(Jam, Implied, 2);

    t
}
