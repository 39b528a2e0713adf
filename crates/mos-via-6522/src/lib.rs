//! MOS 6522 Versatile Interface Adapter (VIA).
//!
//! The 6522 provides two 8-bit I/O ports, two 16-bit timers, a serial
//! shift register, and an interrupt controller. The VIC-20 uses two:
//! VIA1 drives the NMI line (restore key, some joystick lines) and VIA2
//! drives the IRQ line (jiffy timer, keyboard matrix).
//!
//! # Registers ($0-$F)
//!
//! | Reg | Name | Description                              |
//! |-----|------|------------------------------------------|
//! | $0  | ORB  | Port B data (handshake on access)        |
//! | $1  | ORA  | Port A data (handshake on access)        |
//! | $2  | DDRB | Port B data direction (1 = output)       |
//! | $3  | DDRA | Port A data direction (1 = output)       |
//! | $4  | T1CL | Timer 1 counter low (read clears T1 IRQ) |
//! | $5  | T1CH | Timer 1 counter high (write arms T1)     |
//! | $6  | T1LL | Timer 1 latch low                        |
//! | $7  | T1LH | Timer 1 latch high (write clears T1 IRQ) |
//! | $8  | T2CL | Timer 2 counter low (read arms T2)       |
//! | $9  | T2CH | Timer 2 counter high (write arms T2)     |
//! | $A  | SR   | Shift register                           |
//! | $B  | ACR  | Auxiliary control register               |
//! | $C  | PCR  | Peripheral control register              |
//! | $D  | IFR  | Interrupt flag register                  |
//! | $E  | IER  | Interrupt enable register                |
//! | $F  | ORA  | Port A data (no handshake)               |
//!
//! Timers free-run through $FFFF after a one-shot expiry; the per-timer
//! inhibit latch keeps later wrap-arounds from raising the interrupt flag
//! again until the timer is re-armed through its register interface.

#![allow(clippy::cast_possible_truncation)]

// IFR/IER bit masks.
pub const IRQ_CA2: u8 = 0x01;
pub const IRQ_CA1: u8 = 0x02;
pub const IRQ_SR: u8 = 0x04;
pub const IRQ_CB2: u8 = 0x08;
pub const IRQ_CB1: u8 = 0x10;
pub const IRQ_T2: u8 = 0x20;
pub const IRQ_T1: u8 = 0x40;

/// MOS 6522 Versatile Interface Adapter.
pub struct Via6522 {
    /// Port A output register.
    ora: u8,
    /// Port B output register.
    orb: u8,
    /// Port A data direction register (1 = output).
    ddra: u8,
    /// Port B data direction register (1 = output).
    ddrb: u8,

    /// Port A input latch, written by the host (keyboard rows, joystick).
    ila: u8,
    /// Port B input latch.
    ilb: u8,

    /// Timer 1 counter (counts down).
    t1_counter: u16,
    /// Timer 1 latch, reloaded into the counter on arm or in free-run.
    t1_latch: u16,
    /// Timer 2 counter.
    t2_counter: u16,
    /// Timer 2 latch (only the low byte is latched).
    t2_latch_lo: u8,

    /// Suppress further T1 interrupt raises until T1 is re-armed.
    inhibit_t1: bool,
    /// Suppress further T2 interrupt raises until T2 is re-armed.
    inhibit_t2: bool,

    /// Shift register.
    sr: u8,
    /// Auxiliary control register. Bit 6 selects T1 continuous mode,
    /// bit 7 routes T1 to PB7.
    acr: u8,
    /// Peripheral control register. Bit 0 / bit 4 select the CA1 / CB1
    /// active edge (1 = rising).
    pcr: u8,
    /// Interrupt flags, bits 0-6. Bit 7 is derived on read.
    ifr: u8,
    /// Interrupt enables, bits 0-6.
    ier: u8,

    /// Previous CA1 level for edge detection.
    ca1_prev: bool,
    /// Previous CB1 level for edge detection.
    cb1_prev: bool,

    /// PB7 output level, driven high by a T1 expiry when ACR bit 7 is set.
    pb7: bool,
}

impl Via6522 {
    /// A VIA in its reset state.
    #[must_use]
    pub fn new() -> Self {
        let mut via = Self {
            ora: 0,
            orb: 0,
            ddra: 0,
            ddrb: 0,
            ila: 0xFF,
            ilb: 0xFF,
            t1_counter: 0xFFFF,
            t1_latch: 0xFFFF,
            t2_counter: 0xFFFF,
            t2_latch_lo: 0xFF,
            inhibit_t1: true,
            inhibit_t2: true,
            sr: 0xFF,
            acr: 0,
            pcr: 0,
            ifr: 0,
            ier: 0,
            ca1_prev: false,
            cb1_prev: false,
            pb7: false,
        };
        via.reset();
        via
    }

    /// Reset per the datasheet: R0-R3 and RB-RF clear, R4-RA set to $FF,
    /// both timer inhibits armed.
    pub fn reset(&mut self) {
        self.ora = 0;
        self.orb = 0;
        self.ddra = 0;
        self.ddrb = 0;
        self.t1_counter = 0xFFFF;
        self.t1_latch = 0xFFFF;
        self.t2_counter = 0xFFFF;
        self.t2_latch_lo = 0xFF;
        self.sr = 0xFF;
        self.acr = 0;
        self.pcr = 0;
        self.ifr = 0;
        self.ier = 0;
        self.inhibit_t1 = true;
        self.inhibit_t2 = true;
        self.ca1_prev = false;
        self.cb1_prev = false;
        self.pb7 = false;
    }

    // ---------------------------------------------------------------------
    // Clock phases
    // ---------------------------------------------------------------------

    /// First phi2 phase of the cycle. Timers count and raise flags here.
    pub fn cycle_up(&mut self) {
        // Timer 1.
        if self.t1_counter == 0 {
            if self.acr & 0x40 != 0 {
                // Continuous mode: raise and reload from the latch.
                self.ifr |= IRQ_T1;
                self.pb7 = true;
                self.t1_counter = self.t1_latch;
            } else {
                // One-shot: raise once per arm, then free-run inhibited.
                if !self.inhibit_t1 {
                    self.ifr |= IRQ_T1;
                    self.pb7 = true;
                }
                self.t1_counter = 0xFFFF;
                self.inhibit_t1 = true;
            }
        } else {
            self.t1_counter -= 1;
        }

        // Timer 2 is always one-shot.
        if self.t2_counter == 0 {
            if !self.inhibit_t2 {
                self.ifr |= IRQ_T2;
            }
            self.t2_counter = 0xFFFF;
            self.inhibit_t2 = true;
        } else {
            self.t2_counter -= 1;
        }
    }

    /// Second phi2 phase of the cycle. Present for bus symmetry; all timer
    /// work happens in the combined step driven by `cycle_up`.
    pub fn cycle_down(&mut self) {}

    /// Interrupt line level as wired to the CPU: any enabled flag set.
    ///
    /// Pure observation with no side effects, so the machine may sample
    /// it as often as it likes (the NMI edge detector reads it twice per
    /// tick). The inhibit latches gate the *raising* of the timer flags
    /// in `cycle_up`, not this level.
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.ifr & self.ier & 0x7F != 0
    }

    /// Interrupt observation with the register-contract side effect:
    /// T1/T2 flags are masked by their inhibit latches, and observing a
    /// masked flag releases the latch so the next observation fires
    /// normally.
    ///
    /// This consumes guest-visible state; the machine wiring samples
    /// `irq_line` instead.
    pub fn irq(&mut self) -> bool {
        let mut active = self.ifr & self.ier & 0x7F;
        if self.inhibit_t1 && active & IRQ_T1 != 0 {
            active &= !IRQ_T1;
            self.inhibit_t1 = false;
        }
        if self.inhibit_t2 && active & IRQ_T2 != 0 {
            active &= !IRQ_T2;
            self.inhibit_t2 = false;
        }
        active != 0
    }

    // ---------------------------------------------------------------------
    // Register file
    // ---------------------------------------------------------------------

    /// Read a register.
    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x00 => {
                // ORB with handshake: clears the CB1/CB2 flags.
                self.ifr &= !(IRQ_CB1 | IRQ_CB2);
                self.read_port_b()
            }
            0x01 => {
                // ORA with handshake: clears the CA1/CA2 flags.
                self.ifr &= !(IRQ_CA1 | IRQ_CA2);
                self.read_port_a()
            }
            0x02 => self.ddrb,
            0x03 => self.ddra,
            0x04 => {
                // T1C-L: clears the T1 flag.
                self.ifr &= !IRQ_T1;
                self.t1_counter as u8
            }
            0x05 => (self.t1_counter >> 8) as u8,
            0x06 => self.t1_latch as u8,
            0x07 => (self.t1_latch >> 8) as u8,
            0x08 => {
                // T2C-L: clears the T2 flag and re-arms T2.
                self.ifr &= !IRQ_T2;
                self.inhibit_t2 = false;
                self.t2_counter as u8
            }
            0x09 => (self.t2_counter >> 8) as u8,
            0x0A => self.sr,
            0x0B => self.acr,
            0x0C => self.pcr,
            0x0D => {
                // IFR: bit 7 mirrors "any enabled interrupt pending".
                let any = if self.ifr & self.ier & 0x7F != 0 {
                    0x80
                } else {
                    0
                };
                (self.ifr & 0x7F) | any
            }
            0x0E => self.ier | 0x80,
            0x0F => self.read_port_a(),
            _ => 0xFF,
        }
    }

    /// Write a register.
    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0F {
            0x00 => {
                self.ifr &= !(IRQ_CB1 | IRQ_CB2);
                self.orb = value;
            }
            0x01 => {
                self.ifr &= !(IRQ_CA1 | IRQ_CA2);
                self.ora = value;
            }
            0x02 => self.ddrb = value,
            0x03 => self.ddra = value,
            0x04 => {
                self.t1_latch = (self.t1_latch & 0xFF00) | u16::from(value);
            }
            0x05 => {
                // T1C-H arms the timer: latch high stored, counter loaded
                // from the latch, flag cleared, inhibit released.
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(value) << 8);
                self.t1_counter = self.t1_latch;
                self.ifr &= !IRQ_T1;
                self.inhibit_t1 = false;
            }
            0x06 => {
                self.t1_latch = (self.t1_latch & 0xFF00) | u16::from(value);
            }
            0x07 => {
                // Latch high only; the counter keeps running.
                self.t1_latch = (self.t1_latch & 0x00FF) | (u16::from(value) << 8);
                self.ifr &= !IRQ_T1;
            }
            0x08 => self.t2_latch_lo = value,
            0x09 => {
                // T2C-H arms the timer: low byte from the latch.
                self.t2_counter = u16::from(self.t2_latch_lo) | (u16::from(value) << 8);
                self.ifr &= !IRQ_T2;
                self.inhibit_t2 = false;
            }
            0x0A => self.sr = value,
            0x0B => self.acr = value,
            0x0C => self.pcr = value,
            0x0D => {
                // Writing ones clears the corresponding flags.
                self.ifr &= !(value & 0x7F);
            }
            0x0E => {
                // Bit 7 selects set (1) or clear (0) of the enable bits.
                if value & 0x80 != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !(value & 0x7F);
                }
            }
            0x0F => self.ora = value,
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Port and control lines
    // ---------------------------------------------------------------------

    /// Latch the external level of the port A input pins.
    pub fn set_port_a_input(&mut self, value: u8) {
        self.ila = value;
    }

    /// Latch the external level of the port B input pins.
    pub fn set_port_b_input(&mut self, value: u8) {
        self.ilb = value;
    }

    /// Port A as seen by the outside: driven bits from ORA, undriven bits
    /// float high.
    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        (self.ora & self.ddra) | !self.ddra
    }

    /// Port B as seen by the outside. When ACR bit 7 is set, PB7 carries
    /// the timer 1 output instead of ORB bit 7.
    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        let mut out = (self.orb & self.ddrb) | !self.ddrb;
        if self.acr & 0x80 != 0 {
            out = (out & 0x7F) | if self.pb7 { 0x80 } else { 0 };
        }
        out
    }

    /// Drive the CA1 input line. The configured edge (PCR bit 0) sets the
    /// CA1 flag.
    pub fn set_ca1(&mut self, level: bool) {
        let rising = self.pcr & 0x01 != 0;
        let triggered = if rising {
            !self.ca1_prev && level
        } else {
            self.ca1_prev && !level
        };
        if triggered {
            self.ifr |= IRQ_CA1;
        }
        self.ca1_prev = level;
    }

    /// Drive the CB1 input line. The configured edge (PCR bit 4) sets the
    /// CB1 flag.
    pub fn set_cb1(&mut self, level: bool) {
        let rising = self.pcr & 0x10 != 0;
        let triggered = if rising {
            !self.cb1_prev && level
        } else {
            self.cb1_prev && !level
        };
        if triggered {
            self.ifr |= IRQ_CB1;
        }
        self.cb1_prev = level;
    }

    /// Set the CA2 flag directly (external handshake logic).
    pub fn set_ca2_flag(&mut self) {
        self.ifr |= IRQ_CA2;
    }

    /// Set the CB2 flag directly.
    pub fn set_cb2_flag(&mut self) {
        self.ifr |= IRQ_CB2;
    }

    // ---------------------------------------------------------------------
    // Observation (no side effects)
    // ---------------------------------------------------------------------

    /// Read a register without the side effects of a bus access (no flag
    /// clears, no timer re-arm). For observation and debugging.
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x00 => self.read_port_b(),
            0x01 | 0x0F => self.read_port_a(),
            0x02 => self.ddrb,
            0x03 => self.ddra,
            0x04 => self.t1_counter as u8,
            0x05 => (self.t1_counter >> 8) as u8,
            0x06 => self.t1_latch as u8,
            0x07 => (self.t1_latch >> 8) as u8,
            0x08 => self.t2_counter as u8,
            0x09 => (self.t2_counter >> 8) as u8,
            0x0A => self.sr,
            0x0B => self.acr,
            0x0C => self.pcr,
            0x0D => {
                let any = if self.ifr & self.ier & 0x7F != 0 {
                    0x80
                } else {
                    0
                };
                (self.ifr & 0x7F) | any
            }
            0x0E => self.ier | 0x80,
            _ => 0xFF,
        }
    }

    /// IFR bits 0-6 without the handshake side effects of a bus read.
    #[must_use]
    pub fn ifr(&self) -> u8 {
        self.ifr
    }

    /// IER bits 0-6.
    #[must_use]
    pub fn ier(&self) -> u8 {
        self.ier
    }

    /// Timer 1 counter.
    #[must_use]
    pub fn timer1(&self) -> u16 {
        self.t1_counter
    }

    /// Timer 2 counter.
    #[must_use]
    pub fn timer2(&self) -> u16 {
        self.t2_counter
    }

    fn read_port_a(&self) -> u8 {
        (self.ora & self.ddra) | (self.ila & !self.ddra)
    }

    fn read_port_b(&self) -> u8 {
        let mut value = (self.orb & self.ddrb) | (self.ilb & !self.ddrb);
        if self.acr & 0x80 != 0 {
            value = (value & 0x7F) | if self.pb7 { 0x80 } else { 0 };
        }
        value
    }
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Arm T1 as a one-shot with the given period.
    fn arm_t1(via: &mut Via6522, period: u16) {
        via.write(0x04, period as u8);
        via.write(0x05, (period >> 8) as u8);
    }

    #[test]
    fn reset_state() {
        let via = Via6522::new();
        assert_eq!(via.timer1(), 0xFFFF);
        assert_eq!(via.timer2(), 0xFFFF);
        assert_eq!(via.ifr(), 0);
        assert_eq!(via.ier(), 0);
    }

    #[test]
    fn one_shot_t1_raises_once_per_arm() {
        // ACR bit 6 clear, T1 = $0010: IFR bit 6 set after 17 ticks, set
        // exactly once, and later wrap-arounds stay silent until re-armed.
        let mut via = Via6522::new();
        arm_t1(&mut via, 0x0010);

        for tick in 1..=16 {
            via.cycle_up();
            assert_eq!(via.ifr() & IRQ_T1, 0, "flag raised early at tick {tick}");
        }
        via.cycle_up();
        assert_ne!(via.ifr() & IRQ_T1, 0, "flag not raised on expiry");
        assert_eq!(via.timer1(), 0xFFFF);

        // The flag stays set through the free-running wrap.
        for _ in 0..0x10000u32 + 32 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T1, 0);

        // Clear it by reading T1C-L; later expirations must not re-raise.
        let _ = via.read(0x04);
        assert_eq!(via.ifr() & IRQ_T1, 0);
        for _ in 0..0x10000u32 + 32 {
            via.cycle_up();
        }
        assert_eq!(via.ifr() & IRQ_T1, 0);

        // Writing T1C-H re-arms.
        arm_t1(&mut via, 0x0002);
        for _ in 0..3 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T1, 0);
    }

    #[test]
    fn continuous_t1_reloads_and_re_raises() {
        let mut via = Via6522::new();
        via.write(0x0B, 0x40); // ACR bit 6: continuous
        arm_t1(&mut via, 0x0004);

        for _ in 0..5 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T1, 0);
        assert_eq!(via.timer1(), 0x0004);

        via.write(0x0D, IRQ_T1); // acknowledge
        for _ in 0..5 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T1, 0, "continuous mode must re-raise");
    }

    #[test]
    fn t1_read_low_clears_flag() {
        let mut via = Via6522::new();
        arm_t1(&mut via, 0x0001);
        via.cycle_up();
        via.cycle_up();
        assert_ne!(via.ifr() & IRQ_T1, 0);
        let _ = via.read(0x04);
        assert_eq!(via.ifr() & IRQ_T1, 0);
    }

    #[test]
    fn t1_latch_high_write_does_not_arm() {
        let mut via = Via6522::new();
        via.write(0x06, 0x10);
        via.write(0x07, 0x00);
        // Counter untouched, flag cleared, inhibit still armed.
        assert_eq!(via.timer1(), 0xFFFF);
        for _ in 0..0x10000u32 + 16 {
            via.cycle_up();
        }
        assert_eq!(via.ifr() & IRQ_T1, 0);
    }

    #[test]
    fn t1_counter_load_copies_latch() {
        let mut via = Via6522::new();
        via.write(0x04, 0x34);
        via.write(0x05, 0x12);
        assert_eq!(via.timer1(), 0x1234);
        assert_eq!(via.read(0x06), 0x34);
        assert_eq!(via.read(0x07), 0x12);
    }

    #[test]
    fn t2_one_shot_and_rearm_by_read() {
        let mut via = Via6522::new();
        via.write(0x08, 0x03);
        via.write(0x09, 0x00);
        assert_eq!(via.timer2(), 0x0003);

        for _ in 0..4 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T2, 0);

        // Reading T2C-L clears the flag and re-arms the timer.
        let _ = via.read(0x08);
        assert_eq!(via.ifr() & IRQ_T2, 0);
        for _ in 0..0x10000u32 + 8 {
            via.cycle_up();
        }
        assert_ne!(via.ifr() & IRQ_T2, 0, "re-armed T2 must raise on wrap");
    }

    #[test]
    fn t2_high_write_loads_low_from_latch() {
        let mut via = Via6522::new();
        via.write(0x08, 0xCD);
        via.write(0x09, 0xAB);
        assert_eq!(via.timer2(), 0xABCD);
    }

    #[test]
    fn ifr_write_clears_selected_flags() {
        let mut via = Via6522::new();
        via.ifr = IRQ_T1 | IRQ_T2 | IRQ_CA1;
        via.write(0x0D, IRQ_T1 | IRQ_CA1);
        assert_eq!(via.ifr(), IRQ_T2);
    }

    #[test]
    fn ier_set_and_clear_modes() {
        let mut via = Via6522::new();
        via.write(0x0E, 0x80 | IRQ_T1 | IRQ_CB1);
        assert_eq!(via.ier(), IRQ_T1 | IRQ_CB1);
        via.write(0x0E, IRQ_T1);
        assert_eq!(via.ier(), IRQ_CB1);
    }

    #[test]
    fn ier_reads_with_bit7_set() {
        let mut via = Via6522::new();
        via.write(0x0E, 0x80 | 0x42);
        assert_eq!(via.read(0x0E), 0xC2);
    }

    #[test]
    fn ifr_bit7_reflects_unmasked_pending() {
        let mut via = Via6522::new();
        via.ifr = IRQ_T1;
        assert_eq!(via.read(0x0D) & 0x80, 0, "no enable, no summary bit");
        via.write(0x0E, 0x80 | IRQ_T1);
        assert_ne!(via.read(0x0D) & 0x80, 0);
    }

    #[test]
    fn irq_observation_requires_flag_and_enable() {
        let mut via = Via6522::new();
        via.ifr = IRQ_CA1;
        assert!(!via.irq());
        via.write(0x0E, 0x80 | IRQ_CA1);
        assert!(via.irq());
        via.write(0x0D, IRQ_CA1);
        assert!(!via.irq());
    }

    #[test]
    fn irq_line_rises_at_expiry_without_consuming_state() {
        let mut via = Via6522::new();
        via.write(0x0E, 0x80 | IRQ_T1);
        arm_t1(&mut via, 0x0002);
        via.cycle_up();
        via.cycle_up();
        assert!(!via.irq_line());
        via.cycle_up(); // expiry raises the flag
        assert!(via.irq_line());
        assert!(via.irq_line(), "repeated sampling must not consume");
        // The one-shot inhibit is still armed for the register contract:
        // the first masked observation releases it, the next one fires.
        assert!(!via.irq());
        assert!(via.irq());
        assert!(via.irq_line());
    }

    #[test]
    fn masked_t1_observation_releases_inhibit() {
        let mut via = Via6522::new();
        via.write(0x0E, 0x80 | IRQ_T1);
        arm_t1(&mut via, 0x0002);
        for _ in 0..3 {
            via.cycle_up();
        }
        // Expiry set the flag and the one-shot inhibit together; the first
        // observation is masked, the next one fires.
        assert!(!via.irq());
        assert!(via.irq());
    }

    #[test]
    fn orb_read_clears_cb_flags_only() {
        let mut via = Via6522::new();
        via.ifr = IRQ_CB1 | IRQ_CB2 | IRQ_T1;
        let _ = via.read(0x00);
        assert_eq!(via.ifr() & (IRQ_CB1 | IRQ_CB2), 0);
        assert_ne!(via.ifr() & IRQ_T1, 0);
    }

    #[test]
    fn ora_read_clears_ca_flags_only() {
        let mut via = Via6522::new();
        via.ifr = IRQ_CA1 | IRQ_CA2 | IRQ_T2;
        let _ = via.read(0x01);
        assert_eq!(via.ifr() & (IRQ_CA1 | IRQ_CA2), 0);
        assert_ne!(via.ifr() & IRQ_T2, 0);
    }

    #[test]
    fn ora_no_handshake_preserves_ca_flags() {
        let mut via = Via6522::new();
        via.ifr = IRQ_CA1 | IRQ_CA2;
        let _ = via.read(0x0F);
        assert_ne!(via.ifr() & IRQ_CA1, 0);
        assert_ne!(via.ifr() & IRQ_CA2, 0);
    }

    #[test]
    fn port_mixing_honours_ddr() {
        let mut via = Via6522::new();
        via.write(0x03, 0x0F); // DDRA: low nybble output
        via.write(0x01, 0xAB);
        via.set_port_a_input(0xC3);
        // Output bits from ORA, input bits from the latch.
        assert_eq!(via.read(0x0F), 0xCB);
    }

    #[test]
    fn port_b_input_latch() {
        let mut via = Via6522::new();
        via.write(0x02, 0x00); // all input
        via.set_port_b_input(0x42);
        assert_eq!(via.read(0x00), 0x42);
    }

    #[test]
    fn ca1_edges_follow_pcr() {
        let mut via = Via6522::new();
        via.write(0x0C, 0x01); // CA1 rising edge
        via.set_ca1(true);
        assert_ne!(via.ifr() & IRQ_CA1, 0);

        let mut via = Via6522::new();
        via.write(0x0C, 0x00); // CA1 falling edge
        via.set_ca1(true);
        assert_eq!(via.ifr() & IRQ_CA1, 0);
        via.set_ca1(false);
        assert_ne!(via.ifr() & IRQ_CA1, 0);
    }

    #[test]
    fn cb1_edges_follow_pcr() {
        let mut via = Via6522::new();
        via.write(0x0C, 0x10); // CB1 rising edge
        via.set_cb1(true);
        assert_ne!(via.ifr() & IRQ_CB1, 0);
    }

    #[test]
    fn pb7_driven_high_by_t1_expiry() {
        let mut via = Via6522::new();
        via.write(0x0B, 0x80); // ACR bit 7: PB7 under timer control
        via.write(0x02, 0x80); // PB7 output
        arm_t1(&mut via, 0x0001);
        assert_eq!(via.port_b_output() & 0x80, 0);
        via.cycle_up();
        via.cycle_up();
        assert_ne!(via.port_b_output() & 0x80, 0);
    }
}
