use crate::{error::CoreError, hardware::INT_JOYPAD, mmu::Mmu};

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
const FLAG_Z: u8 = 0x80; // Zero
const FLAG_N: u8 = 0x40; // Subtract
const FLAG_H: u8 = 0x20; // Half Carry
const FLAG_C: u8 = 0x10; // Carry

// Interrupt vectors (gbdev.io/pandocs/Interrupts.html)
const INTERRUPT_VBLANK: u16 = 0x40;
const INTERRUPT_STAT: u16 = 0x48;
const INTERRUPT_TIMER: u16 = 0x50;
const INTERRUPT_SERIAL: u16 = 0x58;
const INTERRUPT_JOYPAD: u16 = 0x60;

/// Machine cycles spent pushing PC and jumping to a vector.
const INTERRUPT_DISPATCH_M_CYCLES: u8 = 5;

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const DMG_BOOT_A: u8 = 0x01;
const DMG_BOOT_F: u8 = 0xB0;
const DMG_BOOT_B: u8 = 0x00;
const DMG_BOOT_C: u8 = 0x13;
const DMG_BOOT_D: u8 = 0x00;
const DMG_BOOT_E: u8 = 0xD8;
const DMG_BOOT_H: u8 = 0x01;
const DMG_BOOT_L: u8 = 0x4D;

pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    /// Machine cycles executed since reset
    pub cycles: u64,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    ime_enable_delay: u8,
    last_m_cycles: u8,
}

impl Cpu {
    /// CPU with the register state the boot ROM leaves behind.
    pub fn new() -> Self {
        Self {
            a: DMG_BOOT_A,
            f: DMG_BOOT_F,
            b: DMG_BOOT_B,
            c: DMG_BOOT_C,
            d: DMG_BOOT_D,
            e: DMG_BOOT_E,
            h: DMG_BOOT_H,
            l: DMG_BOOT_L,
            pc: BOOT_PC,
            sp: BOOT_SP,
            cycles: 0,
            ime: false,
            halted: false,
            stopped: false,
            ime_enable_delay: 0,
            last_m_cycles: 0,
        }
    }

    /// Create a CPU with cleared registers, for executing a boot ROM from
    /// 0x0000.
    pub fn new_power_on() -> Self {
        Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            pc: 0x0000,
            sp: 0x0000,
            cycles: 0,
            ime: false,
            halted: false,
            stopped: false,
            ime_enable_delay: 0,
            last_m_cycles: 0,
        }
    }

    /// Machine cycles consumed by the most recent `execute` call.
    pub fn last_m_cycles(&self) -> u8 {
        self.last_m_cycles
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }

    fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = (val as u8) & 0xF0;
    }

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    /// 16-bit register by the two-bit index used in opcodes 0x01/0x11/0x21/0x31.
    fn get_rr(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_hl(),
            _ => self.sp,
        }
    }

    fn set_rr(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_hl(val),
            _ => self.sp = val,
        }
    }

    fn next_interrupt(pending: u8) -> (u8, u16) {
        if pending & 0x01 != 0 {
            (0x01, INTERRUPT_VBLANK)
        } else if pending & 0x02 != 0 {
            (0x02, INTERRUPT_STAT)
        } else if pending & 0x04 != 0 {
            (0x04, INTERRUPT_TIMER)
        } else if pending & 0x08 != 0 {
            (0x08, INTERRUPT_SERIAL)
        } else {
            (0x10, INTERRUPT_JOYPAD)
        }
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> Result<u8, CoreError> {
        let val = mmu.read_byte(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(val)
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> Result<u16, CoreError> {
        let lo = self.fetch8(mmu)? as u16;
        let hi = self.fetch8(mmu)? as u16;
        Ok((hi << 8) | lo)
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) -> Result<(), CoreError> {
        self.sp = self.sp.wrapping_sub(1);
        mmu.write_byte(self.sp, (val >> 8) as u8)?;
        self.sp = self.sp.wrapping_sub(1);
        mmu.write_byte(self.sp, val as u8)
    }

    fn pop_stack(&mut self, mmu: &mut Mmu) -> Result<u16, CoreError> {
        let lo = mmu.read_byte(self.sp)? as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = mmu.read_byte(self.sp)? as u16;
        self.sp = self.sp.wrapping_add(1);
        Ok((hi << 8) | lo)
    }

    /// Operand by the three-bit index used throughout the opcode table;
    /// 6 is the byte at (HL).
    fn read_reg(&mut self, mmu: &mut Mmu, index: u8) -> Result<u8, CoreError> {
        Ok(match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => mmu.read_byte(self.get_hl())?,
            _ => self.a,
        })
    }

    fn write_reg(&mut self, mmu: &mut Mmu, index: u8, val: u8) -> Result<(), CoreError> {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            6 => mmu.write_byte(self.get_hl(), val)?,
            _ => self.a = val,
        }
        Ok(())
    }

    /// Branch condition in bits 3-4: NZ, Z, NC, C.
    fn condition(&self, opcode: u8) -> bool {
        match (opcode >> 3) & 0x03 {
            0 => self.f & FLAG_Z == 0,
            1 => self.f & FLAG_Z != 0,
            2 => self.f & FLAG_C == 0,
            _ => self.f & FLAG_C != 0,
        }
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        self.f = (self.f & FLAG_C)
            | if res == 0 { FLAG_Z } else { 0 }
            | if (val & 0x0F) + 1 > 0x0F { FLAG_H } else { 0 };
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        self.f = (self.f & FLAG_C)
            | FLAG_N
            | if res == 0 { FLAG_Z } else { 0 }
            | if val & 0x0F == 0 { FLAG_H } else { 0 };
        res
    }

    /// ADD/ADC/SUB/SBC/AND/XOR/OR/CP against A, selected by bits 3-5.
    fn alu(&mut self, op: u8, val: u8) {
        let carry_in = if self.f & FLAG_C != 0 { 1 } else { 0 };
        match op & 0x07 {
            0 | 1 => {
                let carry_in = if op & 0x07 == 1 { carry_in } else { 0 };
                let sum = self.a as u16 + val as u16 + carry_in as u16;
                let res = sum as u8;
                self.f = if res == 0 { FLAG_Z } else { 0 }
                    | if (self.a & 0x0F) + (val & 0x0F) + carry_in > 0x0F {
                        FLAG_H
                    } else {
                        0
                    }
                    | if sum > 0xFF { FLAG_C } else { 0 };
                self.a = res;
            }
            2 | 3 | 7 => {
                let carry_in = if op & 0x07 == 3 { carry_in } else { 0 };
                let diff = self.a as i16 - val as i16 - carry_in as i16;
                let res = diff as u8;
                self.f = FLAG_N
                    | if res == 0 { FLAG_Z } else { 0 }
                    | if ((self.a & 0x0F) as i16) - ((val & 0x0F) as i16) - (carry_in as i16) < 0 {
                        FLAG_H
                    } else {
                        0
                    }
                    | if diff < 0 { FLAG_C } else { 0 };
                if op & 0x07 != 7 {
                    self.a = res;
                }
            }
            4 => {
                self.a &= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 } | FLAG_H;
            }
            5 => {
                self.a ^= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
            _ => {
                self.a |= val;
                self.f = if self.a == 0 { FLAG_Z } else { 0 };
            }
        }
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.get_hl();
        let res = hl.wrapping_add(val);
        self.f = (self.f & FLAG_Z)
            | if (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF {
                FLAG_H
            } else {
                0
            }
            | if (hl as u32 + val as u32) > 0xFFFF {
                FLAG_C
            } else {
                0
            };
        self.set_hl(res);
    }

    /// SP plus a signed offset with H/C taken from the low byte, as used by
    /// ADD SP,e8 and LD HL,SP+e8.
    fn sp_plus_offset(&mut self, offset: u8) -> u16 {
        let val = offset as i8 as i16 as u16;
        let sp = self.sp;
        self.f = if ((sp & 0xF) + (val & 0xF)) > 0xF {
            FLAG_H
        } else {
            0
        } | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
            FLAG_C
        } else {
            0
        };
        sp.wrapping_add(val)
    }

    fn daa(&mut self) {
        let mut correction = 0u8;
        let mut carry = false;
        if self.f & FLAG_H != 0 || (self.f & FLAG_N == 0 && (self.a & 0x0F) > 9) {
            correction |= 0x06;
        }
        if self.f & FLAG_C != 0 || (self.f & FLAG_N == 0 && self.a > 0x99) {
            correction |= 0x60;
            carry = true;
        }
        if self.f & FLAG_N == 0 {
            self.a = self.a.wrapping_add(correction);
        } else {
            self.a = self.a.wrapping_sub(correction);
        }
        self.f = if self.a == 0 { FLAG_Z } else { 0 }
            | (self.f & FLAG_N)
            | if carry { FLAG_C } else { 0 };
    }

    /// RLC/RRC/RL/RR/SLA/SRA/SWAP/SRL selected by bits 3-5 of a CB opcode.
    fn shift_op(&mut self, op: u8, val: u8) -> u8 {
        let carry_in = if self.f & FLAG_C != 0 { 1 } else { 0 };
        let (res, carry) = match op & 0x07 {
            0 => (val.rotate_left(1), val & 0x80 != 0),
            1 => (val.rotate_right(1), val & 0x01 != 0),
            2 => ((val << 1) | carry_in, val & 0x80 != 0),
            3 => ((val >> 1) | (carry_in << 7), val & 0x01 != 0),
            4 => (val << 1, val & 0x80 != 0),
            5 => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
            6 => (val.rotate_left(4), false),
            _ => (val >> 1, val & 0x01 != 0),
        };
        self.f = if res == 0 { FLAG_Z } else { 0 } | if carry { FLAG_C } else { 0 };
        res
    }

    fn handle_cb(&mut self, mmu: &mut Mmu) -> Result<u8, CoreError> {
        let opcode = self.fetch8(mmu)?;
        let r = opcode & 0x07;
        let bit = (opcode >> 3) & 0x07;
        let val = self.read_reg(mmu, r)?;
        match opcode {
            0x00..=0x3F => {
                let res = self.shift_op(bit, val);
                self.write_reg(mmu, r, res)?;
            }
            0x40..=0x7F => {
                self.f =
                    (self.f & FLAG_C) | FLAG_H | if val & (1 << bit) == 0 { FLAG_Z } else { 0 };
                // BIT n,(HL) only reads from memory
                return Ok(if r == 6 { 3 } else { 2 });
            }
            0x80..=0xBF => self.write_reg(mmu, r, val & !(1 << bit))?,
            0xC0..=0xFF => self.write_reg(mmu, r, val | (1 << bit))?,
        }
        Ok(if r == 6 { 4 } else { 2 })
    }

    #[inline]
    fn finish(&mut self, mmu: &mut Mmu, m_cycles: u8) -> u8 {
        self.cycles += m_cycles as u64;
        self.last_m_cycles = m_cycles;
        mmu.timer.step(m_cycles as u32, &mut mmu.if_reg);
        m_cycles
    }

    /// Service at most one pending interrupt. Returns the machine cycles the
    /// dispatch took, or 0 when nothing was dispatched.
    pub fn check_interrupts(&mut self, mmu: &mut Mmu) -> Result<u8, CoreError> {
        let pending = (mmu.if_reg & mmu.ie_reg) & 0x1F;
        if pending == 0 {
            return Ok(0);
        }

        // any enabled request ends HALT, even with IME off
        self.halted = false;
        if !self.ime {
            return Ok(0);
        }

        let (bit, vector) = Self::next_interrupt(pending);
        self.ime = false;
        self.ime_enable_delay = 0;
        mmu.if_reg &= !bit;
        self.push_stack(mmu, self.pc)?;
        self.pc = vector;

        self.cycles += INTERRUPT_DISPATCH_M_CYCLES as u64;
        mmu.timer
            .step(INTERRUPT_DISPATCH_M_CYCLES as u32, &mut mmu.if_reg);
        Ok(INTERRUPT_DISPATCH_M_CYCLES)
    }

    /// Execute one instruction and return the machine cycles it consumed.
    pub fn execute(&mut self, mmu: &mut Mmu) -> Result<u8, CoreError> {
        if self.stopped {
            if mmu.if_reg & INT_JOYPAD == 0 {
                return Ok(self.finish(mmu, 1));
            }
            self.stopped = false;
        }
        if self.halted {
            return Ok(self.finish(mmu, 1));
        }

        #[cfg(feature = "cpu-trace")]
        log::trace!("{}", self.debug_state());

        let enable_after = self.ime_enable_delay == 1;
        let opcode_pc = self.pc;
        let opcode = self.fetch8(mmu)?;
        let m_cycles: u8 = match opcode {
            0x00 => 1,
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.fetch16(mmu)?;
                self.set_rr(opcode >> 4, val);
                3
            }
            0x02 => {
                mmu.write_byte(self.get_bc(), self.a)?;
                2
            }
            0x12 => {
                mmu.write_byte(self.get_de(), self.a)?;
                2
            }
            0x22 => {
                let addr = self.get_hl();
                mmu.write_byte(addr, self.a)?;
                self.set_hl(addr.wrapping_add(1));
                2
            }
            0x32 => {
                let addr = self.get_hl();
                mmu.write_byte(addr, self.a)?;
                self.set_hl(addr.wrapping_sub(1));
                2
            }
            0x03 | 0x13 | 0x23 | 0x33 => {
                let idx = opcode >> 4;
                self.set_rr(idx, self.get_rr(idx).wrapping_add(1));
                2
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let idx = opcode >> 4;
                self.set_rr(idx, self.get_rr(idx).wrapping_sub(1));
                2
            }
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r)?;
                let res = self.inc8(val);
                self.write_reg(mmu, r, res)?;
                if r == 6 { 3 } else { 1 }
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r)?;
                let res = self.dec8(val);
                self.write_reg(mmu, r, res)?;
                if r == 6 { 3 } else { 1 }
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let r = (opcode >> 3) & 0x07;
                let val = self.fetch8(mmu)?;
                self.write_reg(mmu, r, val)?;
                if r == 6 { 3 } else { 2 }
            }
            0x07 => {
                let carry = (self.a & 0x80) != 0;
                self.a = self.a.rotate_left(1);
                self.f = if carry { FLAG_C } else { 0 };
                1
            }
            0x0F => {
                let carry = (self.a & 0x01) != 0;
                self.a = self.a.rotate_right(1);
                self.f = if carry { FLAG_C } else { 0 };
                1
            }
            0x17 => {
                let carry = (self.a & 0x80) != 0;
                self.a = (self.a << 1) | if self.f & FLAG_C != 0 { 1 } else { 0 };
                self.f = if carry { FLAG_C } else { 0 };
                1
            }
            0x1F => {
                let carry = (self.a & 0x01) != 0;
                self.a = (self.a >> 1) | if self.f & FLAG_C != 0 { 0x80 } else { 0 };
                self.f = if carry { FLAG_C } else { 0 };
                1
            }
            0x08 => {
                let addr = self.fetch16(mmu)?;
                mmu.write_word(addr, self.sp)?;
                5
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.add_hl(self.get_rr(opcode >> 4));
                2
            }
            0x0A => {
                self.a = mmu.read_byte(self.get_bc())?;
                2
            }
            0x1A => {
                self.a = mmu.read_byte(self.get_de())?;
                2
            }
            0x2A => {
                let addr = self.get_hl();
                self.a = mmu.read_byte(addr)?;
                self.set_hl(addr.wrapping_add(1));
                2
            }
            0x3A => {
                let addr = self.get_hl();
                self.a = mmu.read_byte(addr)?;
                self.set_hl(addr.wrapping_sub(1));
                2
            }
            0x10 => {
                // STOP is followed by a padding byte
                self.fetch8(mmu)?;
                mmu.timer.reset_div();
                self.stopped = true;
                1
            }
            0x18 => {
                let offset = self.fetch8(mmu)? as i8;
                self.pc = self.pc.wrapping_add(offset as u16);
                3
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch8(mmu)? as i8;
                if self.condition(opcode) {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    3
                } else {
                    2
                }
            }
            0x27 => {
                self.daa();
                1
            }
            0x2F => {
                self.a = !self.a;
                self.f = (self.f & (FLAG_Z | FLAG_C)) | FLAG_N | FLAG_H;
                1
            }
            0x37 => {
                self.f = (self.f & FLAG_Z) | FLAG_C;
                1
            }
            0x3F => {
                self.f = (self.f & FLAG_Z) | if self.f & FLAG_C != 0 { 0 } else { FLAG_C };
                1
            }
            0x76 => {
                self.halted = true;
                1
            }
            0x40..=0x7F => {
                let dest = (opcode >> 3) & 0x07;
                let src = opcode & 0x07;
                let val = self.read_reg(mmu, src)?;
                self.write_reg(mmu, dest, val)?;
                if src == 6 || dest == 6 { 2 } else { 1 }
            }
            0x80..=0xBF => {
                let src = opcode & 0x07;
                let val = self.read_reg(mmu, src)?;
                self.alu(opcode >> 3, val);
                if src == 6 { 2 } else { 1 }
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.fetch8(mmu)?;
                self.alu(opcode >> 3, val);
                2
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                if self.condition(opcode) {
                    self.pc = self.pop_stack(mmu)?;
                    5
                } else {
                    2
                }
            }
            0xC9 => {
                self.pc = self.pop_stack(mmu)?;
                4
            }
            0xD9 => {
                self.pc = self.pop_stack(mmu)?;
                self.ime = true;
                4
            }
            0xC1 | 0xD1 | 0xE1 => {
                let val = self.pop_stack(mmu)?;
                self.set_rr((opcode >> 4) & 0x03, val);
                3
            }
            0xF1 => {
                let val = self.pop_stack(mmu)?;
                self.set_af(val);
                3
            }
            0xC5 | 0xD5 | 0xE5 => {
                let val = self.get_rr((opcode >> 4) & 0x03);
                self.push_stack(mmu, val)?;
                4
            }
            0xF5 => {
                let val = self.get_af() & 0xFFF0;
                self.push_stack(mmu, val)?;
                4
            }
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch16(mmu)?;
                if self.condition(opcode) {
                    self.pc = addr;
                    4
                } else {
                    3
                }
            }
            0xC3 => {
                self.pc = self.fetch16(mmu)?;
                4
            }
            0xE9 => {
                self.pc = self.get_hl();
                1
            }
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch16(mmu)?;
                if self.condition(opcode) {
                    self.push_stack(mmu, self.pc)?;
                    self.pc = addr;
                    6
                } else {
                    3
                }
            }
            0xCD => {
                let addr = self.fetch16(mmu)?;
                self.push_stack(mmu, self.pc)?;
                self.pc = addr;
                6
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push_stack(mmu, self.pc)?;
                self.pc = (opcode & 0x38) as u16;
                4
            }
            0xCB => self.handle_cb(mmu)?,
            0xE0 => {
                let offset = self.fetch8(mmu)?;
                mmu.write_byte(0xFF00 | offset as u16, self.a)?;
                3
            }
            0xF0 => {
                let offset = self.fetch8(mmu)?;
                self.a = mmu.read_byte(0xFF00 | offset as u16)?;
                3
            }
            0xE2 => {
                mmu.write_byte(0xFF00 | self.c as u16, self.a)?;
                2
            }
            0xF2 => {
                self.a = mmu.read_byte(0xFF00 | self.c as u16)?;
                2
            }
            0xEA => {
                let addr = self.fetch16(mmu)?;
                mmu.write_byte(addr, self.a)?;
                4
            }
            0xFA => {
                let addr = self.fetch16(mmu)?;
                self.a = mmu.read_byte(addr)?;
                4
            }
            0xE8 => {
                let offset = self.fetch8(mmu)?;
                self.sp = self.sp_plus_offset(offset);
                4
            }
            0xF8 => {
                let offset = self.fetch8(mmu)?;
                let res = self.sp_plus_offset(offset);
                self.set_hl(res);
                3
            }
            0xF9 => {
                self.sp = self.get_hl();
                2
            }
            0xF3 => {
                self.ime = false;
                self.ime_enable_delay = 0;
                1
            }
            0xFB => {
                self.ime_enable_delay = 2;
                1
            }
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                return Err(CoreError::UnimplementedOpcode {
                    opcode,
                    pc: opcode_pc,
                });
            }
        };

        if enable_after && self.ime_enable_delay > 0 {
            self.ime = true;
        }
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
        }
        Ok(self.finish(mmu, m_cycles))
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} IME:{} CY:{}",
            self.get_af(),
            self.get_bc(),
            self.get_de(),
            self.get_hl(),
            self.pc,
            self.sp,
            self.ime as u8,
            self.cycles
        )
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
