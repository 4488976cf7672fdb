use crate::hardware::INT_TIMER;

// Divider wraps after 256 DIV increments of 64 machine cycles each
const DIVIDER_MODULUS: u32 = 256 * 64;
const DIVIDER_STEP: u32 = 64;

// TIMA period in machine cycles, indexed by TAC bits 0-1
const TIMA_PERIODS: [u32; 4] = [256, 4, 16, 64];

const TAC_ENABLE: u8 = 0x04;

pub struct Timer {
    /// Free-running divider in machine cycles. DIV is this value / 64.
    divider: u32,
    /// Timer counter (TIMA)
    pub tima: u8,
    /// Timer modulo (TMA)
    pub tma: u8,
    /// Timer control (TAC)
    pub tac: u8,
    /// Machine cycles accumulated towards the next TIMA increment
    progress: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            divider: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            progress: 0,
        }
    }

    pub fn div(&self) -> u8 {
        (self.divider / DIVIDER_STEP) as u8
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => self.div(),
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF04 => self.reset_div(),
            0xFF05 => {
                self.tima = val;
                self.progress = 0;
            }
            0xFF06 => self.tma = val,
            0xFF07 => self.tac = val & 0x07,
            _ => {}
        }
    }

    pub fn reset_div(&mut self) {
        self.divider = 0;
    }

    fn enabled(&self) -> bool {
        self.tac & TAC_ENABLE != 0
    }

    fn period(&self) -> u32 {
        TIMA_PERIODS[(self.tac & 0x03) as usize]
    }

    /// Advance by `m_cycles` machine cycles. Returns `true` when TIMA
    /// overflowed at least once and a timer interrupt should be requested.
    pub fn tick(&mut self, m_cycles: u32) -> bool {
        self.divider = (self.divider + m_cycles) % DIVIDER_MODULUS;

        if !self.enabled() {
            return false;
        }

        let period = self.period();
        self.progress += m_cycles;
        let mut overflowed = false;
        while self.progress >= period {
            self.progress -= period;
            let (next, carry) = self.tima.overflowing_add(1);
            if carry {
                self.tima = self.tma;
                overflowed = true;
            } else {
                self.tima = next;
            }
        }
        overflowed
    }

    /// Advance and fold an overflow into the interrupt flag register.
    pub fn step(&mut self, m_cycles: u32, if_reg: &mut u8) {
        if self.tick(m_cycles) {
            *if_reg |= INT_TIMER;
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
