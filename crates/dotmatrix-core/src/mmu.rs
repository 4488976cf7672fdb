use log::{debug, info};

use crate::{
    cartridge::Cartridge,
    error::CoreError,
    hardware::IoPolicy,
    input::Input,
    ppu::{OAM_SIZE, Ppu},
    timer::Timer,
};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;
const IO_SIZE: usize = 0x80;

/// What an address in the I/O window decodes to when nothing emulates it.
enum Unmodeled {
    /// A real peripheral (serial, sound) that is not emulated.
    Peripheral,
    /// No register lives here.
    Unmapped,
}

fn unmodeled_kind(addr: u16) -> Unmodeled {
    match addr {
        0xFF01 | 0xFF02 | 0xFF10..=0xFF3F => Unmodeled::Peripheral,
        _ => Unmodeled::Unmapped,
    }
}

pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub boot_rom: Option<Vec<u8>>,
    pub boot_mapped: bool,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub ppu: Ppu,
    pub timer: Timer,
    pub input: Input,
    io_policy: IoPolicy,
    /// I/O addresses already reported under [`IoPolicy::BestEffort`]
    reported_io: [bool; IO_SIZE],
}

impl Mmu {
    /// Bus in its power-on state with the strict I/O policy.
    pub fn new() -> Self {
        Self::new_with_policy(IoPolicy::Strict)
    }

    pub fn new_with_policy(io_policy: IoPolicy) -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            boot_rom: None,
            boot_mapped: false,
            if_reg: 0,
            ie_reg: 0,
            ppu: Ppu::new(),
            timer: Timer::new(),
            input: Input::new(),
            io_policy,
            reported_io: [false; IO_SIZE],
        }
    }

    /// Registers as the boot ROM leaves them when it hands over to the
    /// cartridge at 0x0100.
    pub fn apply_boot_state(&mut self) {
        self.ppu.apply_boot_state();
        self.if_reg = 0x01;
        self.boot_mapped = false;
    }

    pub fn io_policy(&self) -> IoPolicy {
        self.io_policy
    }

    pub fn set_io_policy(&mut self, policy: IoPolicy) {
        self.io_policy = policy;
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        info!("Inserted cartridge \"{}\" ({:?})", cart.title, cart.mbc);
        self.cart = Some(cart);
    }

    /// Map a boot image over 0x0000-0x00FF until 0xFF50 is written.
    pub fn load_boot_rom(&mut self, data: Vec<u8>) {
        self.boot_rom = Some(data);
        self.boot_mapped = true;
    }

    pub fn unmap_boot_rom(&mut self) {
        if self.boot_mapped {
            debug!("Boot ROM unmapped");
        }
        self.boot_mapped = false;
    }

    fn unmodeled_read(&mut self, addr: u16) -> Result<u8, CoreError> {
        match self.io_policy {
            IoPolicy::Strict => Err(self.unmodeled_error(addr)),
            IoPolicy::BestEffort => {
                self.report_once(addr, "read");
                Ok(0xFF)
            }
        }
    }

    fn unmodeled_write(&mut self, addr: u16, val: u8) -> Result<(), CoreError> {
        match self.io_policy {
            IoPolicy::Strict => Err(self.unmodeled_error(addr)),
            IoPolicy::BestEffort => {
                self.report_once(addr, "write");
                log::trace!("Dropped write {val:02X} to {addr:04X}");
                Ok(())
            }
        }
    }

    fn unmodeled_error(&self, addr: u16) -> CoreError {
        match unmodeled_kind(addr) {
            Unmodeled::Peripheral => CoreError::UnmodeledIo { addr },
            Unmodeled::Unmapped => CoreError::UnmappedAddress { addr },
        }
    }

    fn report_once(&mut self, addr: u16, access: &str) {
        let slot = (addr as usize) & (IO_SIZE - 1);
        if !self.reported_io[slot] {
            self.reported_io[slot] = true;
            match unmodeled_kind(addr) {
                Unmodeled::Peripheral => {
                    debug!("Unmodelled peripheral {access} at {addr:04X}; continuing")
                }
                Unmodeled::Unmapped => debug!("Unmapped I/O {access} at {addr:04X}; continuing"),
            }
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> Result<u8, CoreError> {
        let val = match addr {
            0x0000..=0x00FF if self.boot_mapped => match &self.boot_rom {
                Some(boot) => boot.get(addr as usize).copied().unwrap_or(0xFF),
                None => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            },
            0x0000..=0x7FFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            0xA000..=0xBFFF => self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF),
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0x00,
            0xFF00 => self.input.read(),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF50 => 0xFF,
            0xFF00..=0xFF7F => return self.unmodeled_read(addr),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
        };
        Ok(val)
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) -> Result<(), CoreError> {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val)?;
                }
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF04..=0xFF07 => self.timer.write(addr, val),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF46 => {
                self.ppu.write_reg(addr, val);
                let block = self.read_dma_block(val)?;
                self.ppu.dma_transfer(&block);
            }
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val),
            0xFF50 => {
                if val != 0 {
                    self.unmap_boot_rom();
                }
            }
            0xFF00..=0xFF7F => return self.unmodeled_write(addr, val),
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
        }
        Ok(())
    }

    pub fn read_word(&mut self, addr: u16) -> Result<u16, CoreError> {
        let lo = self.read_byte(addr)? as u16;
        let hi = self.read_byte(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn write_word(&mut self, addr: u16, val: u16) -> Result<(), CoreError> {
        self.write_byte(addr, val as u8)?;
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8)
    }

    /// The 160 bytes starting at `page << 8`, read through the decoder.
    pub fn read_dma_block(&mut self, page: u8) -> Result<[u8; OAM_SIZE], CoreError> {
        let base = (page as u16) << 8;
        let mut block = [0u8; OAM_SIZE];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = self.read_byte(base.wrapping_add(i as u16))?;
        }
        Ok(block)
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
