use log::{debug, trace};

use crate::error::{CartridgeError, CoreError};

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

// Header layout (gbdev.io/pandocs/The_Cartridge_Header.html)
const HEADER_END: usize = 0x0150;
const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const CART_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc3,
    Mbc5,
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    cart_type: u8,
    mbc_state: MbcState,
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
    },
}

impl Cartridge {
    /// Validate a cartridge image and set up its bank controller.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&data)?;
        let declared = header.rom_size()?;
        if declared > data.len() {
            return Err(CartridgeError::TruncatedBanks {
                declared,
                actual: data.len(),
            });
        }

        let cart_type = header.cart_type();
        let mbc = header.mbc_type()?;
        let title = header.title();
        let ram_size = header.ram_size();

        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                mode: 0,
                ram_enable: false,
            },
            MbcType::Mbc3 => MbcState::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
            MbcType::Mbc5 => MbcState::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
            },
        };

        debug!(
            "Loaded cartridge \"{title}\": type {cart_type:02X} ({mbc:?}), {} ROM banks, {ram_size} bytes RAM",
            data.len() / ROM_BANK_SIZE
        );

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            cart_type,
            mbc_state,
        })
    }

    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }

    fn rom_bank_count(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    fn ram_bank_count(&self) -> usize {
        self.ram.len().div_ceil(RAM_BANK_SIZE)
    }

    /// Bank currently mapped at 0x0000-0x3FFF.
    fn low_rom_bank(&self) -> usize {
        match &self.mbc_state {
            MbcState::Mbc1 { ram_bank, mode, .. } if *mode == 1 => {
                (((*ram_bank as usize) & 0x03) << 5) % self.rom_bank_count()
            }
            _ => 0,
        }
    }

    /// Bank currently mapped at 0x4000-0x7FFF.
    pub fn high_rom_bank(&self) -> usize {
        let bank = match &self.mbc_state {
            MbcState::NoMbc => 1,
            MbcState::Mbc1 {
                rom_bank, ram_bank, ..
            } => (((*ram_bank as usize) & 0x03) << 5) | (*rom_bank as usize),
            MbcState::Mbc3 { rom_bank, .. } => *rom_bank as usize,
            MbcState::Mbc5 { rom_bank, .. } => *rom_bank as usize,
        };
        bank % self.rom_bank_count()
    }

    fn ram_enabled(&self) -> bool {
        match &self.mbc_state {
            MbcState::NoMbc => true,
            MbcState::Mbc1 { ram_enable, .. }
            | MbcState::Mbc3 { ram_enable, .. }
            | MbcState::Mbc5 { ram_enable, .. } => *ram_enable,
        }
    }

    fn ram_index(&self, addr: u16) -> Option<usize> {
        if self.ram.is_empty() {
            return None;
        }
        let bank = match &self.mbc_state {
            MbcState::NoMbc => 0,
            MbcState::Mbc1 { ram_bank, mode, .. } => {
                if *mode == 0 {
                    0
                } else {
                    *ram_bank as usize
                }
            }
            MbcState::Mbc3 { ram_bank, .. } | MbcState::Mbc5 { ram_bank, .. } => *ram_bank as usize,
        };
        let bank = bank % self.ram_bank_count();
        let idx = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
        Some(idx % self.ram.len())
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => {
                let offset = self.low_rom_bank() * ROM_BANK_SIZE + addr as usize;
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            0x4000..=0x7FFF => {
                let offset = self.high_rom_bank() * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => {
                if !self.ram_enabled() {
                    return 0xFF;
                }
                self.ram_index(addr).map(|i| self.ram[i]).unwrap_or(0xFF)
            }
            _ => 0xFF,
        }
    }

    /// Writes below 0x8000 program the bank controller; writes in
    /// 0xA000-0xBFFF go to external RAM.
    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), CoreError> {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0x0000..=0x7FFF) => {
                trace!("Ignoring ROM write {val:02X} to {addr:04X} on cartridge without MBC");
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF)
            | (MbcState::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x1F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
                trace!("MBC1 ROM bank {:02X}", *rom_bank);
            }
            (MbcState::Mbc1 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x03;
            }
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
            }
            (MbcState::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
                trace!("MBC3 ROM bank {:02X}", *rom_bank);
            }
            (MbcState::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                if (0x08..=0x0C).contains(&val) {
                    return Err(CoreError::UnsupportedBankMode {
                        what: "MBC3 real-time clock register select",
                        addr,
                        val,
                    });
                }
                *ram_bank = val & 0x03;
            }
            (MbcState::Mbc3 { .. }, 0x6000..=0x7FFF) => {
                trace!("Ignoring MBC3 clock latch write {val:02X}");
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
                trace!("MBC5 ROM bank {:03X}", *rom_bank);
            }
            (MbcState::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0x0FF) | (((val & 0x01) as u16) << 8);
            }
            (MbcState::Mbc5 { ram_bank, .. }, 0x4000..=0x5FFF) => {
                *ram_bank = val & 0x0F;
            }
            (MbcState::Mbc5 { .. }, 0x6000..=0x7FFF) => {}
            (_, 0xA000..=0xBFFF) => {
                if self.ram_enabled()
                    && let Some(idx) = self.ram_index(addr)
                {
                    self.ram[idx] = val;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooShort { len: data.len() });
        }
        Ok(Self { data })
    }

    fn title(&self) -> String {
        let mut slice = &self.data[TITLE_START..TITLE_END];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        self.data[CART_TYPE]
    }

    fn mbc_type(&self) -> Result<MbcType, CartridgeError> {
        match self.cart_type() {
            0x00 | 0x08 | 0x09 => Ok(MbcType::NoMbc),
            0x01..=0x03 => Ok(MbcType::Mbc1),
            0x0F..=0x13 => Ok(MbcType::Mbc3),
            0x19..=0x1E => Ok(MbcType::Mbc5),
            other => Err(CartridgeError::UnsupportedType(other)),
        }
    }

    fn rom_size(&self) -> Result<usize, CartridgeError> {
        match self.data[ROM_SIZE] {
            code @ 0x00..=0x08 => Ok((32 * 1024) << code),
            other => Err(CartridgeError::InvalidRomSize(other)),
        }
    }

    fn ram_size(&self) -> usize {
        match self.data[RAM_SIZE] {
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            _ => 0,
        }
    }
}
