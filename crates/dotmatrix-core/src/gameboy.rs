use log::info;

use crate::{
    cartridge::Cartridge,
    cpu::Cpu,
    error::CoreError,
    hardware::{CYCLES_PER_FRAME, CYCLES_PER_M_CYCLE, IoPolicy},
    mmu::Mmu,
};

/// Address the boot ROM hands control to.
const CARTRIDGE_ENTRY: u16 = 0x0100;

/// How a machine is assembled.
#[derive(Clone, Debug, Default)]
pub struct MachineConfig {
    pub io_policy: IoPolicy,
    /// Boot image to run from 0x0000. Without one the machine starts in the
    /// post-boot state at 0x0100.
    pub boot_rom: Option<Vec<u8>>,
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    /// Clock cycles run past the end of the previous frame
    frame_carry: u32,
}

impl GameBoy {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        let mut mmu = Mmu::new_with_policy(config.io_policy);
        let cpu = match config.boot_rom {
            Some(boot) => {
                mmu.load_boot_rom(boot);
                Cpu::new_power_on()
            }
            None => {
                mmu.apply_boot_state();
                Cpu::new()
            }
        };
        Self {
            cpu,
            mmu,
            frame_carry: 0,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Reset to the initial state while preserving the loaded cartridge and
    /// boot ROM.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        let boot_rom = self.mmu.boot_rom.take();
        *self = Self::with_config(MachineConfig {
            io_policy: self.mmu.io_policy(),
            boot_rom,
        });
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
        info!("Machine reset");
    }

    /// Execute one instruction, service interrupts and advance the PPU by
    /// the clock cycles that took. Returns those clock cycles.
    pub fn step(&mut self) -> Result<u32, CoreError> {
        let m_cycles = self.cpu.execute(&mut self.mmu)?;
        let dispatch = self.cpu.check_interrupts(&mut self.mmu)?;
        let cycles = (m_cycles as u32 + dispatch as u32) * CYCLES_PER_M_CYCLE;
        self.mmu.ppu.step(cycles, &mut self.mmu.if_reg);

        if self.mmu.boot_mapped && self.cpu.pc == CARTRIDGE_ENTRY {
            self.mmu.unmap_boot_rom();
        }
        Ok(cycles)
    }

    /// Run one frame's worth of clock cycles. Overshoot is carried into the
    /// next frame.
    pub fn run_frame(&mut self) -> Result<(), CoreError> {
        let mut elapsed = self.frame_carry;
        while elapsed < CYCLES_PER_FRAME {
            elapsed += self.step()?;
        }
        self.frame_carry = elapsed - CYCLES_PER_FRAME;
        Ok(())
    }

    pub fn frame_carry(&self) -> u32 {
        self.frame_carry
    }

    /// RGBA8 pixels of the most recently completed frame.
    pub fn framebuffer(&self) -> &[u8] {
        self.mmu.ppu.completed_frame()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
