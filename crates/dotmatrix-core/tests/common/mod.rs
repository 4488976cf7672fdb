#![allow(dead_code)]

use dotmatrix_core::{cartridge::Cartridge, cpu::Cpu, gameboy::GameBoy, mmu::Mmu};

/// Programs are placed after the cartridge header.
pub const PROGRAM_START: u16 = 0x0150;

/// A 32 KiB ROM-only image with `program` at [`PROGRAM_START`].
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    let start = PROGRAM_START as usize;
    rom[start..start + program.len()].copy_from_slice(program);
    rom
}

/// An MBC1 image of `banks` banks; each switchable bank holds its own index
/// in its first byte.
pub fn mbc1_rom(banks: usize) -> Vec<u8> {
    let mut rom = vec![0u8; banks * 0x4000];
    rom[0x0147] = 0x01;
    rom[0x0148] = (banks / 2).trailing_zeros() as u8;
    for bank in 1..banks {
        rom[bank * 0x4000] = bank as u8;
    }
    rom
}

/// CPU and bus in the post-boot state, with `program` loaded and PC at its
/// first byte.
pub fn cpu_with_program(program: &[u8]) -> (Cpu, Mmu) {
    let mut mmu = Mmu::new();
    mmu.apply_boot_state();
    mmu.if_reg = 0;
    mmu.load_cart(Cartridge::from_bytes(rom_with_program(program)).unwrap());
    let mut cpu = Cpu::new();
    cpu.pc = PROGRAM_START;
    (cpu, mmu)
}

/// Whole machine with `program` loaded and PC at its first byte.
pub fn machine_with_program(program: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.mmu.if_reg = 0;
    gb.load_cart(Cartridge::from_bytes(rom_with_program(program)).unwrap());
    gb.cpu.pc = PROGRAM_START;
    gb
}
