//! Cycle-counted emulation core for the original monochrome handheld (DMG).
//!
//! This crate holds the platform-agnostic machine: CPU, memory bus, PPU,
//! timer and joypad, plus a frame scheduler. Hosts drive it through the
//! [`gameboy`] facade or hand it to a [`scheduler::Scheduler`] thread.

/// Cartridge header parsing and memory bank controllers.
pub mod cartridge;

/// LR35902 CPU core.
pub mod cpu;

/// Fatal error types surfaced by the core.
pub mod error;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Hardware constants and bus policies.
pub mod hardware;

/// Joypad input register.
pub mod input;

/// Memory map and I/O routing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Frame pacing and presentation hand-off.
pub mod scheduler;

/// Divider/timer unit.
pub mod timer;

pub use error::{CartridgeError, CoreError};
