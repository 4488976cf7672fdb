/// Screen width in pixels.
pub const SCREEN_WIDTH: usize = 160;
/// Screen height in pixels.
pub const SCREEN_HEIGHT: usize = 144;
/// Bytes per frame buffer pixel (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;
/// Size of one RGBA8 frame in bytes.
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * BYTES_PER_PIXEL;

/// Clock cycles per machine cycle.
pub const CYCLES_PER_M_CYCLE: u32 = 4;
/// Clock cycles in one full frame (154 lines of 456 cycles).
pub const CYCLES_PER_FRAME: u32 = 70_224;
/// Nominal refresh rate of the LCD.
pub const FRAME_RATE: f64 = 59.7275;

// Interrupt flag bits shared by IE (0xFFFF) and IF (0xFF0F)
pub const INT_VBLANK: u8 = 0x01;
pub const INT_STAT: u8 = 0x02;
pub const INT_TIMER: u8 = 0x04;
pub const INT_SERIAL: u8 = 0x08;
pub const INT_JOYPAD: u8 = 0x10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// How the memory bus treats peripherals that are not emulated.
///
/// Serial and sound registers, plus I/O addresses that decode to nothing,
/// fall under this policy.
pub enum IoPolicy {
    /// Accesses fail with a [`CoreError`](crate::error::CoreError).
    #[default]
    Strict,
    /// Reads return 0xFF and writes are dropped.
    BestEffort,
}
