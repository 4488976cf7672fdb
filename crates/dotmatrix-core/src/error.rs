use thiserror::Error;

/// Fatal conditions raised while executing a cartridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unimplemented opcode {opcode:02X} at PC={pc:04X}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },

    #[error("access to unmapped address {addr:#06X}")]
    UnmappedAddress { addr: u16 },

    #[error("access to unmodelled I/O register {addr:#06X}")]
    UnmodeledIo { addr: u16 },

    #[error("unsupported bank controller operation: {what} (write {val:#04X} to {addr:#06X})")]
    UnsupportedBankMode {
        what: &'static str,
        addr: u16,
        val: u8,
    },

    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
}

/// Problems found while validating a cartridge image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartridgeError {
    #[error("cartridge image is {len} bytes, shorter than its header")]
    TooShort { len: usize },

    #[error("header declares {declared} bytes of ROM but the image holds {actual}")]
    TruncatedBanks { declared: usize, actual: usize },

    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedType(u8),

    #[error("invalid ROM size code {0:#04X}")]
    InvalidRomSize(u8),
}
