use std::path::PathBuf;

use dotmatrix_core::{CartridgeError, CoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("boot ROM {} is {len} bytes, expected 256", path.display())]
    BootRomSize { path: PathBuf, len: usize },

    #[error("invalid cartridge: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error("emulation stopped: {0}")]
    Core(#[from] CoreError),

    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("failed to start emulation thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("emulation thread panicked")]
    EmulationPanicked,

    #[error("no frame was presented, nothing to dump")]
    NoFrame,
}
