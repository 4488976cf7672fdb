use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use dotmatrix_core::{cartridge::Cartridge, scheduler::Frame};
use log::info;

use crate::error::HostError;

const BOOT_ROM_SIZE: usize = 0x100;

fn read(path: &Path) -> Result<Vec<u8>, HostError> {
    std::fs::read(path).map_err(|source| HostError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_cartridge(path: &Path) -> Result<Cartridge, HostError> {
    let cart = Cartridge::from_bytes(read(path)?)?;
    info!("Loaded {} ({} bytes)", path.display(), cart.rom.len());
    Ok(cart)
}

pub fn load_boot_rom(path: &Path) -> Result<Vec<u8>, HostError> {
    let data = read(path)?;
    if data.len() != BOOT_ROM_SIZE {
        return Err(HostError::BootRomSize {
            path: path.to_path_buf(),
            len: data.len(),
        });
    }
    Ok(data)
}

/// Write a frame as an 8-bit RGBA PNG.
pub fn write_png(path: &Path, frame: &Frame) -> Result<(), HostError> {
    let file = File::create(path).map_err(|source| HostError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        frame.width() as u32,
        frame.height() as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.pixels())?;
    writer.finish()?;
    info!("Wrote frame {} to {}", frame.number, path.display());
    Ok(())
}
