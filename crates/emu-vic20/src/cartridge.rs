//! Cartridge images.
//!
//! A cartridge image is raw bytes `[load_lo, load_hi, payload...]`.
//! Multi-part cartridges occupy consecutive regions, one image per part.
//! A part loading at $A000 (BLK5) autoboots through the kernal's
//! cold-start signature check; anything else needs the SYS320 bootstrap
//! the machine writes when it attaches the cartridge.

use crate::rom::RomError;

/// Load address that the kernal autoboots from.
pub const AUTOBOOT_ADDR: u16 = 0xA000;

/// One cartridge part: its embedded load address and payload.
#[derive(Debug, Clone)]
pub struct CartridgeImage {
    pub load_addr: u16,
    pub data: Vec<u8>,
}

impl CartridgeImage {
    /// Parse `[load_lo, load_hi, payload...]`.
    ///
    /// # Errors
    ///
    /// The image must be at least three bytes.
    pub fn parse(name: &str, bytes: &[u8]) -> Result<Self, RomError> {
        if bytes.len() < 3 {
            return Err(RomError::ImageTooShort {
                name: name.to_string(),
            });
        }
        Ok(Self {
            load_addr: u16::from_le_bytes([bytes[0], bytes[1]]),
            data: bytes[2..].to_vec(),
        })
    }

    /// One past the last address the payload occupies.
    #[must_use]
    pub fn end_addr(&self) -> u16 {
        self.load_addr.wrapping_add(self.data.len() as u16)
    }
}

/// A cartridge: one or more parts installed together.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub name: String,
    pub parts: Vec<CartridgeImage>,
}

impl Cartridge {
    /// Build a single-part cartridge from a raw image.
    ///
    /// # Errors
    ///
    /// Propagates image parse failures.
    pub fn from_image(name: &str, bytes: &[u8]) -> Result<Self, RomError> {
        Ok(Self {
            name: name.to_string(),
            parts: vec![CartridgeImage::parse(name, bytes)?],
        })
    }

    /// True when any part loads at the kernal autoboot block.
    #[must_use]
    pub fn is_autoboot(&self) -> bool {
        self.parts.iter().any(|p| p.load_addr == AUTOBOOT_ADDR)
    }
}
