//! ROM package loading.
//!
//! A ROM package is a directory (the unpacked archive) whose root holds
//! `index.json` plus one binary file per ROM part. Each binary starts
//! with a two-byte little-endian load address followed by the payload.
//!
//! The index is an array of entries:
//!
//! ```json
//! [{
//!   "name": "Kernal PAL",
//!   "fileNames": ["kernal.pal.bin"],
//!   "fileType": "kernal",
//!   "region": "pal"
//! }]
//! ```
//!
//! A valid package supplies at least a PAL kernal, an NTSC kernal, a
//! default BASIC and a default character ROM. Cartridge entries may have
//! several ordered parts and may request a memory expansion via the
//! `memory` tag.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::cartridge::{Cartridge, CartridgeImage};
use crate::config::{MemoryModel, Region};

/// ROM package and cartridge configuration failures. The machine stays
/// uninitialized when any of these is reported.
#[derive(Error, Debug)]
pub enum RomError {
    #[error("failed to read ROM package: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed index.json: {0}")]
    Index(#[from] serde_json::Error),

    #[error("ROM image {name:?} is too short for a load address")]
    ImageTooShort { name: String },

    #[error("missing required ROM: {role}")]
    MissingRom { role: &'static str },

    #[error("unknown memory tag {tag:?} on entry {name:?}")]
    UnknownMemoryTag { name: String, tag: String },
}

/// Role of a ROM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RomFileType {
    Kernal,
    Basic,
    Character,
    Cartridge,
}

/// Region variant of a ROM file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RomRegion {
    #[default]
    Default,
    Ntsc,
    Pal,
    Japan,
    Denmark,
    Sweden,
}

/// One entry of `index.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomIndexEntry {
    pub name: String,
    /// Binary files making up this ROM, in load order.
    pub file_names: Vec<String>,
    pub file_type: RomFileType,
    /// Memory expansion tag for cartridges ("8k", "unexpanded", ...).
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub region: RomRegion,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// A parsed ROM binary: its embedded load address and payload.
#[derive(Debug, Clone)]
pub struct RomImage {
    pub load_addr: u16,
    pub data: Vec<u8>,
}

impl RomImage {
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
}

/// A cartridge from the package index: parsed parts plus the memory
/// expansion it wants.
#[derive(Debug, Clone)]
pub struct CartridgeEntry {
    pub name: String,
    pub memory: MemoryModel,
    pub cartridge: Cartridge,
}

/// The system ROMs a machine needs, plus any packaged cartridges.
#[derive(Debug)]
pub struct RomSet {
    pub character: RomImage,
    pub basic: RomImage,
    pub kernal_pal: RomImage,
    pub kernal_ntsc: RomImage,
    pub cartridges: Vec<CartridgeEntry>,
}

impl RomSet {
    /// Load a ROM package from an unpacked directory.
    ///
    /// # Errors
    ///
    /// I/O and JSON failures, malformed images, unknown memory tags, and
    /// a missing member of the required minimum set are all fatal.
    pub fn load_dir(dir: &Path) -> Result<Self, RomError> {
        let index: Vec<RomIndexEntry> = serde_json::from_slice(&fs::read(dir.join("index.json"))?)?;

        let mut character = None;
        let mut basic = None;
        let mut kernal_pal = None;
        let mut kernal_ntsc = None;
        let mut cartridges = Vec::new();

        for entry in &index {
            let mut parts = Vec::with_capacity(entry.file_names.len());
            for file_name in &entry.file_names {
                let bytes = fs::read(dir.join(file_name))?;
                parts.push(RomImage::parse(file_name, &bytes)?);
            }
            log::debug!(
                "ROM entry {:?}: {} part(s), type {:?}, region {:?}",
                entry.name,
                parts.len(),
                entry.file_type,
                entry.region,
            );

            match (entry.file_type, entry.region) {
                (RomFileType::Kernal, RomRegion::Pal) => kernal_pal = parts.into_iter().next(),
                (RomFileType::Kernal, RomRegion::Ntsc) => kernal_ntsc = parts.into_iter().next(),
                (RomFileType::Basic, RomRegion::Default) => basic = parts.into_iter().next(),
                (RomFileType::Character, RomRegion::Default) => {
                    character = parts.into_iter().next();
                }
                (RomFileType::Cartridge, _) => {
                    let memory = match &entry.memory {
                        None => MemoryModel::Unexpanded,
                        Some(tag) => MemoryModel::from_tag(tag).ok_or_else(|| {
                            RomError::UnknownMemoryTag {
                                name: entry.name.clone(),
                                tag: tag.clone(),
                            }
                        })?,
                    };
                    cartridges.push(CartridgeEntry {
                        name: entry.name.clone(),
                        memory,
                        cartridge: Cartridge {
                            name: entry.name.clone(),
                            parts: parts
                                .into_iter()
                                .map(|image| CartridgeImage {
                                    load_addr: image.load_addr,
                                    data: image.data,
                                })
                                .collect(),
                        },
                    });
                }
                // Regional kernal variants beyond PAL/NTSC and localized
                // BASIC/character ROMs are carried but not required.
                _ => {}
            }
        }

        Ok(Self {
            character: character.ok_or(RomError::MissingRom {
                role: "default character",
            })?,
            basic: basic.ok_or(RomError::MissingRom {
                role: "default basic",
            })?,
            kernal_pal: kernal_pal.ok_or(RomError::MissingRom { role: "PAL kernal" })?,
            kernal_ntsc: kernal_ntsc.ok_or(RomError::MissingRom {
                role: "NTSC kernal",
            })?,
            cartridges,
        })
    }

    /// The kernal image for a region.
    #[must_use]
    pub fn kernal_for(&self, region: Region) -> &RomImage {
        match region {
            Region::Pal => &self.kernal_pal,
            Region::Ntsc => &self.kernal_ntsc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Build a throwaway package directory under the system temp dir.
    fn package_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("vic20-romset-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create package dir");
        dir
    }

    fn write_rom(dir: &Path, name: &str, load_addr: u16, payload: &[u8]) {
        let mut bytes = load_addr.to_le_bytes().to_vec();
        bytes.extend_from_slice(payload);
        fs::write(dir.join(name), bytes).expect("write rom");
    }

    const INDEX: &str = r#"[
        {"name": "Kernal PAL", "fileNames": ["kernal.pal.bin"],
         "fileType": "kernal", "region": "pal"},
        {"name": "Kernal NTSC", "fileNames": ["kernal.ntsc.bin"],
         "fileType": "kernal", "region": "ntsc"},
        {"name": "BASIC", "fileNames": ["basic.bin"], "fileType": "basic"},
        {"name": "Characters", "fileNames": ["char.bin"],
         "fileType": "character"},
        {"name": "Blitz", "fileNames": ["blitz.a0.bin", "blitz.b0.bin"],
         "fileType": "cartridge", "memory": "8k", "publisher": "Mastertronic",
         "year": 1983}
    ]"#;

    fn populate(dir: &Path) {
        fs::write(dir.join("index.json"), INDEX).expect("write index");
        write_rom(dir, "kernal.pal.bin", 0xE000, &[0x01; 16]);
        write_rom(dir, "kernal.ntsc.bin", 0xE000, &[0x02; 16]);
        write_rom(dir, "basic.bin", 0xC000, &[0x03; 16]);
        write_rom(dir, "char.bin", 0x8000, &[0x04; 16]);
        write_rom(dir, "blitz.a0.bin", 0xA000, &[0x05; 16]);
        write_rom(dir, "blitz.b0.bin", 0xB000, &[0x06; 16]);
    }

    #[test]
    fn loads_a_complete_package() {
        let dir = package_dir("complete");
        populate(&dir);

        let set = RomSet::load_dir(&dir).expect("package should load");
        assert_eq!(set.kernal_pal.load_addr, 0xE000);
        assert_eq!(set.kernal_pal.data, vec![0x01; 16]);
        assert_eq!(set.kernal_for(Region::Ntsc).data, vec![0x02; 16]);
        assert_eq!(set.basic.load_addr, 0xC000);
        assert_eq!(set.character.load_addr, 0x8000);

        assert_eq!(set.cartridges.len(), 1);
        let cart = &set.cartridges[0];
        assert_eq!(cart.memory, MemoryModel::Plus8K);
        assert_eq!(cart.cartridge.parts.len(), 2);
        assert_eq!(cart.cartridge.parts[0].load_addr, 0xA000);
        assert!(cart.cartridge.is_autoboot());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_required_rom_is_fatal() {
        let dir = package_dir("missing");
        populate(&dir);
        fs::remove_file(dir.join("basic.bin")).expect("remove basic");

        match RomSet::load_dir(&dir) {
            Err(RomError::Io(_)) => {}
            other => panic!("expected an I/O error, got {other:?}"),
        }

        // Remove the index entry too: now the set is simply incomplete.
        let trimmed = INDEX.replace(
            r#"{"name": "BASIC", "fileNames": ["basic.bin"], "fileType": "basic"},"#,
            "",
        );
        fs::write(dir.join("index.json"), trimmed).expect("rewrite index");
        match RomSet::load_dir(&dir) {
            Err(RomError::MissingRom { role }) => assert_eq!(role, "default basic"),
            other => panic!("expected MissingRom, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn short_image_is_rejected() {
        assert!(matches!(
            RomImage::parse("tiny", &[0x00, 0xA0]),
            Err(RomError::ImageTooShort { .. })
        ));
        let image = RomImage::parse("ok", &[0x00, 0xA0, 0x60]).expect("parses");
        assert_eq!(image.load_addr, 0xA000);
        assert_eq!(image.data, vec![0x60]);
    }

    #[test]
    fn unknown_memory_tag_is_fatal() {
        let dir = package_dir("badtag");
        populate(&dir);
        let index = INDEX.replace(r#""memory": "8k""#, r#""memory": "1m""#);
        fs::write(dir.join("index.json"), index).expect("rewrite index");

        match RomSet::load_dir(&dir) {
            Err(RomError::UnknownMemoryTag { tag, .. }) => assert_eq!(tag, "1m"),
            other => panic!("expected UnknownMemoryTag, got {other:?}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }
}
