//! VIC-20 configuration: region, memory expansion and ROM images.

use std::fmt;

/// Video region, which selects the VIC revision and all derived timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    /// PAL (6561 VIC).
    #[default]
    Pal,
    /// NTSC (6560 VIC).
    Ntsc,
}

/// RAM expansion fitted to the machine.
///
/// The base machine has 1K at $0000-$03FF and 4K at $1000-$1FFF plus the
/// colour nybble RAM; expansions populate the 3K area ($0400-$0FFF),
/// BLK1-3 ($2000-$7FFF) and BLK5 ($A000-$BFFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryModel {
    #[default]
    Unexpanded,
    /// +3K at $0400-$0FFF.
    Plus3K,
    /// +8K at BLK1.
    Plus8K,
    /// +16K at BLK1-2.
    Plus16K,
    /// +24K at BLK1-3.
    Plus24K,
    /// +24K at BLK1-3 plus BLK5.
    Plus32K,
    /// Everything: 3K area, BLK1-3 and BLK5.
    Plus35K,
    /// All 64K writable. For CPU test binaries, not a real machine.
    Test,
}

impl MemoryModel {
    /// Parse a ROM-index memory tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "default" | "unexpanded" => Some(Self::Unexpanded),
            "3k" => Some(Self::Plus3K),
            "8k" => Some(Self::Plus8K),
            "16k" => Some(Self::Plus16K),
            "24k" => Some(Self::Plus24K),
            "32k" => Some(Self::Plus32K),
            "35k" => Some(Self::Plus35K),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for MemoryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unexpanded => "unexpanded",
            Self::Plus3K => "+3K",
            Self::Plus8K => "+8K",
            Self::Plus16K => "+16K",
            Self::Plus24K => "+24K",
            Self::Plus32K => "+32K",
            Self::Plus35K => "+35K",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// Configuration for constructing a machine instance.
pub struct Vic20Config {
    pub region: Region,
    pub memory: MemoryModel,
    /// Character ROM image (4,096 bytes), installed at $8000.
    pub character_rom: Vec<u8>,
    /// BASIC ROM image (8,192 bytes), installed at $C000.
    pub basic_rom: Vec<u8>,
    /// Kernal ROM image (8,192 bytes) for the configured region,
    /// installed at $E000.
    pub kernal_rom: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tags_parse() {
        assert_eq!(MemoryModel::from_tag("default"), Some(MemoryModel::Unexpanded));
        assert_eq!(MemoryModel::from_tag("8K"), Some(MemoryModel::Plus8K));
        assert_eq!(MemoryModel::from_tag("35k"), Some(MemoryModel::Plus35K));
        assert_eq!(MemoryModel::from_tag("bogus"), None);
    }
}
