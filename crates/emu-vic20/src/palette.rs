//! VIC-20 colour palette.
//!
//! 16 colours as ARGB32. Only the first 8 can be used for character and
//! border colours; the upper 8 are reachable as screen and auxiliary
//! colours.

/// VIC-20 palette: 16 colours indexed 0-15 in ARGB32 format.
pub const PALETTE: [u32; 16] = [
    0xFF00_0000, // 0: Black
    0xFFFF_FFFF, // 1: White
    0xFF8D_3E37, // 2: Red
    0xFF72_C1C8, // 3: Cyan
    0xFF80_348B, // 4: Purple
    0xFF55_A049, // 5: Green
    0xFF40_318D, // 6: Blue
    0xFFAA_B95D, // 7: Yellow
    0xFFAB_7536, // 8: Orange
    0xFFEB_B983, // 9: Light Orange
    0xFFD8_9A86, // 10: Light Red
    0xFFB5_E9E1, // 11: Light Cyan
    0xFFC5_84C7, // 12: Light Purple
    0xFF94_E089, // 13: Light Green
    0xFF8F_8FDE, // 14: Light Blue
    0xFFE6_E6A9, // 15: Light Yellow
];
