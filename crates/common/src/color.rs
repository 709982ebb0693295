//! Marker and tag display colors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ARGB color attached to marker types and tags.
///
/// Serialized metadata carries the packed 32-bit ARGB form, so the packing
/// here is part of the interchange contract, not display-only.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl MarkerColor {
    pub const GREEN: Self = Self::opaque(0x4c, 0xaf, 0x50);
    pub const BLUE: Self = Self::opaque(0x42, 0xa5, 0xf5);
    pub const ORANGE: Self = Self::opaque(0xff, 0x98, 0x00);
    pub const PURPLE: Self = Self::opaque(0xab, 0x47, 0xbc);
    pub const RED: Self = Self::opaque(0xef, 0x53, 0x50);
    pub const YELLOW: Self = Self::opaque(0xff, 0xee, 0x58);
    pub const GRAY: Self = Self::opaque(0x9e, 0x9e, 0x9e);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { a: 0xff, r, g, b }
    }

    pub fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.to_argb())
    }
}
