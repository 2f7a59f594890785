//! Packed RGB pixel layouts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Byte layout of a packed 3- or 4-byte RGB pixel.
///
/// The alpha byte of the 4-byte layouts is ignored on read and left
/// untouched on write.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum PixelFormat {
    #[default]
    Rgb,
    Bgr,
    Argb,
    Rgba,
    Abgr,
    Bgra,
}

impl PixelFormat {
    pub const fn as_slice() -> &'static [Self] {
        &[
            Self::Rgb,
            Self::Bgr,
            Self::Argb,
            Self::Rgba,
            Self::Abgr,
            Self::Bgra,
        ]
    }

    /// Bytes per pixel.
    #[must_use]
    pub const fn bpp(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Argb | Self::Rgba | Self::Abgr | Self::Bgra => 4,
        }
    }

    /// Byte offsets of the (R, G, B) channels within one pixel.
    #[must_use]
    pub const fn offsets(self) -> (usize, usize, usize) {
        match self {
            Self::Rgb | Self::Rgba => (0, 1, 2),
            Self::Bgr | Self::Bgra => (2, 1, 0),
            Self::Argb => (1, 2, 3),
            Self::Abgr => (3, 2, 1),
        }
    }

    /// Look up a format by its wire ordinal. Returns `None` for anything a
    /// front end might hand us that we do not understand.
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Rgb),
            1 => Some(Self::Bgr),
            2 => Some(Self::Argb),
            3 => Some(Self::Rgba),
            4 => Some(Self::Abgr),
            5 => Some(Self::Bgra),
            _ => None,
        }
    }
}

impl TryFrom<u32> for PixelFormat {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        Self::from_tag(tag).ok_or(Error::UnknownFormatTag { tag })
    }
}

impl AsRef<str> for PixelFormat {
    fn as_ref(&self) -> &str {
        match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Argb => "ARGB",
            Self::Rgba => "RGBA",
            Self::Abgr => "ABGR",
            Self::Bgra => "BGRA",
        }
    }
}
