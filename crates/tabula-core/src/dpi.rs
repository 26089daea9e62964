#![forbid(unsafe_code)]

//! DPI scaling between logical and device pixels.
//!
//! Sizes are configured in logical pixels (96 DPI) and reported in device
//! pixels. Both directions round half away from zero, so an unscaled
//! converter is an exact identity.

use serde::{Deserialize, Serialize};

/// Reference density that logical pixels are expressed in.
pub const BASE_DPI: u32 = 96;

/// Converts logical pixels to device pixels and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpiConverter {
    dpi: u32,
}

impl Default for DpiConverter {
    fn default() -> Self {
        Self { dpi: BASE_DPI }
    }
}

impl DpiConverter {
    /// Converter for the given density. Zero is treated as [`BASE_DPI`].
    #[must_use]
    pub const fn new(dpi: u32) -> Self {
        Self {
            dpi: if dpi == 0 { BASE_DPI } else { dpi },
        }
    }

    /// The configured density.
    #[inline]
    #[must_use]
    pub const fn dpi(&self) -> u32 {
        self.dpi
    }

    /// True when no scaling happens.
    #[inline]
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.dpi == BASE_DPI
    }

    /// Logical to device pixels.
    #[must_use]
    pub fn upscale(&self, logical: u32) -> u32 {
        if self.is_identity() {
            return logical;
        }
        let scaled = (u64::from(logical) * u64::from(self.dpi) * 2 + u64::from(BASE_DPI))
            / (u64::from(BASE_DPI) * 2);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// Device to logical pixels.
    #[must_use]
    pub fn downscale(&self, device: u32) -> u32 {
        if self.is_identity() {
            return device;
        }
        let scaled = (u64::from(device) * u64::from(BASE_DPI) * 2 + u64::from(self.dpi))
            / (u64::from(self.dpi) * 2);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }
}
