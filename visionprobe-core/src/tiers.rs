//! Fixed capture configuration tiers
//!
//! Each table is ordered strictly descending by its capacity field. The
//! negotiator relies on that order: the first qualifying entry is the
//! highest one the device can sustain.

use serde::Serialize;
use std::fmt;

/// One entry of the resolution table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResolutionTier {
    /// Human readable label
    pub label: &'static str,
    /// Width in pixels
    pub width_px: u32,
    /// Height in pixels
    pub height_px: u32,
}

impl ResolutionTier {
    /// Total number of pixels per frame
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width_px) * u64::from(self.height_px)
    }

    /// Value string in `WIDTHxHEIGHT` form
    pub fn value(&self) -> String {
        format!("{}x{}", self.width_px, self.height_px)
    }

    /// Look a tier up by its `WIDTHxHEIGHT` value
    pub fn from_value(value: &str) -> Option<Self> {
        RESOLUTION_TIERS.iter().copied().find(|t| t.value() == value)
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// One entry of the frame-rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameRateTier {
    /// Human readable label
    pub label: &'static str,
    /// Frames per second
    pub fps: u32,
}

impl FrameRateTier {
    /// Value string (the fps as decimal text)
    pub fn value(&self) -> String {
        self.fps.to_string()
    }

    /// Look a tier up by its exact fps
    pub fn from_fps(fps: u32) -> Option<Self> {
        FRAME_RATE_TIERS.iter().copied().find(|t| t.fps == fps)
    }
}

impl fmt::Display for FrameRateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// One entry of the bit-rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BitRateTier {
    /// Human readable label
    pub label: &'static str,
    /// Target bits per second for the recorder
    pub bits_per_second: u64,
}

impl BitRateTier {
    /// Value string (bits per second as decimal text)
    pub fn value(&self) -> String {
        self.bits_per_second.to_string()
    }
}

impl fmt::Display for BitRateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

/// Resolution tiers, descending by pixel dimensions
pub const RESOLUTION_TIERS: [ResolutionTier; 4] = [
    ResolutionTier {
        label: "4K Ultra HD (3840x2160)",
        width_px: 3840,
        height_px: 2160,
    },
    ResolutionTier {
        label: "1080p",
        width_px: 1920,
        height_px: 1080,
    },
    ResolutionTier {
        label: "720p",
        width_px: 1280,
        height_px: 720,
    },
    ResolutionTier {
        label: "480p",
        width_px: 640,
        height_px: 480,
    },
];

/// Frame-rate tiers, descending by fps
pub const FRAME_RATE_TIERS: [FrameRateTier; 4] = [
    FrameRateTier {
        label: "60 FPS",
        fps: 60,
    },
    FrameRateTier {
        label: "30 FPS",
        fps: 30,
    },
    FrameRateTier {
        label: "24 FPS",
        fps: 24,
    },
    FrameRateTier {
        label: "15 FPS",
        fps: 15,
    },
];

/// Bit-rate tiers, descending by bits per second
pub const BIT_RATE_TIERS: [BitRateTier; 6] = [
    BitRateTier {
        label: "1 GB bps",
        bits_per_second: 8_000_000_000,
    },
    BitRateTier {
        label: "100 MB bps",
        bits_per_second: 800_000_000,
    },
    BitRateTier {
        label: "1 MB bps",
        bits_per_second: 8_000_000,
    },
    BitRateTier {
        label: "100 KB bps",
        bits_per_second: 800_000,
    },
    BitRateTier {
        label: "1 KB bps",
        bits_per_second: 8_000,
    },
    BitRateTier {
        label: "100 Bytes bps",
        bits_per_second: 800,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_strictly_descending() {
        assert!(RESOLUTION_TIERS
            .windows(2)
            .all(|w| w[0].width_px > w[1].width_px && w[0].height_px > w[1].height_px));
        assert!(FRAME_RATE_TIERS.windows(2).all(|w| w[0].fps > w[1].fps));
        assert!(BIT_RATE_TIERS
            .windows(2)
            .all(|w| w[0].bits_per_second > w[1].bits_per_second));
    }

    #[test]
    fn test_tier_values() {
        assert_eq!(RESOLUTION_TIERS[1].value(), "1920x1080");
        assert_eq!(FRAME_RATE_TIERS[1].value(), "30");
        assert_eq!(BIT_RATE_TIERS[2].value(), "8000000");
    }

    #[test]
    fn test_lookup_by_value() {
        let hd = ResolutionTier::from_value("1280x720").unwrap();
        assert_eq!(hd.label, "720p");
        assert!(ResolutionTier::from_value("1024x768").is_none());

        assert_eq!(FrameRateTier::from_fps(24).unwrap().label, "24 FPS");
        assert!(FrameRateTier::from_fps(25).is_none());
    }
}
