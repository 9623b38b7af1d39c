//! Capability negotiation
//!
//! Maps a device-reported [`DeviceCapability`] onto the fixed tier tables.
//! Negotiation is pure and total: a capability that matches nothing simply
//! leaves the corresponding field of [`ChosenConfiguration`] unset, and the
//! capture collaborator falls back to its own defaults for that field.

use crate::tiers::{
    BitRateTier, FrameRateTier, ResolutionTier, BIT_RATE_TIERS, FRAME_RATE_TIERS,
    RESOLUTION_TIERS,
};
use serde::{Deserialize, Serialize};

/// Fixed compression ratio applied to the raw pixel rate when estimating
/// the recorder bit rate
pub const COMPRESSION_RATIO: f64 = 0.8;

/// Upper bounds reported by a capture device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapability {
    /// Maximum frame rate the device reports, if any
    pub max_frame_rate: Option<f64>,
    /// Maximum frame width in pixels, if reported
    pub max_width: Option<u32>,
    /// Maximum frame height in pixels, if reported
    pub max_height: Option<u32>,
}

impl DeviceCapability {
    /// Capability with all three bounds reported
    pub fn new(max_width: u32, max_height: u32, max_frame_rate: f64) -> Self {
        Self {
            max_frame_rate: Some(max_frame_rate),
            max_width: Some(max_width),
            max_height: Some(max_height),
        }
    }
}

/// Configuration derived from a device capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChosenConfiguration {
    /// Highest resolution tier the device satisfies
    pub resolution: Option<ResolutionTier>,
    /// Frame-rate tier exactly matching the device maximum
    pub frame_rate: Option<FrameRateTier>,
    /// Highest bit-rate tier not above the estimated stream bit rate
    pub bit_rate: Option<BitRateTier>,
}

impl ChosenConfiguration {
    /// Whether every field found a tier
    pub fn is_complete(&self) -> bool {
        self.resolution.is_some() && self.frame_rate.is_some() && self.bit_rate.is_some()
    }

    /// Replace the resolution and re-derive the bit rate
    pub fn with_resolution(mut self, resolution: ResolutionTier) -> Self {
        self.resolution = Some(resolution);
        self.bit_rate = choose_bit_rate(self.resolution, self.frame_rate);
        self
    }

    /// Replace the frame rate and re-derive the bit rate
    pub fn with_frame_rate(mut self, frame_rate: FrameRateTier) -> Self {
        self.frame_rate = Some(frame_rate);
        self.bit_rate = choose_bit_rate(self.resolution, self.frame_rate);
        self
    }
}

/// Choose a capture configuration for the given device capability
pub fn choose_configuration(capability: &DeviceCapability) -> ChosenConfiguration {
    let resolution = choose_resolution(capability);
    let frame_rate = choose_frame_rate(capability);
    let bit_rate = choose_bit_rate(resolution, frame_rate);

    tracing::debug!(
        resolution = ?resolution.map(|r| r.label),
        frame_rate = ?frame_rate.map(|f| f.label),
        bit_rate = ?bit_rate.map(|b| b.label),
        "negotiated capture configuration"
    );

    ChosenConfiguration {
        resolution,
        frame_rate,
        bit_rate,
    }
}

/// Exact-match frame-rate lookup; a device reporting 50 fps gets no tier
pub fn choose_frame_rate(capability: &DeviceCapability) -> Option<FrameRateTier> {
    let max = capability.max_frame_rate?;
    FRAME_RATE_TIERS
        .iter()
        .copied()
        .find(|tier| f64::from(tier.fps) == max)
}

/// First (highest) resolution tier fitting within both maxima
pub fn choose_resolution(capability: &DeviceCapability) -> Option<ResolutionTier> {
    let (max_width, max_height) = (capability.max_width?, capability.max_height?);
    RESOLUTION_TIERS
        .iter()
        .copied()
        .find(|tier| max_width >= tier.width_px && max_height >= tier.height_px)
}

/// Raw pixel rate scaled by [`COMPRESSION_RATIO`]
pub fn estimated_bits_per_second(resolution: &ResolutionTier, frame_rate: &FrameRateTier) -> f64 {
    resolution.pixel_count() as f64 * f64::from(frame_rate.fps) * COMPRESSION_RATIO
}

/// Highest bit-rate tier at or below the estimate; needs both inputs
pub fn choose_bit_rate(
    resolution: Option<ResolutionTier>,
    frame_rate: Option<FrameRateTier>,
) -> Option<BitRateTier> {
    let estimate = estimated_bits_per_second(&resolution?, &frame_rate?);
    BIT_RATE_TIERS
        .iter()
        .copied()
        .find(|tier| tier.bits_per_second as f64 <= estimate)
}

/// Which camera to prefer on devices with several
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Camera facing away from the user
    #[default]
    Environment,
    /// Camera facing the user
    User,
}

/// Constraints handed to the capture collaborator when opening a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConstraints {
    /// Device to open
    pub device_id: Option<String>,
    /// Requested frame width; collaborator default when unset
    pub width: Option<u32>,
    /// Requested frame height; collaborator default when unset
    pub height: Option<u32>,
    /// Requested frame rate; collaborator default when unset
    pub frame_rate: Option<u32>,
    /// Preferred camera
    pub facing: FacingMode,
}

impl StreamConstraints {
    /// Build constraints from a chosen configuration
    ///
    /// In portrait orientation the requested width and height are swapped so
    /// the sensor's long edge maps to the frame height.
    pub fn from_configuration(
        device_id: Option<String>,
        configuration: &ChosenConfiguration,
        portrait: bool,
        facing: FacingMode,
    ) -> Self {
        let (width, height) = match configuration.resolution {
            Some(tier) if portrait => (Some(tier.height_px), Some(tier.width_px)),
            Some(tier) => (Some(tier.width_px), Some(tier.height_px)),
            None => (None, None),
        };

        Self {
            device_id,
            width,
            height,
            frame_rate: configuration.frame_rate.map(|f| f.fps),
            facing,
        }
    }
}
