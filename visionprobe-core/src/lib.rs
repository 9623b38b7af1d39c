//! # VisionProbe Core
//!
//! Capture configuration tiers, device capability negotiation and the error
//! taxonomy shared by every VisionProbe crate. Everything here is pure and
//! synchronous; the media and diagnostics crates build on it.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod negotiation;
pub mod tiers;
pub mod time;

// Re-export main types
pub use error::{ErrorCategory, ProbeError, ProbeResult};
pub use negotiation::{
    choose_bit_rate, choose_configuration, choose_frame_rate, choose_resolution,
    estimated_bits_per_second, ChosenConfiguration, DeviceCapability, FacingMode,
    StreamConstraints, COMPRESSION_RATIO,
};
pub use tiers::{
    BitRateTier, FrameRateTier, ResolutionTier, BIT_RATE_TIERS, FRAME_RATE_TIERS,
    RESOLUTION_TIERS,
};
pub use time::{Clock, ManualClock, SystemClock};
