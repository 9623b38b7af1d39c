//! Capability negotiation properties
//!
//! Exercises the public negotiation API across the full tier tables.

use tokio_test::{assert_err, assert_ok};
use visionprobe_core::*;

#[test]
fn test_1080p_capability_never_picks_4k_or_720p() {
    for fps in [15.0, 24.0, 30.0, 45.0, 60.0] {
        let chosen = choose_configuration(&DeviceCapability::new(1920, 1080, fps));
        let resolution = chosen.resolution.expect("1080p device should get a resolution");
        assert_eq!(resolution.width_px, 1920);
        assert_eq!(resolution.height_px, 1080);
    }
}

#[test]
fn test_45_fps_never_matches() {
    for (w, h) in [(640, 480), (1280, 720), (1920, 1080), (3840, 2160)] {
        let chosen = choose_configuration(&DeviceCapability::new(w, h, 45.0));
        assert!(chosen.frame_rate.is_none());
        assert!(chosen.bit_rate.is_none());
    }
}

#[test]
fn test_every_tier_fps_matches_itself() {
    for tier in FRAME_RATE_TIERS {
        let capability = DeviceCapability {
            max_frame_rate: Some(f64::from(tier.fps)),
            ..DeviceCapability::default()
        };
        assert_eq!(choose_frame_rate(&capability), Some(tier));
    }
}

#[test]
fn test_4k_device_gets_top_tiers() {
    let chosen = choose_configuration(&DeviceCapability::new(4096, 2160, 60.0));
    assert_eq!(chosen.resolution, Some(RESOLUTION_TIERS[0]));
    assert_eq!(chosen.frame_rate, Some(FRAME_RATE_TIERS[0]));
    // 3840*2160*60*0.8 = 398_131_200
    assert_eq!(chosen.bit_rate.unwrap().label, "1 MB bps");
    assert!(chosen.is_complete());
}

#[test]
fn test_chosen_bit_rate_never_exceeds_estimate() {
    for resolution in RESOLUTION_TIERS {
        for frame_rate in FRAME_RATE_TIERS {
            let estimate = estimated_bits_per_second(&resolution, &frame_rate);
            let bit_rate = choose_bit_rate(Some(resolution), Some(frame_rate));
            let bit_rate = bit_rate.expect("every tier pair is above 800 bps");
            assert!(bit_rate.bits_per_second as f64 <= estimate);
        }
    }
}

#[test]
fn test_missing_dimension_leaves_resolution_unset() {
    let capability = DeviceCapability {
        max_frame_rate: Some(30.0),
        max_width: Some(1920),
        max_height: None,
    };
    let chosen = choose_configuration(&capability);
    assert!(chosen.resolution.is_none());
    assert_eq!(chosen.frame_rate.unwrap().fps, 30);
}

#[test]
fn test_capability_round_trips_through_json() {
    let json = r#"{"max_frame_rate":30.0,"max_width":1280,"max_height":720}"#;
    let capability: DeviceCapability = assert_ok!(serde_json::from_str(json));
    assert_eq!(capability, DeviceCapability::new(1280, 720, 30.0));

    let broken: Result<DeviceCapability, _> = serde_json::from_str("{\"max_width\":\"wide\"}");
    assert_err!(broken);
}
