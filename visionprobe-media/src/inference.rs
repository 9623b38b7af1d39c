//! Inference model collaborator
//!
//! Models are consumed only through [`Predictor`]. A prediction returns the
//! model's detections in its own order, which is usually descending score.

use crate::tracks::VideoFrame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use visionprobe_core::{ProbeError, ProbeResult};

/// Axis-aligned box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Box width
    pub width: f32,
    /// Box height
    pub height: f32,
}

/// One result element of a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label
    pub label: String,
    /// Confidence in `[0, 1]`
    pub score: f32,
    /// Location, for detectors; classifiers leave this unset
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    /// Classifier-style result without a box
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            bbox: None,
        }
    }

    /// Attach a bounding box
    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// First detection, in the model's order, scoring at least `threshold`
pub fn first_confident(detections: Vec<Detection>, threshold: f32) -> Option<Detection> {
    detections.into_iter().find(|d| d.score >= threshold)
}

/// An inference model
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Model name, reported as the `embeddedModel` tag
    fn name(&self) -> &str;

    /// Load weights; called once before the first prediction
    async fn load(&self) -> ProbeResult<()> {
        Ok(())
    }

    /// Run the model on one frame
    ///
    /// Fails with `ModelNotLoaded` or `Inference`.
    async fn predict(&self, frame: &VideoFrame) -> ProbeResult<Vec<Detection>>;
}

/// Predictor returning the same detections for every frame
pub struct StaticPredictor {
    name: String,
    detections: Vec<Detection>,
    loaded: AtomicBool,
}

impl StaticPredictor {
    /// Create a predictor that must be loaded before use
    pub fn new(name: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            name: name.into(),
            detections,
            loaded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Predictor for StaticPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> ProbeResult<()> {
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn predict(&self, _frame: &VideoFrame) -> ProbeResult<Vec<Detection>> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(ProbeError::ModelNotLoaded {
                model: self.name.clone(),
            });
        }
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_first_confident_respects_model_order() {
        let detections = vec![
            Detection::new("cup", 0.4),
            Detection::new("person", 0.7),
            Detection::new("dog", 0.9),
        ];
        let top = first_confident(detections, 0.6).unwrap();
        assert_eq!(top.label, "person");
    }

    #[test]
    fn test_first_confident_threshold_is_inclusive() {
        let top = first_confident(vec![Detection::new("cat", 0.6)], 0.6);
        assert!(top.is_some());
        assert!(first_confident(vec![Detection::new("cat", 0.59)], 0.6).is_none());
        assert!(first_confident(Vec::new(), 0.0).is_none());
    }

    #[tokio::test]
    async fn test_static_predictor_requires_load() {
        let predictor = StaticPredictor::new("static", vec![Detection::new("cat", 0.8)]);
        let frame = VideoFrame::new(2, 2, Bytes::from_static(&[0; 4]), 0, 0);

        let err = predictor.predict(&frame).await.unwrap_err();
        assert_eq!(err.error_code(), "MODEL_NOT_LOADED");

        predictor.load().await.unwrap();
        assert_eq!(predictor.predict(&frame).await.unwrap().len(), 1);
    }
}
