//! Integration point for AI detection on the slide image.
//!
//! Inference is out of scope: hosts implement [`ImageDetector`] against their
//! prediction service and the surface only swaps the displayed image.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detection errors.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Detection service unavailable")]
    Unavailable,
    #[error("Detection failed: {0}")]
    Failed(String),
    #[error("Detection is not allowed on a view-only canvas")]
    Disabled,
}

/// Result type for detection runs.
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Models the prediction service offers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionModel {
    #[default]
    #[serde(rename = "parasite_detection_yolov8")]
    Parasite,
    #[serde(rename = "anemia_detection_yolov8")]
    Anemia,
    #[serde(rename = "malaria_detection_yolov8")]
    Malaria,
}

impl DetectionModel {
    pub const ALL: [DetectionModel; 3] = [
        DetectionModel::Parasite,
        DetectionModel::Anemia,
        DetectionModel::Malaria,
    ];

    /// Name the prediction service expects.
    pub fn wire_name(self) -> &'static str {
        match self {
            DetectionModel::Parasite => "parasite_detection_yolov8",
            DetectionModel::Anemia => "anemia_detection_yolov8",
            DetectionModel::Malaria => "malaria_detection_yolov8",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.wire_name() == name)
    }
}

/// Runs a detection model over an image.
pub trait ImageDetector {
    /// Returns the URL of the processed image.
    fn detect(&self, image_url: &str, model: DetectionModel) -> DetectionResult<String>;
}
