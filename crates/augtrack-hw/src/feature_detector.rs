//! SIFT-style keypoint detector. Out of scope: the extraction algorithm
//! itself belongs to a vision library, not this tracker.

use augtrack_core::Keypoint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureDetectorError {
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Produces the keypoints the tracker core matches against its
/// reference sets. A real implementation wraps a SIFT (or equivalent)
/// extractor; that algorithm is out of scope for this crate.
pub trait FeatureDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Result<Vec<Keypoint>, FeatureDetectorError>;
}

/// Placeholder detector wired in until a real extractor is available.
pub struct SiftFeatureDetector {
    _initialized: bool,
}

impl SiftFeatureDetector {
    pub fn load(_model_path: &str) -> Result<Self, FeatureDetectorError> {
        // TODO: load SIFT extraction parameters / a trained descriptor model
        Ok(Self { _initialized: false })
    }
}

impl FeatureDetector for SiftFeatureDetector {
    fn detect(&self, _gray: &[u8], _width: u32, _height: u32) -> Result<Vec<Keypoint>, FeatureDetectorError> {
        // TODO: run SIFT keypoint extraction and descriptor computation
        Err(FeatureDetectorError::ModelNotLoaded)
    }
}
