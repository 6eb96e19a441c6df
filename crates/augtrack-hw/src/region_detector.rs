//! MSER-style stable-region detector, used to seed and narrow the
//! per-augmentation search area. Out of scope for the same reason as
//! the feature detector: the region-extraction algorithm belongs to a
//! vision library.

use augtrack_core::Ellipse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegionDetectorError {
    #[error("model not loaded")]
    ModelNotLoaded,
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Produces candidate planar regions, each expressed as the ellipse the
/// tracker core uses to seed or search a reference set. The
/// region-extraction algorithm itself is out of scope for this crate.
pub trait RegionDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Result<Vec<Ellipse>, RegionDetectorError>;
}

/// Placeholder detector wired in until a real extractor is available.
pub struct MserRegionDetector {
    _initialized: bool,
}

impl MserRegionDetector {
    pub fn load(_model_path: &str) -> Result<Self, RegionDetectorError> {
        // TODO: load MSER detection parameters
        Ok(Self { _initialized: false })
    }
}

impl RegionDetector for MserRegionDetector {
    fn detect(&self, _gray: &[u8], _width: u32, _height: u32) -> Result<Vec<Ellipse>, RegionDetectorError> {
        // TODO: run MSER region extraction and fit ellipses to the stable regions
        Err(RegionDetectorError::ModelNotLoaded)
    }
}
