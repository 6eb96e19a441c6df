//! augtrack-hw — hardware and detector abstractions the daemon wires
//! into the tracker core. The core (`augtrack-core`) never depends on
//! this crate; the dependency runs the other way.

pub mod camera;
pub mod feature_detector;
pub mod frame;
pub mod region_detector;

pub use camera::{CameraError, DeviceInfo, FrameSource, PixelFormat, V4l2Camera};
pub use feature_detector::{FeatureDetector, FeatureDetectorError, SiftFeatureDetector};
pub use frame::Frame;
pub use region_detector::{MserRegionDetector, RegionDetector, RegionDetectorError};
