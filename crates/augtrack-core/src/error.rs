use thiserror::Error;

/// Error catalog for the tracker core.
///
/// `Device` wraps errors from the external frame source (open, query,
/// queue, timeout, EAGAIN, EINTR), which propagate unchanged.
#[derive(Error, Debug)]
pub enum AugmentError {
    #[error("augmentation not initialized")]
    NotInitialized,
    #[error("augmentation already initialized")]
    AlreadyInitialized,
    #[error("error reading configuration: {0}")]
    ReadingConfig(String),
    #[error("unknown augmentation id")]
    UnknownId,
    #[error("no augmentation resources available")]
    NoResources,
    #[error("too few keypoints in region to create augmentation")]
    TooFewKeypoints,
    #[error("insufficient matching keypoints")]
    InsufficientMatches,
    #[error("external device error: {0}")]
    Device(String),
}
