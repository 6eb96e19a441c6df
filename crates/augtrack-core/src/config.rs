//! Tunable thresholds loaded at `augment_init` time, as TOML.

use std::path::Path;

use serde::Deserialize;

use crate::affine::MIN_MATCHES;
use crate::augmentation::{MAX_SCALE_RATIO, MAX_SKEW};
use crate::error::AugmentError;
use crate::matcher::UNIQUE_MATCH_RATIO;
use crate::refset::{MAX_KEYPOINTS, MIN_REGISTRATION_KEYPOINTS};
use crate::registry::MAX_AUGMENTATIONS;

/// Tunable thresholds for the tracker core, loaded at `augment_init`
/// time. Every field defaults to the fixed constant it would otherwise
/// hard-code, so an empty or partial config file reproduces the
/// built-in thresholds exactly.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Config {
    pub unique_match_ratio: f32,
    pub min_matches: usize,
    pub min_registration_keypoints: usize,
    pub max_reference_keypoints: usize,
    pub max_augmentations: usize,
    pub max_skew: f32,
    pub max_scale_ratio: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unique_match_ratio: UNIQUE_MATCH_RATIO,
            min_matches: MIN_MATCHES,
            min_registration_keypoints: MIN_REGISTRATION_KEYPOINTS,
            max_reference_keypoints: MAX_KEYPOINTS,
            max_augmentations: MAX_AUGMENTATIONS,
            max_skew: MAX_SKEW,
            max_scale_ratio: MAX_SCALE_RATIO,
        }
    }
}

impl Config {
    /// Load from a TOML file, falling back to field defaults for
    /// anything the file omits.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AugmentError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AugmentError::ReadingConfig(e.to_string()))?;
        toml::from_str(&text).map_err(|e| AugmentError::ReadingConfig(e.to_string()))
    }

    /// Load from `AUGTRACK_CONFIG` if set, otherwise use the built-in
    /// defaults.
    pub fn from_env() -> Result<Self, AugmentError> {
        match std::env::var("AUGTRACK_CONFIG") {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::default()),
        }
    }
}
