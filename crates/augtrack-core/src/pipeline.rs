//! The ambient facade tying config, registry, and per-frame
//! orchestration together. This is the crate's single entry point;
//! everything above it (hardware, D-Bus, CLI) only ever talks to a
//! [`Pipeline`].

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AugmentError;
use crate::registry::{AugmentationId, Registry};
use crate::types::{AffineTransform, Ellipse, Keypoint};

/// Process lifecycle state: `new_augmentation`/`free_augmentation` are
/// only valid once initialized, and `update_frame` only does work
/// while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Stopped,
    Running,
}

/// Owns the one process-wide [`Registry`] plus the init/running
/// lifecycle state machine.
pub struct Pipeline {
    config: Config,
    registry: Registry,
    state: State,
}

impl Pipeline {
    /// Construct without loading configuration. Call [`Pipeline::augment_init`]
    /// before using.
    pub fn new() -> Self {
        Self { config: Config::default(), registry: Registry::new(), state: State::Uninitialized }
    }

    /// Load configuration and move to the stopped state.
    pub fn augment_init(&mut self, config: Config) -> Result<(), AugmentError> {
        if self.state != State::Uninitialized {
            return Err(AugmentError::AlreadyInitialized);
        }
        self.config = config;
        self.state = State::Stopped;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begin accepting `update_frame` calls.
    pub fn start(&mut self) -> Result<(), AugmentError> {
        self.require_initialized()?;
        self.state = State::Running;
        Ok(())
    }

    /// Stop accepting `update_frame` calls. Registered augmentations and
    /// their reference sets are left untouched.
    pub fn stop(&mut self) -> Result<(), AugmentError> {
        self.require_initialized()?;
        self.state = State::Stopped;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Register a new augmentation from the keypoints found inside
    /// `region` at the current frame.
    pub fn new_augmentation(
        &mut self,
        region: &Ellipse,
        frame_keypoints: &[Keypoint],
    ) -> Result<AugmentationId, AugmentError> {
        self.require_initialized()?;
        let id = self.registry.create(region, frame_keypoints, self.config)?;
        debug!(id, "registered augmentation");
        Ok(id)
    }

    pub fn free_augmentation(&mut self, id: AugmentationId) -> Result<(), AugmentError> {
        self.require_initialized()?;
        self.registry.free(id)
    }

    /// Resume per-frame updates for a paused augmentation.
    pub fn start_augmentation(&mut self, id: AugmentationId) -> Result<(), AugmentError> {
        self.require_initialized()?;
        self.registry.get_mut(id)?.set_enabled(true);
        Ok(())
    }

    /// Pause per-frame updates for an augmentation without freeing its
    /// slot or discarding its reference set.
    pub fn stop_augmentation(&mut self, id: AugmentationId) -> Result<(), AugmentError> {
        self.require_initialized()?;
        self.registry.get_mut(id)?.set_enabled(false);
        Ok(())
    }

    pub fn get_transformation(&self, id: AugmentationId) -> Result<AffineTransform, AugmentError> {
        Ok(self.registry.get(id)?.transform())
    }

    pub fn is_tracking(&self, id: AugmentationId) -> Result<bool, AugmentError> {
        Ok(self.registry.get(id)?.is_tracking())
    }

    pub fn augmentation_count(&self) -> usize {
        self.registry.len()
    }

    /// Run one frame of the tracking algorithm over every registered
    /// augmentation. Each augmentation re-gathers its own patch-local
    /// keypoints from `full_frame_keypoints` by untransforming them into
    /// its registration frame, falling back to the full frame when that
    /// gather comes up short.
    ///
    /// Returns, for each augmentation that is still registered, whether
    /// its transform was updated this frame.
    pub fn update_frame(
        &mut self,
        full_frame_keypoints: &[Keypoint],
    ) -> Result<Vec<(AugmentationId, bool)>, AugmentError> {
        self.require_initialized()?;
        if !self.is_running() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for (id, augmentation) in self.registry.iter_mut() {
            match augmentation.update(full_frame_keypoints) {
                Ok(updated) => results.push((id, updated)),
                Err(err) => {
                    warn!(id, %err, "augmentation update failed");
                    results.push((id, false));
                }
            }
        }
        Ok(results)
    }

    fn require_initialized(&self) -> Result<(), AugmentError> {
        if self.state == State::Uninitialized {
            Err(AugmentError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DESCRIPTOR_DIM;

    fn keypoints() -> Vec<Keypoint> {
        (0..12)
            .map(|i| {
                let mut d = [0.0f32; DESCRIPTOR_DIM];
                d[i] = 100.0;
                Keypoint::new(i as f32, i as f32, d)
            })
            .collect()
    }

    #[test]
    fn operations_before_init_are_rejected() {
        let mut p = Pipeline::new();
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        assert!(matches!(p.new_augmentation(&region, &keypoints()), Err(AugmentError::NotInitialized)));
    }

    #[test]
    fn double_init_is_rejected() {
        let mut p = Pipeline::new();
        p.augment_init(Config::default()).unwrap();
        assert!(matches!(p.augment_init(Config::default()), Err(AugmentError::AlreadyInitialized)));
    }

    #[test]
    fn update_frame_is_a_noop_while_stopped() {
        let mut p = Pipeline::new();
        p.augment_init(Config::default()).unwrap();
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let id = p.new_augmentation(&region, &keypoints()).unwrap();
        let results = p.update_frame(&keypoints()).unwrap();
        assert!(results.is_empty());
        assert!(!p.is_tracking(id).unwrap());
    }

    #[test]
    fn full_lifecycle_tracks_an_augmentation() {
        let mut p = Pipeline::new();
        p.augment_init(Config::default()).unwrap();
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let kps = keypoints();
        let id = p.new_augmentation(&region, &kps).unwrap();
        p.start().unwrap();

        let results = p.update_frame(&kps).unwrap();
        assert_eq!(results, vec![(id, true)]);
        assert!(p.is_tracking(id).unwrap());

        p.free_augmentation(id).unwrap();
        assert!(matches!(p.get_transformation(id), Err(AugmentError::UnknownId)));
    }
}
