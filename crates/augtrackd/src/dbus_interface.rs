use zbus::interface;

use augtrack_core::Ellipse;

use crate::engine::EngineHandle;

/// D-Bus interface for the augtrack tracking daemon.
///
/// Bus name: org.freedesktop.Augtrack1
/// Object path: /org/freedesktop/Augtrack1
pub struct AugtrackService {
    pub engine: EngineHandle,
}

#[interface(name = "org.freedesktop.Augtrack1")]
impl AugtrackService {
    /// Register a new augmentation from an elliptical region of the
    /// current frame, given in pixel coordinates. Returns the new
    /// augmentation's id.
    async fn new_augmentation(
        &self,
        cx: f64,
        cy: f64,
        a: f64,
        b: f64,
        theta: f64,
    ) -> zbus::fdo::Result<u8> {
        let region = Ellipse::new(cx as f32, cy as f32, a as f32, b as f32, theta as f32);
        self.engine.new_augmentation(region).await.map_err(|e| {
            tracing::error!(error = %e, "new_augmentation failed");
            zbus::fdo::Error::Failed(e.to_string())
        })
    }

    /// Free a previously registered augmentation.
    async fn free_augmentation(&self, id: u8) -> zbus::fdo::Result<()> {
        self.engine
            .free_augmentation(id)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Return the augmentation's current transform as a column-major
    /// 4x4 matrix (16 values), z held identity.
    async fn get_transformation(&self, id: u8) -> zbus::fdo::Result<Vec<f64>> {
        let transform = self
            .engine
            .get_transformation(id)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        Ok(transform.to_column_major_4x4().iter().map(|&v| v as f64).collect())
    }

    /// Whether the augmentation is currently tracking (as opposed to
    /// lost or not yet successfully updated).
    async fn get_error(&self, id: u8) -> zbus::fdo::Result<String> {
        let tracking = self
            .engine
            .is_tracking(id)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        Ok(if tracking { String::new() } else { "not tracking".to_string() })
    }

    /// Begin per-frame tracking for every registered augmentation.
    async fn start(&self) -> zbus::fdo::Result<()> {
        self.engine.start().await.map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Stop per-frame tracking. Registered augmentations and their
    /// reference sets are left untouched.
    async fn stop(&self) -> zbus::fdo::Result<()> {
        self.engine.stop().await.map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Resume per-frame updates for one paused augmentation.
    async fn start_augmentation(&self, id: u8) -> zbus::fdo::Result<()> {
        self.engine
            .start_augmentation(id)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Pause per-frame updates for one augmentation without freeing it.
    async fn stop_augmentation(&self, id: u8) -> zbus::fdo::Result<()> {
        self.engine
            .stop_augmentation(id)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Daemon status as JSON: running state and augmentation count.
    async fn status(&self) -> zbus::fdo::Result<String> {
        self.engine.status().await.map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }
}
