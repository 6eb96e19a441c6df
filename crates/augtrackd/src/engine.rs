use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use augtrack_core::{AffineTransform, AugmentError, AugmentationId, Config as CoreConfig, Ellipse, Pipeline};
use augtrack_hw::{FeatureDetector, FrameSource, MserRegionDetector, RegionDetector, SiftFeatureDetector, V4l2Camera};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] augtrack_hw::CameraError),
    #[error("tracker error: {0}")]
    Tracker(#[from] AugmentError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    NewAugmentation { region: Ellipse, reply: oneshot::Sender<Result<AugmentationId, EngineError>> },
    FreeAugmentation { id: AugmentationId, reply: oneshot::Sender<Result<(), EngineError>> },
    GetTransformation { id: AugmentationId, reply: oneshot::Sender<Result<AffineTransform, EngineError>> },
    IsTracking { id: AugmentationId, reply: oneshot::Sender<Result<bool, EngineError>> },
    Start { reply: oneshot::Sender<Result<(), EngineError>> },
    Stop { reply: oneshot::Sender<Result<(), EngineError>> },
    StartAugmentation { id: AugmentationId, reply: oneshot::Sender<Result<(), EngineError>> },
    StopAugmentation { id: AugmentationId, reply: oneshot::Sender<Result<(), EngineError>> },
    Status { reply: oneshot::Sender<String> },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

macro_rules! round_trip {
    ($self:ident, $variant:ident { $($field:ident: $val:expr),* }) => {{
        let (reply_tx, reply_rx) = oneshot::channel();
        $self
            .tx
            .send(EngineRequest::$variant { $($field: $val,)* reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }};
}

impl EngineHandle {
    pub async fn new_augmentation(&self, region: Ellipse) -> Result<AugmentationId, EngineError> {
        round_trip!(self, NewAugmentation { region: region })?
    }

    pub async fn free_augmentation(&self, id: AugmentationId) -> Result<(), EngineError> {
        round_trip!(self, FreeAugmentation { id: id })?
    }

    pub async fn get_transformation(&self, id: AugmentationId) -> Result<AffineTransform, EngineError> {
        round_trip!(self, GetTransformation { id: id })?
    }

    pub async fn is_tracking(&self, id: AugmentationId) -> Result<bool, EngineError> {
        round_trip!(self, IsTracking { id: id })?
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        round_trip!(self, Start {})?
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        round_trip!(self, Stop {})?
    }

    pub async fn start_augmentation(&self, id: AugmentationId) -> Result<(), EngineError> {
        round_trip!(self, StartAugmentation { id: id })?
    }

    pub async fn stop_augmentation(&self, id: AugmentationId) -> Result<(), EngineError> {
        round_trip!(self, StopAugmentation { id: id })?
    }

    pub async fn status(&self) -> Result<String, EngineError> {
        round_trip!(self, Status {})
    }
}

/// Spawn the tracker on a dedicated OS thread.
///
/// Opens the camera and the (stub) detectors synchronously at startup,
/// fail-fast if either is unavailable, then enters a loop that drains
/// pending D-Bus-originated requests and, while running, captures and
/// tracks one frame per iteration.
pub fn spawn_engine(
    camera_device: &str,
    sift_model_path: &str,
    mser_model_path: &str,
    core_config: CoreConfig,
) -> Result<EngineHandle, EngineError> {
    let camera = V4l2Camera::open(camera_device)?;
    tracing::info!(device = camera_device, width = camera.width, height = camera.height, "camera opened");

    let detector = SiftFeatureDetector::load(sift_model_path).map_err(|e| {
        EngineError::Tracker(AugmentError::ReadingConfig(e.to_string()))
    })?;
    let region_detector = MserRegionDetector::load(mser_model_path).map_err(|e| {
        EngineError::Tracker(AugmentError::ReadingConfig(e.to_string()))
    })?;

    let mut pipeline = Pipeline::new();
    pipeline.augment_init(core_config)?;

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("augtrack-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            let mut last_keypoints: Vec<augtrack_core::Keypoint> = Vec::new();
            loop {
                loop {
                    match rx.try_recv() {
                        Ok(req) => handle_request(&mut pipeline, &last_keypoints, req),
                        Err(mpsc::error::TryRecvError::Empty) => break,
                        Err(mpsc::error::TryRecvError::Disconnected) => {
                            tracing::info!("engine thread exiting");
                            return;
                        }
                    }
                }

                if pipeline.is_running() {
                    if let Some(keypoints) = tick(&camera, &detector, &region_detector, &mut pipeline) {
                        last_keypoints = keypoints;
                    }
                } else {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
            }
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

/// Capture and track one frame, returning the keypoints detected (so
/// `new_augmentation` requests arriving between ticks can register
/// against the most recent frame instead of an empty set).
fn tick(
    camera: &V4l2Camera,
    detector: &SiftFeatureDetector,
    region_detector: &MserRegionDetector,
    pipeline: &mut Pipeline,
) -> Option<Vec<augtrack_core::Keypoint>> {
    let frame = match camera.capture_frame() {
        Ok(f) => f,
        Err(err) => {
            tracing::warn!(error = %err, "frame capture failed");
            return None;
        }
    };

    let keypoints = match detector.detect(&frame.data, frame.width, frame.height) {
        Ok(k) => k,
        Err(err) => {
            tracing::debug!(error = %err, "feature detection unavailable this frame");
            return None;
        }
    };

    // The region detector narrows each augmentation's search area; while
    // it is a stub, per-augmentation re-gather falls back to the full frame.
    let _ = region_detector.detect(&frame.data, frame.width, frame.height);

    if let Err(err) = pipeline.update_frame(&keypoints) {
        tracing::warn!(error = %err, "update_frame failed");
    }

    Some(keypoints)
}

fn handle_request(pipeline: &mut Pipeline, last_keypoints: &[augtrack_core::Keypoint], req: EngineRequest) {
    match req {
        EngineRequest::NewAugmentation { region, reply } => {
            let result = pipeline.new_augmentation(&region, last_keypoints).map_err(EngineError::Tracker);
            let _ = reply.send(result);
        }
        EngineRequest::FreeAugmentation { id, reply } => {
            let _ = reply.send(pipeline.free_augmentation(id).map_err(EngineError::Tracker));
        }
        EngineRequest::GetTransformation { id, reply } => {
            let _ = reply.send(pipeline.get_transformation(id).map_err(EngineError::Tracker));
        }
        EngineRequest::IsTracking { id, reply } => {
            let _ = reply.send(pipeline.is_tracking(id).map_err(EngineError::Tracker));
        }
        EngineRequest::Start { reply } => {
            let _ = reply.send(pipeline.start().map_err(EngineError::Tracker));
        }
        EngineRequest::Stop { reply } => {
            let _ = reply.send(pipeline.stop().map_err(EngineError::Tracker));
        }
        EngineRequest::StartAugmentation { id, reply } => {
            let _ = reply.send(pipeline.start_augmentation(id).map_err(EngineError::Tracker));
        }
        EngineRequest::StopAugmentation { id, reply } => {
            let _ = reply.send(pipeline.stop_augmentation(id).map_err(EngineError::Tracker));
        }
        EngineRequest::Status { reply } => {
            let status = if pipeline.is_running() { "running" } else { "stopped" };
            let _ = reply.send(
                serde_json::json!({
                    "status": status,
                    "augmentations": pipeline.augmentation_count(),
                })
                .to_string(),
            );
        }
    }
}
