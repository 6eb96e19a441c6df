use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing feature/region detector model files.
    pub model_dir: PathBuf,
    /// Path to the tracker core's own TOML config, if any.
    pub core_config_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `AUGTRACK_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("AUGTRACK_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/usr/share/augtrack/models"));

        Self {
            camera_device: std::env::var("AUGTRACK_CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            core_config_path: std::env::var("AUGTRACK_CONFIG").ok().map(PathBuf::from),
        }
    }

    pub fn sift_model_path(&self) -> String {
        self.model_dir.join("sift.toml").to_string_lossy().into_owned()
    }

    pub fn mser_model_path(&self) -> String {
        self.model_dir.join("mser.toml").to_string_lossy().into_owned()
    }
}
