use anyhow::Result;
use clap::{Parser, Subcommand};

#[zbus::proxy(
    interface = "org.freedesktop.Augtrack1",
    default_service = "org.freedesktop.Augtrack1",
    default_path = "/org/freedesktop/Augtrack1"
)]
trait Augtrack {
    async fn new_augmentation(&self, cx: f64, cy: f64, a: f64, b: f64, theta: f64) -> zbus::fdo::Result<u8>;
    async fn free_augmentation(&self, id: u8) -> zbus::fdo::Result<()>;
    async fn get_transformation(&self, id: u8) -> zbus::fdo::Result<Vec<f64>>;
    async fn get_error(&self, id: u8) -> zbus::fdo::Result<String>;
    async fn start(&self) -> zbus::fdo::Result<()>;
    async fn stop(&self) -> zbus::fdo::Result<()>;
    async fn start_augmentation(&self, id: u8) -> zbus::fdo::Result<()>;
    async fn stop_augmentation(&self, id: u8) -> zbus::fdo::Result<()>;
    async fn status(&self) -> zbus::fdo::Result<String>;
}

#[derive(Parser)]
#[command(name = "augtrack", about = "augtrack marker-less surface tracker CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new augmentation from an elliptical region of the current frame
    Register {
        #[arg(long)]
        cx: f64,
        #[arg(long)]
        cy: f64,
        #[arg(long)]
        a: f64,
        #[arg(long)]
        b: f64,
        #[arg(long, default_value = "0.0")]
        theta: f64,
    },
    /// Free a registered augmentation
    Free {
        id: u8,
    },
    /// Print an augmentation's current transform as 16 column-major floats
    Transform {
        id: u8,
    },
    /// Begin per-frame tracking for every registered augmentation
    Start,
    /// Stop per-frame tracking
    Stop,
    /// Resume per-frame updates for one paused augmentation
    StartAugmentation {
        id: u8,
    },
    /// Pause per-frame updates for one augmentation
    StopAugmentation {
        id: u8,
    },
    /// Show daemon status
    Status,
    /// List cameras
    Discover,
    /// Run camera diagnostics
    Test {
        #[arg(short, long, default_value = "/dev/video0")]
        device: String,
        #[arg(short = 'n', long, default_value = "10")]
        frames: usize,
    },
}

async fn connect_proxy() -> Result<AugtrackProxy<'static>> {
    let use_session = std::env::var("AUGTRACK_SESSION_BUS").is_ok();
    let conn = if use_session { zbus::Connection::session().await } else { zbus::Connection::system().await }
        .map_err(|e| anyhow::anyhow!("failed to connect to D-Bus: {e}"))?;

    AugtrackProxy::new(&conn)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create proxy: {e} — is augtrackd running?"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Register { cx, cy, a, b, theta } => {
            let proxy = connect_proxy().await?;
            match proxy.new_augmentation(cx, cy, a, b, theta).await {
                Ok(id) => println!("Registered augmentation {id}"),
                Err(e) => {
                    eprintln!("Registration failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Free { id } => {
            let proxy = connect_proxy().await?;
            match proxy.free_augmentation(id).await {
                Ok(()) => println!("Freed augmentation {id}"),
                Err(e) => {
                    eprintln!("Free failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Transform { id } => {
            let proxy = connect_proxy().await?;
            match proxy.get_transformation(id).await {
                Ok(values) => {
                    for row in values.chunks(4) {
                        println!("  {:>10.4} {:>10.4} {:>10.4} {:>10.4}", row[0], row[1], row[2], row[3]);
                    }
                    let status = proxy.get_error(id).await.unwrap_or_default();
                    if !status.is_empty() {
                        println!("({status})");
                    }
                }
                Err(e) => {
                    eprintln!("Failed to read transform: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Start => {
            let proxy = connect_proxy().await?;
            proxy.start().await.map_err(|e| anyhow::anyhow!("start failed: {e}"))?;
            println!("Tracking started");
        }
        Commands::Stop => {
            let proxy = connect_proxy().await?;
            proxy.stop().await.map_err(|e| anyhow::anyhow!("stop failed: {e}"))?;
            println!("Tracking stopped");
        }
        Commands::StartAugmentation { id } => {
            let proxy = connect_proxy().await?;
            proxy.start_augmentation(id).await.map_err(|e| anyhow::anyhow!("failed: {e}"))?;
            println!("Augmentation {id} resumed");
        }
        Commands::StopAugmentation { id } => {
            let proxy = connect_proxy().await?;
            proxy.stop_augmentation(id).await.map_err(|e| anyhow::anyhow!("failed: {e}"))?;
            println!("Augmentation {id} paused");
        }
        Commands::Status => {
            let proxy = connect_proxy().await?;
            match proxy.status().await {
                Ok(json) => {
                    let status: serde_json::Value = serde_json::from_str(&json)?;
                    println!("augtrackd status:");
                    println!("  state:         {}", status["status"].as_str().unwrap_or("?"));
                    println!("  augmentations: {}", status["augmentations"].as_u64().unwrap_or(0));
                }
                Err(e) => {
                    eprintln!("augtrackd: not reachable — {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Discover => cmd_discover(),
        Commands::Test { device, frames } => run_camera_test(&device, frames)?,
    }

    Ok(())
}

fn cmd_discover() {
    let devices = augtrack_hw::V4l2Camera::list_devices();
    if devices.is_empty() {
        println!("No /dev/video* capture devices found.");
        return;
    }
    for dev in &devices {
        println!("{}  {} [{}]", dev.path, dev.name, dev.driver);
    }
}

fn run_camera_test(device_path: &str, frame_count: usize) -> Result<()> {
    use augtrack_hw::FrameSource;

    println!("Camera diagnostics");
    println!("==================");

    let devices = augtrack_hw::V4l2Camera::list_devices();
    println!("\nDiscovered capture devices:");
    if devices.is_empty() {
        println!("  (none)");
    }
    for dev in &devices {
        println!("  {} — {} [{}]", dev.path, dev.name, dev.driver);
    }

    println!("\nOpening {device_path}...");
    let camera = augtrack_hw::V4l2Camera::open(device_path)?;
    println!("  Format: {}x{}", camera.width, camera.height);

    let out_dir = std::path::PathBuf::from("/tmp/augtrack-test");
    std::fs::create_dir_all(&out_dir)?;

    println!("\nCapturing {frame_count} frames...");
    for i in 0..frame_count {
        let frame = camera.capture_frame()?;
        let filename = out_dir.join(format!("frame-{i:03}.pgm"));
        save_pgm(&filename, &frame.data, frame.width, frame.height)?;
        println!("  [{i}] seq={} brightness={:.1} -> {}", frame.sequence, frame.avg_brightness(), filename.display());
    }

    println!("\nDone. Frames saved to {}", out_dir.display());
    Ok(())
}

/// Write a grayscale image as PGM (Portable Gray Map) — no extra deps needed.
fn save_pgm(path: &std::path::Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    use std::io::Write;
    let mut f = std::fs::File::create(path)?;
    write!(f, "P5\n{width} {height}\n255\n")?;
    f.write_all(data)?;
    Ok(())
}
