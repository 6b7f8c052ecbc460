use face_capture::{
    camera::{Camera, FrameSource, StillFrame},
    cli::{clear_screen, AsciiRenderer, TerminalFeedback},
    common::{Config, DevMode},
    core::{
        decode_data_url, locate_guide, rasterize, CaptureSettings, CaptureWidget, FixedLayout,
        FrameQuality, TriggerOutcome,
    },
    service::SubmissionClient,
    storage::{FileStore, ImageStore},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::Rgba;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facecapture")]
#[command(about = "Capture a guide-aligned face image for login and signup")]
struct Cli {
    /// Enable development mode (saves data locally for testing)
    #[arg(long, global = true)]
    dev: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a face image; Enter captures or retakes, q quits
    Capture {
        /// Use a still image instead of the camera
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Trigger once and exit
        #[arg(long)]
        once: bool,
    },
    /// Crop and check an image without storing it
    Inspect {
        #[arg(short, long)]
        image: PathBuf,
        /// Write the frame with the crop outlined
        #[arg(short, long)]
        overlay: Option<PathBuf>,
    },
    /// Show the stored image
    Show {
        /// Write the stored image as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Discard the stored image
    Retake,
    /// Log in with the stored image
    Login,
    /// Sign up with the stored image
    Signup {
        #[arg(short, long)]
        username: String,
    },
    /// List available cameras
    Devices,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Capture { image, once } => run_capture(&config, &dev_mode, image.as_deref(), once)?,
        Commands::Inspect { image, overlay } => run_inspect(&config, &dev_mode, &image, overlay)?,
        Commands::Show { output } => {
            let store = open_store(&config, &dev_mode)?;
            let Some(data_url) = store.get(&config.capture.storage_key)? else {
                println!("No image stored. Run `facecapture capture` first.");
                return Ok(());
            };

            let stored = decode_data_url(&data_url)?.to_rgba8();
            println!("📷 Stored image: {}x{} ({} bytes encoded)", stored.width(), stored.height(), data_url.len());
            if let Some(quality) = FrameQuality::measure(&stored) {
                println!("   {}", quality.get_quality_assessment());
            }
            println!("{}", AsciiRenderer::new(None, None).render(&stored));

            let output = output.or_else(|| dev_mode.is_enabled().then(|| dev_mode.get_capture_path("capture")));
            if let Some(path) = output {
                stored.save(&path).with_context(|| format!("Failed to write {}", path.display()))?;
                println!("💾 Saved to {}", path.display());
            }
        }
        Commands::Retake => {
            let mut store = open_store(&config, &dev_mode)?;
            store.remove(&config.capture.storage_key)?;
            println!("🗑️  Stored image cleared");
        }
        Commands::Login => {
            let mut store = open_store(&config, &dev_mode)?;
            let client = SubmissionClient::new(&config.server)?;
            let outcome = client.login(&mut store, &config.capture.storage_key)?;
            report_submission(outcome.success, &outcome.message, outcome.redirect.as_deref());
        }
        Commands::Signup { username } => {
            let mut store = open_store(&config, &dev_mode)?;
            let client = SubmissionClient::new(&config.server)?;
            let outcome = client.signup(&mut store, &config.capture.storage_key, &username)?;
            report_submission(outcome.success, &outcome.message, outcome.redirect.as_deref());
        }
        Commands::Devices => {
            let cameras = Camera::list_all()?;
            if cameras.is_empty() {
                println!("❌ No cameras found!");
                println!("   Ensure you have permission to access /dev/video*");
                return Ok(());
            }
            for camera in cameras {
                let marker = if camera.index == config.camera.device_index { " (configured)" } else { "" };
                println!("📷 /dev/video{}: {}{}", camera.index, camera.name, marker);
                if !camera.video_capture {
                    println!("   - no video capture capability");
                }
                for format in &camera.formats {
                    println!("   - {}", format);
                }
            }
        }
    }

    Ok(())
}

fn open_store(config: &Config, dev_mode: &DevMode) -> Result<FileStore> {
    Ok(FileStore::new_with_dev_mode(config.storage.data_dir.as_deref(), dev_mode)?)
}

fn open_source(config: &Config, image: Option<&Path>) -> face_capture::Result<Box<dyn FrameSource>> {
    match image {
        Some(path) => Ok(Box::new(StillFrame::open(path)?)),
        None => Ok(Box::new(Camera::open(&config.camera)?)),
    }
}

fn run_capture(config: &Config, dev_mode: &DevMode, image: Option<&Path>, once: bool) -> Result<()> {
    let store = open_store(config, dev_mode)?;
    let mut widget = CaptureWidget::new(
        FixedLayout::from_config(&config.viewport),
        store,
        TerminalFeedback::new(),
        CaptureSettings::from_config(&config.capture),
    );

    if !widget.setup_camera(|| open_source(config, image)) {
        println!("❌ Could not access the camera. Check the device or pass --image.");
        return Ok(());
    }

    if once {
        report_trigger(&widget.on_trigger());
        return Ok(());
    }

    let renderer = AsciiRenderer::new(None, None);
    let stdin = io::stdin();
    loop {
        if !widget.is_frozen() {
            match widget.guide_preview() {
                Ok((frame, region)) => {
                    clear_screen()?;
                    println!("{}", renderer.render_with_guide(&frame, &region));
                }
                Err(e) => tracing::warn!("Preview unavailable: {}", e),
            }
        }

        let action = if widget.is_frozen() { "retake" } else { "capture" };
        print!("[Enter] {}, [r] refresh, [q] quit > ", action);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "q" => break,
            "r" => continue,
            _ => report_trigger(&widget.on_trigger()),
        }
    }

    Ok(())
}

fn run_inspect(config: &Config, dev_mode: &DevMode, image: &Path, overlay: Option<PathBuf>) -> Result<()> {
    let mut source = StillFrame::open(image)?;
    let layout = FixedLayout::from_config(&config.viewport);
    let settings = CaptureSettings::from_config(&config.capture);

    let region = locate_guide(source.dimensions(), &layout)?;
    let mut frame = source.current_frame()?;
    let crop = rasterize(&frame, &region).context("Guide box maps to an empty or oversized crop")?;
    let quality = FrameQuality::measure(&crop).context("Crop has no pixels")?;
    let exposure = settings.brightness.judge(quality.brightness);

    println!("Source region: x={:.1} y={:.1} w={:.1} h={:.1}", region.x, region.y, region.width, region.height);
    println!("Crop: {}x{}", crop.width(), crop.height());
    println!("{}", quality.get_quality_assessment());
    println!("{} {}", if exposure.is_acceptable() { "✅" } else { "❌" }, exposure.message());

    let overlay = overlay.or_else(|| dev_mode.is_enabled().then(|| dev_mode.get_debug_path("overlay")));
    if let Some(path) = overlay {
        let outline = DrawRect::at(region.x.round() as i32, region.y.round() as i32)
            .of_size(crop.width(), crop.height());
        draw_hollow_rect_mut(&mut frame, outline, Rgba([0, 255, 0, 255]));
        frame.save(&path).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("💾 Overlay saved to {}", path.display());
    }

    Ok(())
}

fn report_trigger(outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Resumed => println!("🔄 Camera live again, previous image discarded"),
        TriggerOutcome::Accepted { quality, stored: true } => {
            println!("✅ Captured (brightness {:.1}). Press Enter to retake.", quality.brightness)
        }
        TriggerOutcome::Accepted { quality, stored: false } => {
            println!("⚠️  Captured (brightness {:.1}) but the image could not be saved", quality.brightness)
        }
        TriggerOutcome::Rejected { quality, .. } => {
            println!("   Brightness {:.1}, try again", quality.brightness)
        }
        TriggerOutcome::PersistenceFailed { .. } => println!("   Capture discarded"),
        TriggerOutcome::DeviceUnavailable => println!("❌ Camera unavailable"),
        TriggerOutcome::GeometryUnavailable => println!("❌ Guide box could not be located"),
    }
}

fn report_submission(success: bool, message: &str, redirect: Option<&str>) {
    if success {
        println!("✅ {}", message);
        if let Some(redirect) = redirect {
            println!("   Continue at {}", redirect);
        }
    } else {
        println!("❌ {}", message);
    }
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
