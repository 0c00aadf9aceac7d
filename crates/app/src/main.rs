mod encoder;

use std::{
    io::BufRead,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use flyover_core::{
    mapping::legend_entries, read_photo_metadata, AppConfig, CompositeSurface, DisplayMode,
    FitRecordDecoder, FrameSync, JsonRecordDecoder, PhotoMetadata, RecordDecoder, RecordingFormat,
    RenderGraph, Renderer, Session, SessionHandle, SizePreset, SpeedUnit, Viewport,
};
use tracing_subscriber::EnvFilter;

use crate::encoder::{save_png, FrameDirectoryFactory};

/// Screen size assumed for the fullscreen preset.
const SCREEN: (u32, u32) = (1280, 720);
const REFRESH: Duration = Duration::from_millis(16);
const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff", "heic", "heif", "png"];

fn main() -> flyover_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(preset) = cli.size {
        config.display.size_preset = preset;
    }
    if cli.mph {
        config.display.speed_unit = SpeedUnit::Mph;
    }

    match cli.command {
        Commands::Stats { route } => run_stats(&route, config),
        Commands::Render { route, mode, output } => run_render(&route, mode.into(), &output, config),
        Commands::Play {
            route,
            photos,
            interval,
            realtime,
            interactive,
        } => {
            if let Some(ms) = interval {
                config.animation.interval_ms = ms;
            }
            run_play(&route, &photos, realtime || interactive, interactive, config)
        }
        Commands::Record {
            route,
            photos,
            output,
            frame_rate,
            format,
            sync,
        } => {
            if let Some(rate) = frame_rate {
                config.recording.frame_rate = rate;
            }
            if let Some(format) = format {
                config.recording.format = format;
            }
            run_record(&route, &photos, &output, sync.into(), config)
        }
    }
}

fn viewport(config: &AppConfig) -> Viewport {
    let (width, height) = config.display.size_preset.dimensions(SCREEN);
    Viewport {
        width,
        height,
        device_pixel_ratio: config.display.device_pixel_ratio,
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Picks the record decoder from the route file's extension. Anything that
/// is not `.fit` is read as a JSON array of track records.
fn route_decoder(path: &Path) -> &'static dyn RecordDecoder {
    match extension(path).as_deref() {
        Some("fit") => &FitRecordDecoder,
        _ => &JsonRecordDecoder,
    }
}

fn is_photo(path: &Path) -> bool {
    extension(path).is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()))
}

/// Collects photo metadata from JSON lists, image files and directories of
/// images. Images without readable EXIF data are skipped with a warning.
fn read_photos(paths: &[PathBuf]) -> flyover_core::Result<Vec<PhotoMetadata>> {
    let mut metadata = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut images: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| is_photo(path))
                .collect();
            images.sort();
            metadata.extend(images.iter().filter_map(|image| read_image(image)));
        } else if extension(path).as_deref() == Some("json") {
            let listed: Vec<PhotoMetadata> = serde_json::from_slice(&std::fs::read(path)?)?;
            metadata.extend(listed);
        } else {
            metadata.extend(read_image(path));
        }
    }
    Ok(metadata)
}

fn read_image(path: &Path) -> Option<PhotoMetadata> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let result = std::fs::read(path)
        .map_err(flyover_core::FlyoverError::from)
        .and_then(|bytes| read_photo_metadata(&name, &bytes));
    match result {
        Ok(meta) => Some(meta),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "skipping photo");
            None
        }
    }
}

fn open_session(
    route: &Path,
    photos: &[PathBuf],
    output: &Path,
    config: AppConfig,
) -> flyover_core::Result<Session<RenderGraph>> {
    config.validate()?;
    let renderer = RenderGraph::new(viewport(&config));
    let mut session = Session::new(renderer, Box::new(FrameDirectoryFactory::new(output)), config);

    let bytes = std::fs::read(route)?;
    session.load_route_bytes(route_decoder(route), &bytes);
    if let Some(err) = session.take_alerts().into_iter().next() {
        return Err(err);
    }

    if !photos.is_empty() {
        let metadata = read_photos(photos)?;
        let placed = session.load_photos(&metadata, Utc::now());
        tracing::info!(placed, "photo markers placed");
    }
    Ok(session)
}

fn run_stats(route: &Path, config: AppConfig) -> flyover_core::Result<()> {
    let session = open_session(route, &[], Path::new("."), config)?;
    for line in session.info_panel() {
        println!("{line}");
    }
    println!();
    println!("Speed legend (km/h):");
    for (label, color) in legend_entries() {
        println!("  {color} {label}");
    }
    Ok(())
}

fn run_render(
    route: &Path,
    mode: DisplayMode,
    output: &Path,
    config: AppConfig,
) -> flyover_core::Result<()> {
    let mut session = open_session(route, &[], Path::new("."), config)?;
    session.show_mode(mode);
    session.fit_to_route();

    let mut surface = CompositeSurface::for_viewport(session.renderer().viewport());
    session.renderer().capture(&mut surface)?;
    save_png(surface.raster(), output)?;
    tracing::info!(%mode, output = %output.display(), "map rendered");
    Ok(())
}

fn run_play(
    route: &Path,
    photos: &[PathBuf],
    realtime: bool,
    interactive: bool,
    config: AppConfig,
) -> flyover_core::Result<()> {
    let mut session = open_session(route, photos, Path::new("."), config)?;
    session.start_animation();
    report_alerts(&mut session);

    if !realtime {
        while session.is_busy() {
            session.drive(REFRESH, REFRESH);
        }
        tracing::info!(elapsed = ?session.now(), "playback finished");
        return Ok(());
    }

    let handle = SessionHandle::new(session);
    let quit = Arc::new(AtomicBool::new(false));
    if interactive {
        spawn_command_reader(handle.clone(), quit.clone());
    }
    drive_wall_clock(&handle, &quit, interactive)
}

fn run_record(
    route: &Path,
    photos: &[PathBuf],
    output: &Path,
    sync: FrameSync,
    config: AppConfig,
) -> flyover_core::Result<()> {
    let refresh = match sync {
        FrameSync::DisplayRefresh => {
            Duration::from_secs_f64(1.0 / f64::from(config.recording.frame_rate.max(1)))
        }
        FrameSync::AnimationTick => REFRESH,
    };
    let mut session = open_session(route, photos, output, config)?;
    let options = session.record_animation_sequence(sync);
    if let Some(err) = session.take_alerts().into_iter().next() {
        return Err(err);
    }
    if let Some(options) = options {
        tracing::info!(
            name = %options.name,
            total_frames = options.frame_budget(),
            "recording sequence"
        );
    }

    let mut last_report = Duration::ZERO;
    while session.is_busy() {
        session.advance(refresh);
        let progress = session.on_display_refresh();
        if let Some(err) = session.take_alerts().into_iter().next() {
            return Err(err);
        }
        let progress = progress.or_else(|| session.recorder().progress());
        if session.now() - last_report >= Duration::from_secs(1) {
            last_report = session.now();
            if let Some(progress) = progress {
                tracing::info!(%progress, "recording");
            }
        }
    }

    match session.recorder().last_output() {
        Some(output) => {
            println!(
                "{} frames written to {}",
                output.frames,
                output.location.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        None => Err(flyover_core::FlyoverError::msg(
            session
                .recorder()
                .last_error()
                .unwrap_or("recording produced no output")
                .to_string(),
        )),
    }
}

/// Advances the session in step with the wall clock until playback ends or
/// the operator quits.
fn drive_wall_clock(
    handle: &SessionHandle<RenderGraph>,
    quit: &AtomicBool,
    interactive: bool,
) -> flyover_core::Result<()> {
    let mut last = Instant::now();
    let mut last_status = None;
    loop {
        std::thread::sleep(REFRESH);
        let now = Instant::now();
        let elapsed = now - last;
        last = now;

        let busy = handle.with(|session| {
            session.advance(elapsed);
            session.on_display_refresh();
            report_alerts(session);

            let status = session.renderer().status().cloned();
            if status != last_status {
                if let Some(status) = &status {
                    println!("{} | {}", status.progress, status.elapsed);
                }
                last_status = status;
            }
            session.is_busy()
        })?;

        if quit.load(Ordering::Relaxed) || (!busy && !interactive) {
            return Ok(());
        }
    }
}

fn spawn_command_reader(handle: SessionHandle<RenderGraph>, quit: Arc<AtomicBool>) {
    println!("commands: p play/pause, s stop, r restart, n step, c <ms> cadence, u unit, t tooltips, q quit");
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let mut parts = line.split_whitespace();
            let applied = handle.with(|session| match (parts.next(), parts.next()) {
                (Some("p"), _) => session.play_pause(),
                (Some("s"), _) => session.stop_animation(),
                (Some("r"), _) => session.restart_animation(),
                (Some("n"), _) => session.step_animation(),
                (Some("c"), Some(ms)) => match ms.parse() {
                    Ok(ms) => session.set_cadence(ms),
                    Err(_) => println!("invalid interval `{ms}`"),
                },
                (Some("u"), _) => session.toggle_speed_unit(),
                (Some("t"), _) => session.toggle_tooltips(),
                (Some("q"), _) => quit.store(true, Ordering::Relaxed),
                (Some(other), _) => println!("unknown command `{other}`"),
                (None, _) => {}
            });
            if applied.is_err() || quit.load(Ordering::Relaxed) {
                break;
            }
        }
        quit.store(true, Ordering::Relaxed);
    });
}

fn report_alerts(session: &mut Session<RenderGraph>) {
    for alert in session.take_alerts() {
        eprintln!("error: {alert}");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay GPS activities on a map", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Map size preset (youtube, tiktok, ... or WIDTHxHEIGHT).
    #[arg(long, global = true)]
    size: Option<SizePreset>,

    /// Show speeds in miles per hour.
    #[arg(long, global = true)]
    mph: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print route statistics.
    Stats {
        /// FIT activity file, or a JSON array of decoded track records.
        route: PathBuf,
    },
    /// Draw one static view of the route to a PNG file.
    Render {
        route: PathBuf,
        #[arg(short, long, value_enum, default_value_t = ModeArg::Route)]
        mode: ModeArg,
        #[arg(short, long, default_value = "route.png")]
        output: PathBuf,
    },
    /// Play the route animation.
    Play {
        route: PathBuf,
        /// Photos to place: image files, directories of images or JSON
        /// arrays of photo metadata.
        #[arg(long, num_args = 1..)]
        photos: Vec<PathBuf>,
        /// Milliseconds between two animation steps.
        #[arg(short, long)]
        interval: Option<u64>,
        /// Follow the wall clock instead of running as fast as possible.
        #[arg(long)]
        realtime: bool,
        /// Read playback commands from stdin.
        #[arg(long)]
        interactive: bool,
    },
    /// Record a full play-through as an image sequence.
    Record {
        route: PathBuf,
        #[arg(long, num_args = 1..)]
        photos: Vec<PathBuf>,
        /// Directory receiving the recording.
        #[arg(short, long, default_value = "recordings")]
        output: PathBuf,
        #[arg(long)]
        frame_rate: Option<u32>,
        #[arg(long)]
        format: Option<RecordingFormat>,
        #[arg(long, value_enum, default_value_t = SyncArg::Tick)]
        sync: SyncArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Route,
    Points,
    Heatmap,
}

impl From<ModeArg> for DisplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Route => DisplayMode::Route,
            ModeArg::Points => DisplayMode::Points,
            ModeArg::Heatmap => DisplayMode::Heatmap,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncArg {
    /// One frame per animation step.
    Tick,
    /// One frame per display refresh at the configured frame rate.
    Refresh,
}

impl From<SyncArg> for FrameSync {
    fn from(sync: SyncArg) -> Self {
        match sync {
            SyncArg::Tick => FrameSync::AnimationTick,
            SyncArg::Refresh => FrameSync::DisplayRefresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_decoder_follows_the_extension() {
        let json = br#"[{"position_lat": 1.0, "position_long": 2.0}]"#;
        assert_eq!(route_decoder(Path::new("ride.json")).parse(json).unwrap().len(), 1);
        assert_eq!(route_decoder(Path::new("ride")).parse(json).unwrap().len(), 1);
        assert!(route_decoder(Path::new("ride.fit")).parse(json).is_err());
        assert!(route_decoder(Path::new("ride.FIT")).parse(json).is_err());
    }

    #[test]
    fn photo_sources_mix_json_images_and_directories() {
        let root = tempfile::tempdir().unwrap();
        let listed = root.path().join("photos.json");
        let meta = PhotoMetadata {
            file_name: "a.jpg".into(),
            ..Default::default()
        };
        std::fs::write(&listed, serde_json::to_vec(&[meta]).unwrap()).unwrap();

        let album = root.path().join("album");
        std::fs::create_dir(&album).unwrap();
        std::fs::write(album.join("broken.jpg"), b"no exif here").unwrap();
        std::fs::write(album.join("notes.txt"), b"ignored").unwrap();

        let photos = read_photos(&[listed, album, root.path().join("missing.jpg")]).unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].file_name, "a.jpg");
    }

    #[test]
    fn photo_extensions_are_case_insensitive() {
        assert!(is_photo(Path::new("IMG_0001.JPG")));
        assert!(is_photo(Path::new("scan.tiff")));
        assert!(!is_photo(Path::new("photos.json")));
        assert!(!is_photo(Path::new("README")));
    }
}
