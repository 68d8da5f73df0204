//! Binary entrypoint for the image viewer.
//!
//! Reads commands from stdin and drives the library's cache, view and
//! refresh worker. With `--export` it edits and writes one image, then exits.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rust_image_viewer::cache::ImageCache;
use rust_image_viewer::config::Configuration;
use rust_image_viewer::events::{InputEvent, dispatch};
use rust_image_viewer::export::{ExportFormat, export};
use rust_image_viewer::gpu::TextureBackend;
use rust_image_viewer::tasks::refresh::{RefreshWorker, refresh_once};
use rust_image_viewer::view::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Bmp,
    Jpeg,
}

#[derive(Debug, Parser)]
#[command(name = "image-viewer", version, about = "Browse and lightly edit a directory of images")]
struct Args {
    /// Image to open; its siblings form the collection
    #[arg(value_name = "IMAGE")]
    path: PathBuf,
    /// Path to YAML config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Export the edited image to this path and exit
    #[arg(long, value_name = "OUT")]
    export: Option<PathBuf>,
    /// Export container
    #[arg(long, value_enum, default_value = "png")]
    format: FormatArg,
    /// JPEG quality (1-100); defaults to export.jpeg-quality
    #[arg(long, value_name = "N")]
    quality: Option<u8>,
    /// Quarter turns, positive clockwise
    #[arg(long, value_name = "STEPS", allow_hyphen_values = true, default_value_t = 0)]
    rotate: i32,
    #[arg(long)]
    flip_x: bool,
    #[arg(long)]
    flip_y: bool,
    #[arg(long, value_name = "FACTOR")]
    contrast: Option<f32>,
    #[arg(long, value_name = "FACTOR")]
    saturation: Option<f32>,
    #[arg(long, value_name = "DEGREES", allow_hyphen_values = true)]
    hue: Option<f32>,
    /// Viewport size used when reporting the on-screen quad
    #[arg(long, value_name = "WxH", default_value = "1280x720", value_parser = parse_viewport)]
    viewport: (u32, u32),
}

fn parse_viewport(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got `{raw}`"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(format!("rust_image_viewer={level}").parse()?)
        .add_directive(format!("image_viewer={level}").parse()?)
        .add_directive("wgpu=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)?,
        None => Configuration::default(),
    }
    .validated()
    .context("validating configuration")?;
    info!(backend = %cfg.texture_backend, radius = cfg.window_radius, "starting");

    let cache = Arc::new(ImageCache::new(cfg.build_texture_backend(), cfg.cache_options()));
    cache.set_path(&args.path);

    let result = match args.export.clone() {
        Some(out) => export_once(&*cache, &args, &cfg, &out),
        None => interactive(Arc::clone(&cache), &args, &cfg).await,
    };
    cache.clear();
    result
}

fn format_for(arg: FormatArg, quality: u8) -> ExportFormat {
    match arg {
        FormatArg::Png => ExportFormat::Png,
        FormatArg::Bmp => ExportFormat::Bmp,
        FormatArg::Jpeg => ExportFormat::Jpeg { quality },
    }
}

fn export_once<B: TextureBackend>(
    cache: &ImageCache<B>,
    args: &Args,
    cfg: &Configuration,
    out: &Path,
) -> Result<()> {
    refresh_once(cache);
    if cache.selected_index().is_none() {
        bail!("no image found at {}", args.path.display());
    }

    for _ in 0..args.rotate.unsigned_abs() % 4 {
        cache.rotate_current(args.rotate.signum());
    }
    if args.flip_x {
        cache.flip_current_x();
    }
    if args.flip_y {
        cache.flip_current_y();
    }
    if let Some(v) = args.contrast {
        cache.set_contrast(v);
    }
    if let Some(v) = args.saturation {
        cache.set_saturation(v);
    }
    if let Some(v) = args.hue {
        cache.set_hue(v);
    }

    let entry = cache.selected().context("selection vanished before export")?;
    let format = format_for(args.format, args.quality.unwrap_or(cfg.export.jpeg_quality));
    let written = export(&entry, Some(out), format)
        .with_context(|| format!("exporting {}", entry.path().display()))?;
    println!("{}", written.display());
    Ok(())
}

/// Lines understood by the interactive loop in addition to [`InputEvent`]s.
#[derive(Debug)]
enum Command {
    Input(InputEvent),
    Status,
    List,
    Export {
        out: Option<PathBuf>,
        format: Option<ExportFormat>,
    },
    Quit,
}

fn parse_command(line: &str, default_quality: u8) -> Result<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next() {
        Some("status") => Command::Status,
        Some("list") => Command::List,
        Some("quit") | Some("exit") => Command::Quit,
        Some("export") => {
            let out = words.next().map(PathBuf::from);
            let quality = match words.clone().nth(1) {
                Some(q) => q.parse().context("quality must be a number")?,
                None => default_quality,
            };
            let format = match words.next() {
                Some(name) => Some(
                    ExportFormat::parse(name, quality)
                        .with_context(|| format!("unknown format `{name}`"))?,
                ),
                None => None,
            };
            Command::Export { out, format }
        }
        _ => Command::Input(line.parse()?),
    };
    Ok(command)
}

async fn interactive<B>(cache: Arc<ImageCache<B>>, args: &Args, cfg: &Configuration) -> Result<()>
where
    B: TextureBackend + 'static,
{
    let worker = RefreshWorker::spawn(Arc::clone(&cache), cfg.poll_interval);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // kept off the blocking pool: runtime shutdown waits on that pool, and a
    // read parked on stdin never returns
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                }
            }
            info!("stdin closed");
        })
        .context("spawning stdin reader")?;

    let mut view = ViewState::new(cfg.zoom);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_command(line, cfg.export.jpeg_quality) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Input(event)) => dispatch(event, &cache, &mut view),
                    Ok(Command::Status) => print_status(&cache, &view, args.viewport),
                    Ok(Command::List) => print_list(&cache),
                    Ok(Command::Export { out, format }) => {
                        let format = format.unwrap_or(format_for(
                            args.format,
                            args.quality.unwrap_or(cfg.export.jpeg_quality),
                        ));
                        match cache.selected() {
                            Some(entry) => match export(&entry, out.as_deref(), format) {
                                Ok(path) => println!("exported {}", path.display()),
                                Err(err) => println!("export failed: {err}"),
                            },
                            None => println!("nothing selected"),
                        }
                    }
                    Err(err) => println!("{err:#}"),
                }
            }
        }
    }

    worker.shutdown().await.context("stopping refresh worker")?;
    info!("refresh worker stopped");
    Ok(())
}

fn print_status<B: TextureBackend>(cache: &ImageCache<B>, view: &ViewState, viewport: (u32, u32)) {
    let Some(overview) = cache.overview() else {
        println!("busy");
        return;
    };
    let Some(entry) = cache.current() else {
        println!("no image ({} entries)", overview.len);
        return;
    };
    let index = overview.selection.map_or(0, |i| i + 1);
    println!("[{index}/{}] {}", overview.len, entry.path().display());
    match entry.display_size() {
        Some((w, h)) => {
            println!("  resident {w}x{h}");
            println!("  quad {:?}", view.screen_quad(viewport, (w, h)));
        }
        None => println!("  not resident"),
    }
    println!(
        "  quadrant {} flip-x {} flip-y {} corners {:?}",
        entry.orientation.quadrant(),
        entry.orientation.flip_x,
        entry.orientation.flip_y,
        entry.corners()
    );
    println!(
        "  contrast {:.2} saturation {:.2} hue {:.0}",
        entry.modifiers.contrast(),
        entry.modifiers.saturation(),
        entry.modifiers.hue()
    );
    println!(
        "  zoom {:.3} pan {:?} angle {:.1}",
        view.zoom(),
        view.translation(),
        view.angle().to_degrees()
    );
}

fn print_list<B: TextureBackend>(cache: &ImageCache<B>) {
    let selection = cache.selected_index();
    for (i, entry) in cache.entries().iter().enumerate() {
        let marker = if Some(i) == selection { '>' } else { ' ' };
        let resident = if entry.is_loaded() { '*' } else { ' ' };
        println!("{marker}{resident} {i:>4} {}", entry.path().display());
    }
}
