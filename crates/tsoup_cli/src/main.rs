//! tsoup - render a triangle soup through its BVH.
//!
//! Loads a `.obj` or trisrc file, builds the hierarchy and rope tables,
//! optionally dumps the packed scene arrays as JSON, and writes a PNG.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tsoup_core::{BuildConfig, LoadOptions};
use tsoup_renderer::{render, RenderConfig, SceneShaderData, World, DEFAULT_ROW_WIDTH};

#[derive(Parser)]
#[command(name = "tsoup")]
#[command(about = "Build a BVH over a triangle soup and render it", long_about = None)]
struct Cli {
    /// Scene file (.obj, or trisrc text for any other extension)
    scene: PathBuf,

    /// Output PNG
    #[arg(short, long, default_value = "out.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 40.0)]
    fov: f32,

    /// Render worker threads
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// BVH build settings as JSON (defaults and BVH_*/SAH_* environment
    /// variables otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entries per row of the packed scene arrays
    #[arg(long, default_value_t = DEFAULT_ROW_WIDTH)]
    row_width: u32,

    /// Write the packed scene arrays to this JSON file
    #[arg(long)]
    dump_scene: Option<PathBuf>,

    /// Trace with the rope tables instead of the traversal stack
    #[arg(long)]
    stackless: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let load_options = LoadOptions::from_env().context("Invalid loader settings")?;
    let build_config = match &cli.config {
        Some(path) => BuildConfig::from_json_file(path)
            .with_context(|| format!("Failed to read build config {}", path.display()))?,
        None => BuildConfig::from_env().context("Invalid BVH settings")?,
    };
    log::info!("Build config: {:?}", build_config);

    let world = World::load(&cli.scene, &load_options, &build_config)
        .with_context(|| format!("Failed to prepare scene {}", cli.scene.display()))?;
    world.stats().log_summary();

    if let Some(path) = &cli.dump_scene {
        dump_scene(&world, cli.row_width, path)?;
    }

    let render_config = RenderConfig {
        width: cli.width,
        height: cli.height,
        threads: cli.threads,
        vfov: cli.fov,
        stackless: cli.stackless,
        ..Default::default()
    };
    let image = render(&world, &render_config).context("Render failed")?;

    image
        .save_png(&cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    log::info!("Wrote {}", cli.output.display());

    Ok(())
}

fn dump_scene(world: &World, row_width: u32, path: &Path) -> Result<()> {
    anyhow::ensure!(row_width > 0, "--row-width must be positive");

    let data = SceneShaderData::pack(world, row_width);
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &data)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Dumped packed scene to {}", path.display());
    Ok(())
}
