//! depth_from_pair - depth map from a stereo image pair on disk
//!
//! Loads a left/right image pair, runs one pass of the pipeline and writes
//! `disparity.png`, `depth.png` and `summary.json` to the output directory.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use ssvl::ingest::ImagePairSource;
use ssvl::report::{map_digest, render_depth, render_disparity};
use ssvl::ui::Ui;
use ssvl::{
    process_pair, ComparerRegistry, GridView, MapStats, RigGeometry, Session, DEFAULT_COMPARER,
};

#[derive(Parser, Debug)]
#[command(name = "depth_from_pair", about = "Compute a block-matching depth map from an image pair")]
struct Args {
    /// Left camera image (PNG or JPEG)
    #[arg(long)]
    left: PathBuf,
    /// Right camera image (PNG or JPEG)
    #[arg(long)]
    right: PathBuf,
    #[arg(long, default_value_t = 4)]
    block_size: u32,
    #[arg(long, default_value_t = 10.0)]
    baseline_mm: f32,
    #[arg(long, default_value_t = 70.0)]
    fov_degrees: f32,
    /// Block comparer name (sad|ssd).
    #[arg(long, default_value = DEFAULT_COMPARER)]
    comparer: String,
    #[arg(long, default_value = "depth_out")]
    out: PathBuf,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Serialize)]
struct Summary {
    left: String,
    right: String,
    rig: RigGeometry,
    comparer: String,
    disparity: MapStats,
    depth: MapStats,
    depth_digest: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let pair = {
        let _stage = ui.stage("Load image pair");
        ImagePairSource::from_paths(args.left.clone(), args.right.clone()).next_pair()?
    };
    let rig = RigGeometry::new(
        pair.width,
        pair.height,
        args.block_size,
        args.baseline_mm,
        args.fov_degrees,
    )
    .context("image size does not fit the block size")?;
    let comparer = ComparerRegistry::with_builtin().resolve(&args.comparer)?;

    let mut disparity_png = None;
    let mut disparity_stats = None;
    let (depth_png, depth_stats, depth_digest) = {
        let _stage = ui.stage("Match blocks + reconstruct depth");
        let mut session = Session::with_geometry(rig, true);
        session.set_comparer(Box::new(comparer));
        session.on_disparity(|grid: GridView<'_>| {
            disparity_png = Some(render_disparity(&grid, rig.width()));
            disparity_stats = Some(MapStats::from_grid(&grid, None));
        });
        process_pair(&mut session, &pair.left, &pair.right)?;
        let grid = session
            .depth_map()
            .ok_or_else(|| anyhow!("session has no depth buffer"))?;
        (
            render_depth(&grid, rig.max_depth_mm()),
            MapStats::from_grid(&grid, Some(rig.max_depth_mm())),
            map_digest(&grid),
        )
    };
    let disparity_png = disparity_png.ok_or_else(|| anyhow!("disparity observer did not run"))?;
    let disparity_stats =
        disparity_stats.ok_or_else(|| anyhow!("disparity observer did not run"))?;

    {
        let _stage = ui.stage("Write outputs");
        fs::create_dir_all(&args.out)
            .with_context(|| format!("creating output directory {}", args.out.display()))?;
        let disparity_path = args.out.join("disparity.png");
        disparity_png
            .save(&disparity_path)
            .with_context(|| format!("writing {}", disparity_path.display()))?;
        let depth_path = args.out.join("depth.png");
        depth_png
            .save(&depth_path)
            .with_context(|| format!("writing {}", depth_path.display()))?;
        let summary = Summary {
            left: args.left.display().to_string(),
            right: args.right.display().to_string(),
            rig,
            comparer: args.comparer.clone(),
            disparity: disparity_stats,
            depth: depth_stats,
            depth_digest: depth_digest.clone(),
        };
        let summary_path = args.out.join("summary.json");
        fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)
            .with_context(|| format!("writing {}", summary_path.display()))?;
    }

    println!(
        "depth_from_pair: {}x{} -> {}x{} grid",
        rig.width(),
        rig.height(),
        rig.depth_width(),
        rig.depth_height()
    );
    println!(
        "  depth: min {:.3} max {:.3} mean {:.3} mm, coverage {:.1}%",
        depth_stats.min,
        depth_stats.max,
        depth_stats.mean,
        depth_stats.coverage() * 100.0
    );
    println!("  depth digest: {}", depth_digest);
    println!("  outputs: {}", args.out.display());
    Ok(())
}
