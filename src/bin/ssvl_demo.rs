//! ssvl_demo - end-to-end synthetic run of the stereo depth pipeline

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::cell::Cell;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use ssvl::report::map_digest;
use ssvl::ui::Ui;
use ssvl::{
    feed_pair, process_pair, CameraSide, ComparerRegistry, GridView, IntensityView, MapStats,
    RigGeometry, Session, StereoPair, SyntheticConfig, SyntheticStereoSource, DEFAULT_COMPARER,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic pairs to stream.
    #[arg(long, default_value_t = 3)]
    pairs: u64,
    #[arg(long, default_value_t = 256)]
    width: u32,
    #[arg(long, default_value_t = 256)]
    height: u32,
    #[arg(long, default_value_t = 4)]
    block_size: u32,
    #[arg(long, default_value_t = 10.0)]
    baseline_mm: f32,
    #[arg(long, default_value_t = 70.0)]
    fov_degrees: f32,
    /// Background disparity of the synthetic scene, in pixels.
    #[arg(long, default_value_t = 8)]
    disparity: u32,
    /// Disparity of a centred foreground square.
    #[arg(long)]
    foreground_disparity: Option<u32>,
    /// Block comparer name (sad|ssd).
    #[arg(long, default_value = DEFAULT_COMPARER)]
    comparer: String,
    /// Bytes per feed call.
    #[arg(long, default_value_t = 4096)]
    chunk_bytes: usize,
    /// Deterministic seed for the synthetic scene.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Output directory for summary.json.
    #[arg(long, default_value = "ssvl_demo_out")]
    out: String,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Serialize)]
struct Summary<'a> {
    rig: RigGeometry,
    comparer: &'a str,
    pairs_processed: u64,
    expected_disparity_px: u32,
    mean_intensity: [f32; 2],
    disparity: Option<MapStats>,
    depth: Option<MapStats>,
    depth_digest: String,
    deterministic: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.pairs == 0 {
        return Err(anyhow!("pairs must be >= 1"));
    }
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let rig = RigGeometry::new(
        args.width,
        args.height,
        args.block_size,
        args.baseline_mm,
        args.fov_degrees,
    )?;
    let comparer = ComparerRegistry::with_builtin().resolve(&args.comparer)?;

    let mean_intensity = Cell::new([0.0f32; 2]);
    let disparity_stats = Cell::new(None::<MapStats>);
    let depth_stats = Cell::new(None::<MapStats>);

    let mut session = {
        let _stage = ui.stage("Create session");
        let mut session = Session::with_geometry(rig, true);
        session.set_comparer(Box::new(comparer.clone()));
        session.on_intensity(|side: CameraSide, frame: IntensityView<'_>| {
            let mut means = mean_intensity.get();
            means[side as usize] = mean_of(&frame);
            mean_intensity.set(means);
        });
        session.on_disparity(|grid: GridView<'_>| {
            disparity_stats.set(Some(MapStats::from_grid(&grid, None)));
        });
        session.on_depth(|grid: GridView<'_>, max_depth: f32| {
            depth_stats.set(Some(MapStats::from_grid(&grid, Some(max_depth))));
        });
        session
    };

    let mut source = SyntheticStereoSource::new(SyntheticConfig {
        width: args.width,
        height: args.height,
        disparity_px: args.disparity,
        foreground_disparity_px: args.foreground_disparity,
        seed: Some(args.seed),
    })?;

    let mut first_pair: Option<StereoPair> = None;
    {
        let _stage = ui.stage("Stream synthetic pairs");
        let mut progress = ui.pairs(args.pairs);
        for _ in 0..args.pairs {
            let pair = source.next_pair()?;
            if !feed_pair(&mut session, &pair, args.chunk_bytes)? {
                return Err(anyhow!("pair was not processed"));
            }
            let mean = depth_stats.get().map(|s| s.mean).unwrap_or_default();
            progress.inc(&format!("mean depth {:.2} mm", mean));
            first_pair.get_or_insert(pair);
        }
        progress.finish();
    }

    let depth_digest = session
        .depth_map()
        .map(|grid| map_digest(&grid))
        .ok_or_else(|| anyhow!("session has no depth buffer"))?;

    let deterministic = {
        let _stage = ui.stage("Check determinism");
        let pair = first_pair.ok_or_else(|| anyhow!("no pair generated"))?;
        let a = digest_for(rig, &comparer, &pair)?;
        let b = digest_for(rig, &comparer, &pair)?;
        a == b
    };

    let summary = Summary {
        rig,
        comparer: session.comparer_name(),
        pairs_processed: session.pairs_processed(),
        expected_disparity_px: args.disparity,
        mean_intensity: mean_intensity.get(),
        disparity: disparity_stats.get(),
        depth: depth_stats.get(),
        depth_digest,
        deterministic,
    };
    let summary_path = out_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_vec_pretty(&summary)?)
        .with_context(|| format!("writing summary to {}", summary_path.display()))?;

    println!("ssvl_demo summary:");
    println!(
        "  rig: {}x{} block {} -> {}x{} grid",
        rig.width(),
        rig.height(),
        rig.block_size(),
        rig.depth_width(),
        rig.depth_height()
    );
    println!(
        "  focal: {:.3} px, max depth: {:.3} mm",
        rig.focal_length_pixels(),
        rig.max_depth_mm()
    );
    println!("  comparer: {}", summary.comparer);
    println!("  pairs processed: {}", summary.pairs_processed);
    println!(
        "  mean intensity: left {:.1}, right {:.1}",
        summary.mean_intensity[0], summary.mean_intensity[1]
    );
    if let Some(stats) = summary.disparity {
        println!(
            "  disparity: min {} max {} mean {:.2} (scene {} px)",
            stats.min, stats.max, stats.mean, args.disparity
        );
    }
    if let Some(stats) = summary.depth {
        println!(
            "  depth: min {:.3} max {:.3} mean {:.3} mm, coverage {:.1}%",
            stats.min,
            stats.max,
            stats.mean,
            stats.coverage() * 100.0
        );
    }
    println!("  depth digest: {}", summary.depth_digest);
    println!(
        "  deterministic: {}",
        if deterministic { "OK" } else { "FAIL" }
    );
    println!("  summary: {}", summary_path.display());

    session.release();
    if !deterministic {
        return Err(anyhow!("repeated runs produced different depth maps"));
    }
    Ok(())
}

fn mean_of(frame: &IntensityView<'_>) -> f32 {
    let count = frame.width() * frame.height();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = frame.samples().map(u64::from).sum();
    (sum as f64 / count as f64) as f32
}

fn digest_for(
    rig: RigGeometry,
    comparer: &std::sync::Arc<dyn ssvl::BlockComparer + Send + Sync>,
    pair: &StereoPair,
) -> Result<String> {
    let mut session = Session::with_geometry(rig, true);
    session.set_comparer(Box::new(comparer.clone()));
    process_pair(&mut session, &pair.left, &pair.right)?;
    session
        .depth_map()
        .map(|grid| map_digest(&grid))
        .ok_or_else(|| anyhow!("session has no depth buffer"))
}
