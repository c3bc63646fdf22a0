//! ssvld - stereo depth daemon
//!
//! This daemon:
//! 1. Loads rig and source settings (SSVL_CONFIG file + SSVL_* overrides)
//! 2. Pulls frame pairs from the configured source at the target rate
//! 3. Streams each pair into the session in fixed-size chunks
//! 4. Logs depth statistics and source health periodically
//! 5. Stops cleanly on Ctrl-C

use anyhow::{anyhow, Result};
use clap::Parser;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use ssvl::config::SsvlConfig;
use ssvl::ingest::StereoSource;
use ssvl::{feed_pair, MapStats, Session};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "ssvld", about = "Stream stereo pairs through the depth pipeline")]
struct Args {
    /// Stop after this many processed pairs instead of waiting for Ctrl-C.
    #[arg(long)]
    max_pairs: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = SsvlConfig::load()?;
    let rig = cfg.geometry()?;
    let mut session = Session::with_geometry(rig, true);
    session.set_comparer(cfg.comparer()?);

    let latest_coverage = Rc::new(Cell::new(0.0f32));
    let coverage = Rc::clone(&latest_coverage);
    session.on_depth(move |grid: ssvl::GridView<'_>, max_depth: f32| {
        coverage.set(MapStats::from_grid(&grid, Some(max_depth)).coverage());
    });

    let mut source = StereoSource::new(cfg.source_config())?;
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.source.target_fps));

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "ssvld running. source={} rig={}x{} block={} comparer={} fps={}",
        cfg.source.url,
        rig.width(),
        rig.height(),
        rig.block_size(),
        session.comparer_name(),
        cfg.source.target_fps
    );
    log::info!(
        "focal={:.3}px max_depth={:.3}mm chunk={} bytes",
        rig.focal_length_pixels(),
        rig.max_depth_mm(),
        cfg.source.chunk_bytes
    );

    let mut last_health_log = Instant::now();
    let mut rejected_pairs = 0u64;

    loop {
        if rx.try_recv().is_ok() {
            log::info!("shutdown signal received, stopping");
            break;
        }
        let tick = Instant::now();

        let pair = source.next_pair()?;
        match feed_pair(&mut session, &pair, cfg.source.chunk_bytes) {
            Ok(true) => {}
            Ok(false) => log::warn!("pair did not complete; fill counters carried over"),
            Err(e) => {
                rejected_pairs += 1;
                log::warn!("pair rejected: {}", e);
                session.clear_status();
            }
        }

        if let Some(max_pairs) = args.max_pairs {
            if session.pairs_processed() >= max_pairs {
                log::info!("processed {} pairs, stopping", max_pairs);
                break;
            }
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            let stats = session
                .depth_map()
                .map(|grid| MapStats::from_grid(&grid, Some(rig.max_depth_mm())));
            log::info!(
                "pairs={} produced={} rejected={} status={} coverage={:.1}%",
                session.pairs_processed(),
                source.pairs_produced(),
                rejected_pairs,
                session.status(),
                latest_coverage.get() * 100.0
            );
            if let Some(stats) = stats {
                log::info!(
                    "depth min={:.3}mm max={:.3}mm mean={:.3}mm",
                    stats.min,
                    stats.max,
                    stats.mean
                );
            }
            last_health_log = Instant::now();
        }

        if let Some(wait) = frame_interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(wait);
        }
    }

    session.release();
    Ok(())
}
