// src/main.rs

mod analytics;
mod config;
mod pipeline;
mod replay;
mod types;

use std::collections::HashMap;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use analytics::ManualClock;
use config::Config;
use pipeline::{AlertBus, CameraPipeline};

/// Replay recorded per-frame detections through the analytics core and
/// print the alerts it emits, one JSON object per line.
#[derive(Debug, Parser)]
#[command(name = "argus", version, about = "Per-frame video-analytics core")]
struct Args {
    /// Path to the YAML configuration
    #[arg(long, default_value = "config.yaml")]
    config: String,

    /// Path to the JSONL detection log to replay
    #[arg(long)]
    input: String,

    /// Maximum alerts buffered between frames before the oldest is dropped
    #[arg(long, default_value_t = 256)]
    alert_buffer: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("👁️ argus analytics core starting");
    info!(
        "✓ configuration loaded: {} camera(s), iou_threshold={:.2}",
        config.cameras.len(),
        config.tracker.iou_threshold
    );

    let clock = ManualClock::new(0.0);
    let mut pipelines = build_pipelines(&config, &clock)?;

    let frames = replay::read_frames(&args.input)?;
    info!("found {} frame record(s) in {}", frames.len(), args.input);

    let mut bus = AlertBus::new(args.alert_buffer);
    let mut skipped_cameras = 0u64;

    for record in frames {
        let Some(camera) = pipelines.get_mut(&record.camera_id) else {
            skipped_cameras += 1;
            warn!("frame for unconfigured camera '{}', skipped", record.camera_id);
            continue;
        };

        clock.set(record.timestamp);
        for alert in camera.process_frame(&record.detections) {
            bus.publish(alert);
        }
        for alert in bus.drain() {
            println!("{}", serde_json::to_string(&alert)?);
        }
    }

    info!("========================================");
    info!("replay complete");
    for (camera_id, camera) in &pipelines {
        let s = camera.metrics().summary();
        info!("camera {}:", camera_id);
        info!("  frames: {}, detections: {}", s.total_frames, s.total_detections);
        info!("  tracked: {} ({} ghost)", s.tracked_emitted, s.ghost_emitted);
        info!(
            "  🚨 zone alerts: {} entry / {} dwell / {} proximity",
            s.zone_entries, s.zone_dwells, s.zone_proximities
        );
        info!(
            "  🏃 behavior alerts: {} fall / {} running / {} active / {} idle",
            s.falls, s.running_alerts, s.walking_alerts, s.long_idles
        );
    }
    if skipped_cameras > 0 {
        warn!("{} frame(s) referenced unconfigured cameras", skipped_cameras);
    }

    Ok(())
}

/// One pipeline per configured camera, all sharing the replay clock. Live
/// deployments hand each pipeline a SystemClock instead and drive one
/// pipeline per ingestion loop.
fn build_pipelines(
    config: &Config,
    clock: &ManualClock,
) -> Result<HashMap<String, CameraPipeline>> {
    let mut pipelines = HashMap::new();
    for camera in &config.cameras {
        let mut pipeline = CameraPipeline::new(
            camera.camera_id.clone(),
            config.tracker.clone(),
            config.zones.clone(),
            config.behavior.clone(),
            Box::new(clock.clone()),
        );
        if let Err(err) = pipeline.configure_zones(camera.zones.clone()) {
            error!("camera {}: invalid zone config: {}", camera.camera_id, err);
            return Err(err.into());
        }
        pipelines.insert(camera.camera_id.clone(), pipeline);
    }
    Ok(pipelines)
}
