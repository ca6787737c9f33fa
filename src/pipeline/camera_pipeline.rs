// src/pipeline/camera_pipeline.rs
//
// Per-camera orchestration. One pipeline owns one tracker, one zone
// engine and one behavior engine, and runs them in a fixed order every
// decoded frame — tracking first, since both engines key their state on
// the identities it assigns. Cameras are fully independent: the host
// constructs one pipeline per stream and confines it to one execution
// context; there is no cross-camera shared state and no global instance.

use tracing::debug;

use crate::analytics::{
    BehaviorConfig, BehaviorEngine, Clock, IouTracker, Tracker, TrackerConfig, ZoneConfigError,
    ZoneEngine, ZoneEngineConfig,
};
use crate::pipeline::metrics::PipelineMetrics;
use crate::types::{AlertEvent, Detection, Zone};

pub struct CameraPipeline {
    camera_id: String,
    tracker: Box<dyn Tracker>,
    zone_engine: ZoneEngine,
    behavior_engine: BehaviorEngine,
    clock: Box<dyn Clock>,
    metrics: PipelineMetrics,
}

impl CameraPipeline {
    pub fn new(
        camera_id: impl Into<String>,
        tracker_config: TrackerConfig,
        zone_config: ZoneEngineConfig,
        behavior_config: BehaviorConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            tracker: Box::new(IouTracker::new(tracker_config)),
            zone_engine: ZoneEngine::new(zone_config),
            behavior_engine: BehaviorEngine::new(behavior_config),
            clock,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Replace this camera's zones atomically. Rejected as a whole on any
    /// invalid zone; the previous configuration stays in effect.
    pub fn configure_zones(&mut self, zones: Vec<Zone>) -> Result<(), ZoneConfigError> {
        self.zone_engine.configure(zones)
    }

    /// Process one decoded frame's detections. Called exactly once per
    /// frame, from a single execution context.
    pub fn process_frame(&mut self, detections: &[Detection]) -> Vec<AlertEvent> {
        let now = self.clock.now();

        let tracked = self.tracker.update(detections, now);

        self.metrics.inc(&self.metrics.total_frames);
        self.metrics
            .add(&self.metrics.total_detections, detections.len() as u64);
        self.metrics
            .add(&self.metrics.tracked_emitted, tracked.len() as u64);
        let ghosts = tracked.iter().filter(|t| t.is_disappeared).count();
        self.metrics.add(&self.metrics.ghost_emitted, ghosts as u64);

        let mut alerts = self.zone_engine.update(&tracked, now);
        alerts.extend(self.behavior_engine.update(&tracked, now));

        for alert in &alerts {
            self.metrics.count_alert(alert.kind);
        }
        if !alerts.is_empty() {
            debug!(
                "camera {}: frame produced {} alert(s)",
                self.camera_id,
                alerts.len()
            );
        }
        alerts
    }
}
