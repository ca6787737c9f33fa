// src/pipeline/metrics.rs
//
// Production observability. Per-camera counters for every subsystem,
// exported via logs at end of run or scraped by the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::types::AlertKind;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub total_detections: Arc<AtomicU64>,
    pub tracked_emitted: Arc<AtomicU64>,
    pub ghost_emitted: Arc<AtomicU64>,
    pub zone_entries: Arc<AtomicU64>,
    pub zone_dwells: Arc<AtomicU64>,
    pub zone_proximities: Arc<AtomicU64>,
    pub falls: Arc<AtomicU64>,
    pub running_alerts: Arc<AtomicU64>,
    pub walking_alerts: Arc<AtomicU64>,
    pub long_idles: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            total_detections: Arc::new(AtomicU64::new(0)),
            tracked_emitted: Arc::new(AtomicU64::new(0)),
            ghost_emitted: Arc::new(AtomicU64::new(0)),
            zone_entries: Arc::new(AtomicU64::new(0)),
            zone_dwells: Arc::new(AtomicU64::new(0)),
            zone_proximities: Arc::new(AtomicU64::new(0)),
            falls: Arc::new(AtomicU64::new(0)),
            running_alerts: Arc::new(AtomicU64::new(0)),
            walking_alerts: Arc::new(AtomicU64::new(0)),
            long_idles: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count_alert(&self, kind: AlertKind) {
        let counter = match kind {
            AlertKind::DangerZoneEntry => &self.zone_entries,
            AlertKind::DangerZoneDwell => &self.zone_dwells,
            AlertKind::DangerZoneProximity => &self.zone_proximities,
            AlertKind::FallDown => &self.falls,
            AlertKind::Running => &self.running_alerts,
            AlertKind::WalkingActive => &self.walking_alerts,
            AlertKind::LongIdle => &self.long_idles,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            total_detections: self.total_detections.load(Ordering::Relaxed),
            tracked_emitted: self.tracked_emitted.load(Ordering::Relaxed),
            ghost_emitted: self.ghost_emitted.load(Ordering::Relaxed),
            zone_entries: self.zone_entries.load(Ordering::Relaxed),
            zone_dwells: self.zone_dwells.load(Ordering::Relaxed),
            zone_proximities: self.zone_proximities.load(Ordering::Relaxed),
            falls: self.falls.load(Ordering::Relaxed),
            running_alerts: self.running_alerts.load(Ordering::Relaxed),
            walking_alerts: self.walking_alerts.load(Ordering::Relaxed),
            long_idles: self.long_idles.load(Ordering::Relaxed),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub total_detections: u64,
    pub tracked_emitted: u64,
    pub ghost_emitted: u64,
    pub zone_entries: u64,
    pub zone_dwells: u64,
    pub zone_proximities: u64,
    pub falls: u64,
    pub running_alerts: u64,
    pub walking_alerts: u64,
    pub long_idles: u64,
    pub fps: f64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_counting_by_kind() {
        let metrics = PipelineMetrics::new();
        metrics.count_alert(AlertKind::FallDown);
        metrics.count_alert(AlertKind::FallDown);
        metrics.count_alert(AlertKind::DangerZoneEntry);

        let summary = metrics.summary();
        assert_eq!(summary.falls, 2);
        assert_eq!(summary.zone_entries, 1);
        assert_eq!(summary.long_idles, 0);
    }
}
