// src/analytics/behavior_engine.rs
//
// Heuristic behavior classification per tracked identity:
//
//   fall      bbox wider than tall past a threshold, sustained; alert
//             re-emitted every qualifying evaluation with duration-scaled
//             confidence (delivery-layer cooldown is external)
//   running / walking_active   EMA-smoothed centroid speed vs thresholds
//   long_idle one alert per idle episode, re-armed by movement
//
// Evaluation priority is strict: a fallen frame suppresses movement-based
// alerts for that frame. Per-track evaluation is throttled so high frame
// rates do not over-count.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{AlertEvent, AlertKind, AlertPosition, TrackedDetection};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Minimum seconds between evaluations of the same track
    pub detection_interval: f64,
    /// width/height above this means the frame reads as fallen
    pub fall_aspect_ratio: f64,
    /// Seconds continuously fallen before the first alert
    pub min_fall_duration: f64,
    /// Smoothed speed at or above this is running (px/s)
    pub running_speed: f64,
    /// Smoothed speed at or above this is active (px/s)
    pub active_speed: f64,
    /// Seconds below the active threshold before a long_idle alert
    pub max_idle_duration: f64,
    /// Seconds a track may go unobserved before its state is purged
    pub stale_track_secs: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            detection_interval: 0.1,
            fall_aspect_ratio: 1.2,
            min_fall_duration: 0.5,
            running_speed: 50.0,
            active_speed: 15.0,
            max_idle_duration: 2.0,
            stale_track_secs: 10.0,
        }
    }
}

/// Per-track motion/posture state. Created on first observation, purged
/// once the track goes stale.
#[derive(Debug, Clone)]
struct BehaviorState {
    last_bbox: [f64; 4],
    last_center: [f64; 2],
    last_timestamp: f64,
    fall_start_time: Option<f64>,
    is_fallen: bool,
    fall_duration: f64,
    moving_avg_speed: f64,
    idle_start_time: Option<f64>,
    reported_idle_alert: bool,
}

impl BehaviorState {
    fn new(det: &TrackedDetection, now: f64) -> Self {
        Self {
            last_bbox: det.bbox,
            last_center: det.center(),
            last_timestamp: now,
            fall_start_time: None,
            is_fallen: false,
            fall_duration: 0.0,
            moving_avg_speed: 0.0,
            idle_start_time: None,
            reported_idle_alert: false,
        }
    }
}

pub struct BehaviorEngine {
    config: BehaviorConfig,
    states: HashMap<String, BehaviorState>,
}

impl BehaviorEngine {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Evaluate one frame of tracked detections. Runs once per frame, after
    /// tracking.
    pub fn update(&mut self, tracked: &[TrackedDetection], now: f64) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        for det in tracked {
            let Some(state) = self.states.get_mut(&det.tracking_id) else {
                // First observation: motion needs a previous frame
                self.states
                    .insert(det.tracking_id.clone(), BehaviorState::new(det, now));
                continue;
            };

            let dt = now - state.last_timestamp;
            if dt < self.config.detection_interval {
                continue;
            }

            let width = det.bbox[2] - det.bbox[0];
            let height = det.bbox[3] - det.bbox[1];
            let aspect = if height > 0.0 { width / height } else { 0.0 };

            // ── Fall detection ──
            let fallen_now = aspect > self.config.fall_aspect_ratio;
            if fallen_now {
                if !state.is_fallen {
                    state.is_fallen = true;
                    state.fall_start_time = Some(now);
                    state.fall_duration = 0.0;
                    debug!("track {} fall posture started", det.tracking_id);
                }
                if let Some(start) = state.fall_start_time {
                    state.fall_duration = now - start;
                }
                if state.fall_duration >= self.config.min_fall_duration {
                    let confidence = (0.7 + state.fall_duration * 0.1).min(1.0);
                    info!(
                        "🚑 track {} fallen for {:.1}s (conf {:.2})",
                        det.tracking_id, state.fall_duration, confidence
                    );
                    alerts.push(AlertEvent {
                        kind: AlertKind::FallDown,
                        tracking_id: det.tracking_id.clone(),
                        zone_id: None,
                        message: format!("person down for {:.1}s", state.fall_duration),
                        confidence,
                        position: AlertPosition::Bbox(det.bbox),
                        timestamp: now,
                    });
                }
            } else if state.is_fallen {
                state.is_fallen = false;
                state.fall_start_time = None;
                state.fall_duration = 0.0;
                debug!(
                    "track {} back upright (was {:.0}x{:.0})",
                    det.tracking_id,
                    state.last_bbox[2] - state.last_bbox[0],
                    state.last_bbox[3] - state.last_bbox[1]
                );
            }

            // ── Movement classification ──
            // Speed keeps smoothing on fallen frames; only the alerts are
            // suppressed by the fall.
            let center = det.center();
            let instant_speed = {
                let dx = center[0] - state.last_center[0];
                let dy = center[1] - state.last_center[1];
                (dx * dx + dy * dy).sqrt() / dt
            };
            state.moving_avg_speed = 0.8 * state.moving_avg_speed + 0.2 * instant_speed;

            if state.moving_avg_speed >= self.config.running_speed {
                state.idle_start_time = None;
                state.reported_idle_alert = false;
                if !fallen_now {
                    alerts.push(AlertEvent {
                        kind: AlertKind::Running,
                        tracking_id: det.tracking_id.clone(),
                        zone_id: None,
                        message: format!("running at {:.0} px/s", state.moving_avg_speed),
                        confidence: 1.0,
                        position: AlertPosition::Bbox(det.bbox),
                        timestamp: now,
                    });
                }
            } else if state.moving_avg_speed >= self.config.active_speed {
                state.idle_start_time = None;
                state.reported_idle_alert = false;
                if !fallen_now {
                    alerts.push(AlertEvent {
                        kind: AlertKind::WalkingActive,
                        tracking_id: det.tracking_id.clone(),
                        zone_id: None,
                        message: format!("active at {:.0} px/s", state.moving_avg_speed),
                        confidence: 1.0,
                        position: AlertPosition::Bbox(det.bbox),
                        timestamp: now,
                    });
                }
            } else {
                let idle_start = *state.idle_start_time.get_or_insert(now);
                let idle_duration = now - idle_start;
                if idle_duration >= self.config.max_idle_duration
                    && !state.reported_idle_alert
                    && !fallen_now
                {
                    state.reported_idle_alert = true;
                    info!(
                        "💤 track {} idle for {:.1}s",
                        det.tracking_id, idle_duration
                    );
                    alerts.push(AlertEvent {
                        kind: AlertKind::LongIdle,
                        tracking_id: det.tracking_id.clone(),
                        zone_id: None,
                        message: format!("idle for {:.1}s", idle_duration),
                        confidence: 1.0,
                        position: AlertPosition::Bbox(det.bbox),
                        timestamp: now,
                    });
                }
            }

            state.last_bbox = det.bbox;
            state.last_center = center;
            state.last_timestamp = now;
        }

        self.sweep_stale(now);
        alerts
    }

    /// Mandatory per-frame maintenance: drop state for tracks not observed
    /// within the stale window.
    fn sweep_stale(&mut self, now: f64) {
        let stale = self.config.stale_track_secs;
        let before = self.states.len();
        self.states
            .retain(|_, state| now - state.last_timestamp <= stale);
        let purged = before - self.states.len();
        if purged > 0 {
            debug!("purged behavior state for {} stale track(s)", purged);
        }
    }

    #[cfg(test)]
    fn state_count(&self) -> usize {
        self.states.len()
    }
}
