// src/analytics/zone_engine.rs
//
// Danger-zone evaluation. Consumes identity-bearing detections and a
// per-camera zone configuration; keeps a small state machine per
// (track, zone) pair:
//
//   OUTSIDE → INSIDE   entry alert, entry_time recorded, flags cleared
//   INSIDE  → OUTSIDE  no alert, entry_time and flags cleared
//   while INSIDE       one dwell alert per session once past the threshold
//   while OUTSIDE      proximity alert when within the radius, re-armed
//                      on a cooldown so a persistent loiterer is re-reported
//                      at a bounded rate
//
// State for tracks unseen past the stale window is purged inline during
// update — there are no background timers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::geometry::{bottom_center, point_in_polygon, point_to_polygon_distance};
use crate::types::{AlertEvent, AlertKind, AlertPosition, TrackedDetection, Zone};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneEngineConfig {
    /// Seconds a track may go unobserved before its zone states are purged
    pub stale_track_secs: f64,
    /// Cooldown before a proximity alert re-arms for the same (track, zone)
    pub proximity_realert_secs: f64,
}

impl Default for ZoneEngineConfig {
    fn default() -> Self {
        Self {
            stale_track_secs: 30.0,
            proximity_realert_secs: 30.0,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ZoneConfigError {
    #[error("zone '{zone_id}': polygon has {vertices} vertices, at least 3 required")]
    DegeneratePolygon { zone_id: String, vertices: usize },

    #[error("zone '{zone_id}': non-finite coordinate at polygon vertex {index}")]
    NonFiniteVertex { zone_id: String, index: usize },

    #[error("zone '{zone_id}': {field} must be >= 0, got {value}")]
    NegativeThreshold {
        zone_id: String,
        field: &'static str,
        value: f64,
    },
}

/// Per-(track, zone) membership state. Created lazily on first evaluation,
/// reset on entry and exit, purged when the owning track goes stale.
#[derive(Debug, Clone, Default)]
struct TrackZoneState {
    inside: bool,
    entry_time: Option<f64>,
    distance: f64,
    /// Last trigger time per alert kind for the current session
    alert_flags: HashMap<AlertKind, f64>,
}

pub struct ZoneEngine {
    config: ZoneEngineConfig,
    zones: Vec<Zone>,
    states: HashMap<(String, String), TrackZoneState>,
    /// Last time each track was observed, for the stale sweep
    last_seen: HashMap<String, f64>,
}

impl ZoneEngine {
    pub fn new(config: ZoneEngineConfig) -> Self {
        Self {
            config,
            zones: Vec::new(),
            states: HashMap::new(),
            last_seen: HashMap::new(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Last measured boundary distance for a (track, zone) pair. 0 while
    /// the track is inside. For overlay and debugging surfaces.
    pub fn last_distance(&self, track_id: &str, zone_id: &str) -> Option<f64> {
        self.states
            .get(&(track_id.to_string(), zone_id.to_string()))
            .map(|s| s.distance)
    }

    /// Replace all zones for this camera atomically. If any zone fails
    /// validation the whole call is rejected and the previous configuration
    /// stays in effect.
    pub fn configure(&mut self, zones: Vec<Zone>) -> Result<(), ZoneConfigError> {
        for zone in &zones {
            if zone.polygon.len() < 3 {
                return Err(ZoneConfigError::DegeneratePolygon {
                    zone_id: zone.zone_id.clone(),
                    vertices: zone.polygon.len(),
                });
            }
            for (index, v) in zone.polygon.iter().enumerate() {
                if !v[0].is_finite() || !v[1].is_finite() {
                    return Err(ZoneConfigError::NonFiniteVertex {
                        zone_id: zone.zone_id.clone(),
                        index,
                    });
                }
            }
            if zone.min_distance_threshold < 0.0 {
                return Err(ZoneConfigError::NegativeThreshold {
                    zone_id: zone.zone_id.clone(),
                    field: "min_distance_threshold",
                    value: zone.min_distance_threshold,
                });
            }
            if zone.time_in_area_threshold < 0.0 {
                return Err(ZoneConfigError::NegativeThreshold {
                    zone_id: zone.zone_id.clone(),
                    field: "time_in_area_threshold",
                    value: zone.time_in_area_threshold,
                });
            }
        }

        // Drop session state for zones that no longer exist
        self.states
            .retain(|(_, zone_id), _| zones.iter().any(|z| z.zone_id == *zone_id));

        info!("zone configuration replaced: {} zone(s)", zones.len());
        self.zones = zones;
        Ok(())
    }

    /// Evaluate one frame of tracked detections. Runs once per frame, after
    /// tracking.
    pub fn update(&mut self, tracked: &[TrackedDetection], now: f64) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        for det in tracked {
            self.last_seen.insert(det.tracking_id.clone(), now);

            let point = bottom_center(&det.bbox);
            if !point[0].is_finite() || !point[1].is_finite() {
                warn!(
                    "track {}: non-finite reference point, skipping zone checks",
                    det.tracking_id
                );
                continue;
            }

            for zone in &self.zones {
                if !zone.is_active {
                    continue;
                }
                // A malformed polygon slipping past configure must not take
                // down the rest of the frame.
                if zone.polygon.len() < 3 {
                    warn!("zone '{}': degenerate polygon, skipping", zone.zone_id);
                    continue;
                }

                let state = self
                    .states
                    .entry((det.tracking_id.clone(), zone.zone_id.clone()))
                    .or_default();

                let inside = point_in_polygon(point, &zone.polygon);

                if inside && !state.inside {
                    state.inside = true;
                    state.entry_time = Some(now);
                    state.distance = 0.0;
                    state.alert_flags.clear();
                    state.alert_flags.insert(AlertKind::DangerZoneEntry, now);
                    info!(
                        "🚨 track {} entered zone '{}' ({})",
                        det.tracking_id, zone.name, zone.zone_id
                    );
                    alerts.push(AlertEvent {
                        kind: AlertKind::DangerZoneEntry,
                        tracking_id: det.tracking_id.clone(),
                        zone_id: Some(zone.zone_id.clone()),
                        message: format!("entered danger zone '{}'", zone.name),
                        confidence: 1.0,
                        position: AlertPosition::Point(point),
                        timestamp: now,
                    });
                } else if !inside && state.inside {
                    state.inside = false;
                    state.entry_time = None;
                    state.alert_flags.clear();
                    debug!(
                        "track {} left zone '{}' ({})",
                        det.tracking_id, zone.name, zone.zone_id
                    );
                }

                if state.inside {
                    state.distance = 0.0;
                    if zone.time_in_area_threshold > 0.0 {
                        if let Some(entry_time) = state.entry_time {
                            let dwell = now - entry_time;
                            if dwell >= zone.time_in_area_threshold
                                && !state.alert_flags.contains_key(&AlertKind::DangerZoneDwell)
                            {
                                state.alert_flags.insert(AlertKind::DangerZoneDwell, now);
                                info!(
                                    "⏱️ track {} dwelling in zone '{}' for {:.1}s",
                                    det.tracking_id, zone.name, dwell
                                );
                                alerts.push(AlertEvent {
                                    kind: AlertKind::DangerZoneDwell,
                                    tracking_id: det.tracking_id.clone(),
                                    zone_id: Some(zone.zone_id.clone()),
                                    message: format!(
                                        "in danger zone '{}' for {:.1}s",
                                        zone.name, dwell
                                    ),
                                    confidence: 1.0,
                                    position: AlertPosition::Point(point),
                                    timestamp: now,
                                });
                            }
                        }
                    }
                } else {
                    let distance = point_to_polygon_distance(point, &zone.polygon);
                    state.distance = distance;

                    if zone.min_distance_threshold > 0.0 && distance <= zone.min_distance_threshold
                    {
                        let armed = state
                            .alert_flags
                            .get(&AlertKind::DangerZoneProximity)
                            .map_or(true, |last| {
                                now - last >= self.config.proximity_realert_secs
                            });
                        if armed {
                            state.alert_flags.insert(AlertKind::DangerZoneProximity, now);
                            info!(
                                "⚠️ track {} within {:.0}px of zone '{}'",
                                det.tracking_id, distance, zone.name
                            );
                            alerts.push(AlertEvent {
                                kind: AlertKind::DangerZoneProximity,
                                tracking_id: det.tracking_id.clone(),
                                zone_id: Some(zone.zone_id.clone()),
                                message: format!(
                                    "within {:.0}px of danger zone '{}'",
                                    distance, zone.name
                                ),
                                confidence: 1.0,
                                position: AlertPosition::Point(point),
                                timestamp: now,
                            });
                        }
                    }
                }
            }
        }

        self.sweep_stale(now);
        alerts
    }

    /// Mandatory per-frame maintenance: drop state owned by tracks that
    /// have not been observed within the stale window.
    fn sweep_stale(&mut self, now: f64) {
        let stale = self.config.stale_track_secs;
        let dead: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, last)| now - **last > stale)
            .map(|(id, _)| id.clone())
            .collect();

        if dead.is_empty() {
            return;
        }
        for id in &dead {
            self.last_seen.remove(id);
        }
        self.states.retain(|(track_id, _), _| !dead.contains(track_id));
        debug!("purged zone state for {} stale track(s)", dead.len());
    }

    #[cfg(test)]
    fn state_count(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(zone_id: &str, dwell_secs: f64, proximity_px: f64) -> Zone {
        Zone {
            zone_id: zone_id.to_string(),
            name: format!("zone {zone_id}"),
            polygon: vec![[100.0, 100.0], [200.0, 100.0], [200.0, 200.0], [100.0, 200.0]],
            min_distance_threshold: proximity_px,
            time_in_area_threshold: dwell_secs,
            is_active: true,
        }
    }

    /// Person-shaped tracked detection whose bottom-center lands at (x, y).
    fn person_at(id: &str, x: f64, y: f64) -> TrackedDetection {
        TrackedDetection {
            bbox: [x - 20.0, y - 90.0, x + 20.0, y],
            class_name: "person".to_string(),
            confidence: 0.9,
            tracking_id: id.to_string(),
            is_disappeared: false,
        }
    }

    fn engine_with(zones: Vec<Zone>) -> ZoneEngine {
        let mut engine = ZoneEngine::new(ZoneEngineConfig::default());
        engine.configure(zones).unwrap();
        engine
    }

    fn kinds(alerts: &[AlertEvent]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_configure_rejects_degenerate_polygon_atomically() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);

        let mut bad = zone("z2", 0.0, 0.0);
        bad.polygon.truncate(2);
        let err = engine.configure(vec![zone("z3", 0.0, 0.0), bad]).unwrap_err();
        assert!(matches!(err, ZoneConfigError::DegeneratePolygon { vertices: 2, .. }));

        // Previous configuration still in effect, no partial apply
        assert_eq!(engine.zones().len(), 1);
        assert_eq!(engine.zones()[0].zone_id, "z1");
    }

    #[test]
    fn test_configure_rejects_negative_threshold() {
        let mut engine = ZoneEngine::new(ZoneEngineConfig::default());
        let mut bad = zone("z1", -1.0, 0.0);
        bad.time_in_area_threshold = -1.0;
        assert!(matches!(
            engine.configure(vec![bad]),
            Err(ZoneConfigError::NegativeThreshold { field: "time_in_area_threshold", .. })
        ));
    }

    #[test]
    fn test_entry_alert_fires_once_per_session() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);

        let inside = [person_at("1", 150.0, 150.0)];
        let alerts = engine.update(&inside, 0.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneEntry]);
        assert_eq!(alerts[0].zone_id.as_deref(), Some("z1"));

        // Still inside on later frames: no repeat
        for i in 1..20 {
            assert!(engine.update(&inside, i as f64 * 0.1).is_empty());
        }
    }

    #[test]
    fn test_one_entry_one_dwell_then_fresh_pair_on_reentry() {
        // Scenario: dwell threshold 5s; bottom-center enters at t=0 and
        // stays through t=6 — exactly one entry and one dwell. Exit and
        // re-enter produces a fresh pair.
        let mut engine = engine_with(vec![zone("z1", 5.0, 0.0)]);
        let inside = [person_at("1", 150.0, 150.0)];
        let outside = [person_at("1", 400.0, 400.0)];

        let mut entries = 0;
        let mut dwells = 0;
        let mut first_dwell_at = None;
        let mut t = 0.0;
        while t <= 6.0 {
            for alert in engine.update(&inside, t) {
                match alert.kind {
                    AlertKind::DangerZoneEntry => entries += 1,
                    AlertKind::DangerZoneDwell => {
                        dwells += 1;
                        first_dwell_at.get_or_insert(t);
                    }
                    other => panic!("unexpected alert {other:?}"),
                }
            }
            t += 0.1;
        }
        assert_eq!(entries, 1);
        assert_eq!(dwells, 1);
        let dwell_t = first_dwell_at.unwrap();
        assert!((dwell_t - 5.0).abs() < 0.11, "dwell fired at {dwell_t}");

        // Exit, then re-enter: a fresh entry + dwell pair
        assert!(engine.update(&outside, 7.0).is_empty());
        let alerts = engine.update(&inside, 8.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneEntry]);
        let alerts = engine.update(&inside, 13.5);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneDwell]);
    }

    #[test]
    fn test_dwell_disabled_at_zero_threshold() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);
        let inside = [person_at("1", 150.0, 150.0)];
        engine.update(&inside, 0.0);
        // Hours later, still only the entry ever fired
        assert!(engine.update(&inside, 3600.0).is_empty());
    }

    #[test]
    fn test_proximity_one_shot_with_cooldown_rearm() {
        let mut engine = ZoneEngine::new(ZoneEngineConfig {
            stale_track_secs: 30.0,
            proximity_realert_secs: 10.0,
        });
        engine.configure(vec![zone("z1", 0.0, 50.0)]).unwrap();

        // Bottom-center at (250, 150): 50px from the right edge
        let near = [person_at("1", 250.0, 150.0)];
        let alerts = engine.update(&near, 0.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneProximity]);
        assert_eq!(engine.last_distance("1", "z1"), Some(50.0));

        // Hovering in the band: silent until the cooldown elapses
        assert!(engine.update(&near, 1.0).is_empty());
        assert!(engine.update(&near, 9.9).is_empty());
        let alerts = engine.update(&near, 10.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneProximity]);
    }

    #[test]
    fn test_proximity_outside_radius_is_silent() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 50.0)]);
        let far = [person_at("1", 300.0, 150.0)]; // 100px away
        assert!(engine.update(&far, 0.0).is_empty());
    }

    #[test]
    fn test_entry_clears_proximity_flag() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 50.0)]);
        let near = [person_at("1", 240.0, 150.0)];
        let inside = [person_at("1", 150.0, 150.0)];

        let alerts = engine.update(&near, 0.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneProximity]);

        let alerts = engine.update(&inside, 1.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneEntry]);

        // Back out: flags were cleared on entry, so proximity fires again
        // without waiting out the cooldown.
        let alerts = engine.update(&near, 2.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneProximity]);
    }

    #[test]
    fn test_inactive_zone_skipped() {
        let mut z = zone("z1", 0.0, 0.0);
        z.is_active = false;
        let mut engine = engine_with(vec![z]);
        assert!(engine.update(&[person_at("1", 150.0, 150.0)], 0.0).is_empty());
    }

    #[test]
    fn test_bottom_center_is_the_reference_point() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);
        // Box center is inside the zone but the feet are below it: no entry
        let head_in = TrackedDetection {
            bbox: [130.0, 120.0, 170.0, 260.0],
            class_name: "person".to_string(),
            confidence: 0.9,
            tracking_id: "1".to_string(),
            is_disappeared: false,
        };
        assert!(engine.update(&[head_in], 0.0).is_empty());
    }

    #[test]
    fn test_ghost_keeps_dwell_session_alive() {
        let mut engine = engine_with(vec![zone("z1", 2.0, 0.0)]);
        let inside = [person_at("1", 150.0, 150.0)];
        let mut ghost = person_at("1", 150.0, 150.0);
        ghost.is_disappeared = true;

        engine.update(&inside, 0.0);
        // Occluded for a few frames, bbox frozen
        engine.update(&[ghost], 1.0);
        let alerts = engine.update(&inside, 2.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneDwell]);
    }

    #[test]
    fn test_stale_track_state_purged() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);
        engine.update(&[person_at("1", 150.0, 150.0)], 0.0);
        assert_eq!(engine.state_count(), 1);

        // Another track keeps the engine ticking; track 1 goes stale
        engine.update(&[person_at("2", 400.0, 400.0)], 31.0);
        assert_eq!(engine.state_count(), 1);

        // Track 1 comes back: fresh session, entry fires again
        let alerts = engine.update(&[person_at("1", 150.0, 150.0)], 32.0);
        assert_eq!(kinds(&alerts), vec![AlertKind::DangerZoneEntry]);
    }

    #[test]
    fn test_reconfigure_drops_removed_zone_state_only() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0), zone_at("z2", 400.0)]);
        engine.update(
            &[person_at("1", 150.0, 150.0), person_at("2", 450.0, 150.0)],
            0.0,
        );
        assert_eq!(engine.state_count(), 4);

        engine.configure(vec![zone("z1", 0.0, 0.0)]).unwrap();
        assert_eq!(engine.state_count(), 2);

        // z1 session survived the reconfigure: no duplicate entry alert
        assert!(engine.update(&[person_at("1", 150.0, 150.0)], 1.0).is_empty());
    }

    /// Square zone shifted to start at the given x offset.
    fn zone_at(zone_id: &str, x: f64) -> Zone {
        Zone {
            zone_id: zone_id.to_string(),
            name: format!("zone {zone_id}"),
            polygon: vec![[x, 100.0], [x + 100.0, 100.0], [x + 100.0, 200.0], [x, 200.0]],
            min_distance_threshold: 0.0,
            time_in_area_threshold: 0.0,
            is_active: true,
        }
    }

    #[test]
    fn test_two_tracks_independent_sessions() {
        let mut engine = engine_with(vec![zone("z1", 0.0, 0.0)]);
        let alerts = engine.update(
            &[person_at("1", 150.0, 150.0), person_at("2", 160.0, 160.0)],
            0.0,
        );
        assert_eq!(alerts.len(), 2);
        let ids: Vec<_> = alerts.iter().map(|a| a.tracking_id.as_str()).collect();
        assert!(ids.contains(&"1") && ids.contains(&"2"));
    }
}
