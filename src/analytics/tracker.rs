// src/analytics/tracker.rs
//
// IoU-based multi-object tracker. Assigns stable identities to raw
// detections across frames and ages unmatched tracks out through a ghost
// window so downstream consumers coast over brief occlusions.
//
// Design:
//   - Greedy best-IoU matching per detection, in stable track order
//   - Monotonic u64 ids, never reused
//   - Unmatched tracks emitted as ghosts with decaying confidence until
//     the disappearance window closes
//   - Degenerate boxes rejected at the boundary, never stored

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{Detection, TrackedDetection};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IoU to match a detection to an existing track
    pub iou_threshold: f64,
    /// Frames a track survives unmatched before permanent removal
    pub max_disappeared_frames: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_disappeared_frames: 10,
        }
    }
}

/// A persistent identity. Owned exclusively by the tracker; downstream
/// consumers only ever see `TrackedDetection` snapshots.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: u64,
    pub bbox: [f64; 4],
    pub class_name: String,
    pub confidence: f64,
    /// 0 on the frame the track is matched, +1 for every frame it is not
    pub disappeared_count: u32,
    pub first_seen_time: f64,
    pub last_seen_time: f64,
    pub tracked_count: u64,
}

/// Identity-assignment seam. One IoU implementation today; alternative
/// strategies slot in as further implementations, not wrappers.
pub trait Tracker: Send {
    /// Consume one frame's detections, exactly once per frame per camera.
    fn update(&mut self, detections: &[Detection], now: f64) -> Vec<TrackedDetection>;
}

/// Standard intersection-over-union on axis-aligned boxes. 0 when the
/// boxes do not overlap or either has non-positive area.
fn iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

pub struct IouTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(32),
            next_id: 1,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

impl Tracker for IouTracker {
    fn update(&mut self, detections: &[Detection], now: f64) -> Vec<TrackedDetection> {
        // Tracks already matched this frame are excluded from later
        // detections' candidate sets.
        let mut matched = vec![false; self.tracks.len()];

        for det in detections {
            if det.is_degenerate() {
                warn!(
                    "dropping degenerate detection bbox=[{:.1},{:.1},{:.1},{:.1}] class={}",
                    det.bbox[0], det.bbox[1], det.bbox[2], det.bbox[3], det.class_name
                );
                continue;
            }

            // Best still-unmatched track by IoU. Strict > keeps the
            // first-encountered track on ties, deterministic given stable
            // storage order.
            let mut best: Option<(usize, f64)> = None;
            for (ti, track) in self.tracks.iter().enumerate() {
                if matched[ti] {
                    continue;
                }
                let score = iou(&track.bbox, &det.bbox);
                if score < self.config.iou_threshold {
                    continue;
                }
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((ti, score));
                }
            }

            match best {
                Some((ti, score)) => {
                    matched[ti] = true;
                    let track = &mut self.tracks[ti];
                    track.bbox = det.bbox;
                    track.class_name = det.class_name.clone();
                    track.confidence = det.confidence;
                    track.disappeared_count = 0;
                    track.last_seen_time = now;
                    track.tracked_count += 1;
                    debug!("track {} matched (iou={:.2})", track.id, score);
                }
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    info!(
                        "🆕 track {} created: class={} bbox=[{:.0},{:.0},{:.0},{:.0}]",
                        id, det.class_name, det.bbox[0], det.bbox[1], det.bbox[2], det.bbox[3]
                    );
                    self.tracks.push(Track {
                        id,
                        bbox: det.bbox,
                        class_name: det.class_name.clone(),
                        confidence: det.confidence,
                        disappeared_count: 0,
                        first_seen_time: now,
                        last_seen_time: now,
                        tracked_count: 1,
                    });
                    // A just-created track is not a candidate for the
                    // remaining detections of this frame.
                    matched.push(true);
                }
            }
        }

        // Age every track that went unmatched this frame
        for (ti, was_matched) in matched.iter().enumerate() {
            if !was_matched {
                self.tracks[ti].disappeared_count += 1;
            }
        }

        let max_disappeared = self.config.max_disappeared_frames;
        self.tracks.retain(|t| {
            if t.disappeared_count > max_disappeared {
                info!(
                    "🗑️ track {} expired after {} unmatched frames ({:.1}s lifetime)",
                    t.id,
                    t.disappeared_count,
                    t.last_seen_time - t.first_seen_time
                );
                false
            } else {
                true
            }
        });

        // Emit the surviving set: matched tracks as-is, unmatched ones as
        // ghosts at their last known bbox with decayed confidence.
        self.tracks
            .iter()
            .map(|t| {
                let ghost = t.disappeared_count > 0;
                let confidence = if ghost {
                    t.confidence
                        * (1.0 - t.disappeared_count as f64 / (max_disappeared as f64 + 1.0))
                } else {
                    t.confidence
                };
                TrackedDetection {
                    bbox: t.bbox,
                    class_name: t.class_name.clone(),
                    confidence,
                    tracking_id: t.id.to_string(),
                    is_disappeared: ghost,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64) -> Detection {
        Detection {
            bbox: [x1, y1, x2, y2],
            class_name: "person".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = [0.0, 0.0, 100.0, 100.0];
        let b = [50.0, 50.0, 150.0, 150.0];
        let score = iou(&a, &b);
        assert!((score - 2500.0 / 17500.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_degenerate() {
        assert_eq!(iou(&[0.0, 0.0, 50.0, 50.0], &[100.0, 100.0, 200.0, 200.0]), 0.0);
        assert_eq!(iou(&[0.0, 0.0, 0.0, 50.0], &[0.0, 0.0, 50.0, 50.0]), 0.0);
    }

    #[test]
    fn test_identity_stable_across_overlapping_frames() {
        // Scenario: the same object shifts a few pixels between frames
        // (IoU ≈ 0.85) and must keep its id.
        let mut tracker = IouTracker::new(TrackerConfig::default());

        let out1 = tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);
        assert_eq!(out1.len(), 1);
        let id = out1[0].tracking_id.clone();
        assert!(!out1[0].is_disappeared);

        let out2 = tracker.update(&[det(5.0, 2.0, 55.0, 102.0)], 0.033);
        assert_eq!(out2.len(), 1);
        assert_eq!(out2[0].tracking_id, id);
        assert!(!out2[0].is_disappeared);
    }

    #[test]
    fn test_non_overlapping_detection_gets_new_id() {
        let mut tracker = IouTracker::new(TrackerConfig::default());
        let out1 = tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);
        let out2 = tracker.update(&[det(500.0, 500.0, 550.0, 600.0)], 0.033);

        // Old track ghosts alongside the new identity
        assert_eq!(out2.len(), 2);
        let ids: Vec<_> = out2.iter().map(|t| t.tracking_id.clone()).collect();
        assert!(ids.contains(&out1[0].tracking_id));
        assert!(ids.iter().any(|i| *i != out1[0].tracking_id));
    }

    #[test]
    fn test_ghost_confidence_decays() {
        let mut tracker = IouTracker::new(TrackerConfig::default());
        tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);

        let out = tracker.update(&[], 0.033);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_disappeared);
        // disappeared_count=1, max=10: confidence * (1 - 1/11)
        assert!((out[0].confidence - 0.9 * (1.0 - 1.0 / 11.0)).abs() < 1e-9);

        let out = tracker.update(&[], 0.066);
        assert!((out[0].confidence - 0.9 * (1.0 - 2.0 / 11.0)).abs() < 1e-9);
    }

    #[test]
    fn test_track_expires_past_disappearance_window() {
        let cfg = TrackerConfig {
            max_disappeared_frames: 3,
            ..TrackerConfig::default()
        };
        let mut tracker = IouTracker::new(cfg);
        tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);

        // Three unmatched frames: still a ghost
        for i in 1..=3 {
            let out = tracker.update(&[], i as f64 * 0.033);
            assert_eq!(out.len(), 1, "frame {i} should still ghost");
        }
        // Fourth: disappeared_count exceeds the window, gone for good
        let out = tracker.update(&[], 4.0 * 0.033);
        assert!(out.is_empty());
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_degenerate_detection_never_stored() {
        let mut tracker = IouTracker::new(TrackerConfig::default());
        let out = tracker.update(&[det(50.0, 10.0, 10.0, 60.0)], 0.0);
        assert!(out.is_empty());
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_ids_monotonic_never_reused() {
        let cfg = TrackerConfig {
            max_disappeared_frames: 0,
            ..TrackerConfig::default()
        };
        let mut tracker = IouTracker::new(cfg);

        let out1 = tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);
        // Track dies immediately (window 0), then the same box reappears
        tracker.update(&[], 0.033);
        let out2 = tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.066);

        assert_ne!(out1[0].tracking_id, out2[0].tracking_id);
    }

    #[test]
    fn test_two_detections_do_not_share_a_track() {
        let mut tracker = IouTracker::new(TrackerConfig::default());
        tracker.update(&[det(0.0, 0.0, 100.0, 100.0)], 0.0);

        // Both candidates overlap the track; only the better one matches,
        // the other becomes a fresh identity.
        let out = tracker.update(
            &[det(2.0, 2.0, 102.0, 102.0), det(30.0, 30.0, 130.0, 130.0)],
            0.033,
        );
        assert_eq!(out.len(), 2);
        assert_ne!(out[0].tracking_id, out[1].tracking_id);
    }

    #[test]
    fn test_matched_frame_resets_disappeared_count() {
        let mut tracker = IouTracker::new(TrackerConfig::default());
        tracker.update(&[det(0.0, 0.0, 50.0, 100.0)], 0.0);
        tracker.update(&[], 0.033);
        tracker.update(&[], 0.066);

        let out = tracker.update(&[det(1.0, 1.0, 51.0, 101.0)], 0.1);
        assert!(!out[0].is_disappeared);
        assert_eq!(tracker.tracks()[0].disappeared_count, 0);
        assert_eq!(tracker.tracks()[0].tracked_count, 2);
    }
}
