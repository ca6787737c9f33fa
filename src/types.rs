// src/types.rs

use serde::{Deserialize, Serialize};

/// One raw per-frame detection from the external inference collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// [x1, y1, x2, y2] in pixel space, x2 > x1 and y2 > y1
    pub bbox: [f64; 4],
    pub class_name: String,
    pub confidence: f64,
}

impl Detection {
    pub fn width(&self) -> f64 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f64 {
        self.bbox[3] - self.bbox[1]
    }

    /// Non-positive dimensions or non-finite coordinates. Such boxes are
    /// dropped at the tracker boundary, never matched or stored.
    pub fn is_degenerate(&self) -> bool {
        !self.bbox.iter().all(|v| v.is_finite()) || self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// A detection with a stable identity attached by the tracker.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedDetection {
    pub bbox: [f64; 4],
    pub class_name: String,
    pub confidence: f64,
    pub tracking_id: String,
    /// True for ghost entries: the track went unmatched this frame and the
    /// bbox is its last known position, confidence already decayed.
    pub is_disappeared: bool,
}

impl TrackedDetection {
    pub fn center(&self) -> [f64; 2] {
        [
            (self.bbox[0] + self.bbox[2]) * 0.5,
            (self.bbox[1] + self.bbox[3]) * 0.5,
        ]
    }
}

/// A configured danger zone for one camera. Replaced wholesale on
/// reconfiguration; never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: String,
    pub name: String,
    /// Polygon vertices in pixel space, at least 3. Enforced by
    /// `ZoneEngine::configure`.
    pub polygon: Vec<[f64; 2]>,
    /// Proximity radius in pixels. 0 disables the proximity check.
    #[serde(default)]
    pub min_distance_threshold: f64,
    /// Dwell threshold in seconds. 0 disables the dwell check.
    #[serde(default)]
    pub time_in_area_threshold: f64,
    #[serde(default = "default_zone_active")]
    pub is_active: bool,
}

fn default_zone_active() -> bool {
    true
}

/// Kinds of behavioral and geometric alerts this core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Track crossed from outside to inside a zone.
    DangerZoneEntry,
    /// Track stayed inside a zone past its dwell threshold.
    DangerZoneDwell,
    /// Track came within the proximity radius of a zone while outside it.
    DangerZoneProximity,
    /// Bbox aspect ratio indicates a person on the ground.
    FallDown,
    Running,
    WalkingActive,
    /// Track stayed below the activity speed threshold too long.
    LongIdle,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DangerZoneEntry => "danger_zone_entry",
            Self::DangerZoneDwell => "danger_zone_dwell",
            Self::DangerZoneProximity => "danger_zone_proximity",
            Self::FallDown => "fall_down",
            Self::Running => "running",
            Self::WalkingActive => "walking_active",
            Self::LongIdle => "long_idle",
        }
    }
}

/// Where the alert happened: a reference point for zone alerts, the full
/// bbox for behavior alerts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AlertPosition {
    Point([f64; 2]),
    Bbox([f64; 4]),
}

/// One alert handed to the external delivery collaborator. Produced every
/// frame as needed, never stored by this core.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub tracking_id: String,
    /// Present only for danger_zone_* kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    pub message: String,
    pub confidence: f64,
    pub position: AlertPosition,
    /// Unix seconds.
    pub timestamp: f64,
}
