// src/analytics/mod.rs
//
// Per-frame stateful analytics core.
//
// Signal flow per camera, per frame:
//   raw Detections → tracker (stable ids) ─┬→ zone_engine    → AlertEvents
//                                          └→ behavior_engine → AlertEvents
//
// The tracker must run first; both engines key their state on the
// identities it assigns. Orchestrated by pipeline::CameraPipeline.

pub mod behavior_engine;
pub mod clock;
pub mod geometry;
pub mod tracker;
pub mod zone_engine;

// Re-exports for ergonomic access from main.rs
pub use behavior_engine::{BehaviorConfig, BehaviorEngine};
pub use clock::{Clock, ManualClock, SystemClock};
pub use tracker::{IouTracker, Tracker, TrackerConfig};
pub use zone_engine::{ZoneConfigError, ZoneEngine, ZoneEngineConfig};
