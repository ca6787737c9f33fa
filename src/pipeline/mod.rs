// src/pipeline/mod.rs

pub mod alert_bus;
pub mod camera_pipeline;
pub mod metrics;

pub use alert_bus::AlertBus;
pub use camera_pipeline::CameraPipeline;
pub use metrics::{MetricsSummary, PipelineMetrics};
