// src/replay.rs
//
// Recorded detection-log input for the replay binary. One JSON object per
// line, as written by the inference collaborator's frame logger:
//
//   {"camera_id":"cam-1","timestamp":12.34,
//    "detections":[{"bbox":[x1,y1,x2,y2],"class_name":"person","confidence":0.92}]}

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::types::Detection;

#[derive(Debug, Clone, Deserialize)]
pub struct FrameRecord {
    pub camera_id: String,
    /// Unix seconds at frame decode time
    pub timestamp: f64,
    pub detections: Vec<Detection>,
}

pub fn parse_record(line: &str) -> Result<FrameRecord> {
    serde_json::from_str(line).context("malformed frame record")
}

/// Read a whole JSONL detection log. Blank lines are skipped; a malformed
/// line aborts the run with its line number — a replay over a corrupt log
/// is not worth finishing.
pub fn read_frames(path: &str) -> Result<Vec<FrameRecord>> {
    let file = File::open(path).with_context(|| format!("opening detection log {path}"))?;
    let reader = BufReader::new(file);

    let mut frames = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {path}:{}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record =
            parse_record(&line).with_context(|| format!("parsing {path}:{}", idx + 1))?;
        frames.push(record);
    }
    Ok(frames)
}
