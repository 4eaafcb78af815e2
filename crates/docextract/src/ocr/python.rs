//! Shared plumbing for OCR engines only reachable from Python.
//!
//! The engine runs in a `python3 -c <script>` child that reads the image from
//! a temporary file and prints detections as JSON:
//! `[{"box": [[x, y], x4], "text": "...", "confidence": 0.93}, ...]`.
//! Scripts exit with [`MISSING_MODULE_EXIT_CODE`] when the engine package
//! cannot be imported.

use crate::Result;
use crate::error::DocExtractError;
use crate::ocr::process::EngineCommand;
use crate::plugins::RecognizedText;
use crate::types::BoundingBox;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const MISSING_MODULE_EXIT_CODE: i32 = 3;

/// Detections whose vertical centres are closer than this share a line.
pub const LINE_HEIGHT_THRESHOLD: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub points: Vec<[f64; 2]>,
    pub text: String,
    pub confidence: f64,
}

impl Detection {
    fn y_center(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|p| p[1]).sum::<f64>() / self.points.len() as f64
    }

    fn sort_y(&self) -> f64 {
        let y = |i: usize| self.points.get(i).map(|p| p[1]).unwrap_or(0.0);
        y(0) + y(2)
    }

    fn left(&self) -> f64 {
        self.points.first().map(|p| p[0]).unwrap_or(0.0)
    }

    fn bounding_box(&self) -> Option<BoundingBox> {
        let xs = self.points.iter().map(|p| p[0].max(0.0));
        let ys = self.points.iter().map(|p| p[1].max(0.0));
        let min_x = xs.clone().fold(f64::INFINITY, f64::min);
        let max_x = xs.fold(0.0, f64::max);
        let min_y = ys.clone().fold(f64::INFINITY, f64::min);
        let max_y = ys.fold(0.0, f64::max);
        if !min_x.is_finite() || !min_y.is_finite() {
            return None;
        }
        Some(BoundingBox {
            left: min_x as u32,
            top: min_y as u32,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        })
    }
}

/// Run `script` on `image` and parse its JSON detections.
pub async fn run_script(
    engine: &str,
    python: &Path,
    script: &str,
    image: &[u8],
    extra_args: &[String],
    timeout: Duration,
) -> Result<Vec<Detection>> {
    let input = tempfile::Builder::new()
        .prefix("docextract-ocr-")
        .suffix(".img")
        .tempfile()?;
    tokio::fs::write(input.path(), image).await?;

    let mut command = EngineCommand::new(engine, python)
        .arg("-c")
        .arg(script)
        .arg(input.path())
        .missing_dependency_exit_code(MISSING_MODULE_EXIT_CODE);
    for arg in extra_args {
        command = command.arg(arg);
    }

    let stdout = command.run(timeout).await?;
    parse_detections(engine, &stdout)
}

pub fn parse_detections(engine: &str, stdout: &[u8]) -> Result<Vec<Detection>> {
    // Engines log to stdout on import; the JSON payload is the last line.
    let text = String::from_utf8_lossy(stdout);
    let payload = text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("[]");
    serde_json::from_str(payload).map_err(|e| DocExtractError::malformed_output(engine, format!("invalid JSON: {e}")))
}

/// Group detections into reading-order lines.
///
/// Detections are sorted top to bottom; a detection starts a new line when its
/// vertical centre is more than [`LINE_HEIGHT_THRESHOLD`] away from the
/// previous one. Each line is then ordered left to right.
pub fn group_lines(mut detections: Vec<Detection>) -> Vec<RecognizedText> {
    detections.retain(|d| !d.text.trim().is_empty());
    detections.sort_by(|a, b| a.sort_y().total_cmp(&b.sort_y()));

    let mut groups: Vec<Vec<Detection>> = Vec::new();
    let mut previous_center: Option<f64> = None;

    for detection in detections {
        let center = detection.y_center();
        let same_line = previous_center.is_some_and(|prev| (center - prev).abs() <= LINE_HEIGHT_THRESHOLD);
        match groups.last_mut() {
            Some(line) if same_line => line.push(detection),
            _ => groups.push(vec![detection]),
        }
        previous_center = Some(center);
    }

    groups
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.left().total_cmp(&b.left()));
            let confidence = line.iter().map(|d| d.confidence).sum::<f64>() / line.len() as f64;
            let region = line
                .iter()
                .filter_map(Detection::bounding_box)
                .reduce(|acc, b| acc.union(&b));
            RecognizedText {
                text: line.iter().map(|d| d.text.trim()).collect::<Vec<_>>().join(" "),
                confidence: confidence.clamp(0.0, 1.0),
                region,
            }
        })
        .collect()
}
