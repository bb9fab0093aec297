//! Tile detector that delegates to an external model process.
//!
//! The command receives the frame as PNG on stdin and prints a JSON array
//! of `{"label": .., "confidence": .., "box": [x, y, w, h]}` on stdout.

use super::{encode_png, TileDetection, TileDetector};
use crate::result::{ProbeError, ProbeResult};
use image::DynamicImage;
use std::io::Write;
use std::process::{Command, Stdio};

/// Detector backed by an external command
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    /// Create a detector running `program` with `args`
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a shell-like command line split on whitespace
    pub fn from_command_line(line: &str) -> ProbeResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ProbeError::config("empty detector command"))?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, png: &[u8]) -> ProbeResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProbeError::Detector {
                message: format!("cannot start {}: {e}", self.program),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ProbeError::Detector {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TileDetector for CommandDetector {
    fn find_all(
        &self,
        image: &DynamicImage,
        allowed_ids: &[String],
        min_confidence: f32,
    ) -> ProbeResult<Vec<TileDetection>> {
        let png = encode_png(image)?;
        let stdout = self.run(&png)?;
        let detections = parse_detections(&stdout)?;
        Ok(filter_detections(detections, allowed_ids, min_confidence))
    }
}

/// Parse the detector's JSON output
pub fn parse_detections(json: &str) -> ProbeResult<Vec<TileDetection>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| ProbeError::Detector {
        message: format!("malformed detector output: {e}"),
    })
}

/// Keep detections with an allowed label and enough confidence
#[must_use]
pub fn filter_detections(
    detections: Vec<TileDetection>,
    allowed_ids: &[String],
    min_confidence: f32,
) -> Vec<TileDetection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= min_confidence)
        .filter(|d| allowed_ids.is_empty() || allowed_ids.iter().any(|id| *id == d.label))
        .filter(|d| !d.bbox.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::geometry::PixelBox;

    const OUTPUT: &str = r#"[
        {"label": "edg201", "confidence": 0.91, "box": [100, 200, 180, 240]},
        {"label": "edg201", "confidence": 0.60, "box": [500, 200, 180, 240]},
        {"label": "edg305", "confidence": 0.88, "box": [900, 200, 180, 240]}
    ]"#;

    #[test]
    fn test_parse_and_filter() {
        let all = parse_detections(OUTPUT).unwrap();
        assert_eq!(all.len(), 3);
        let kept = filter_detections(all, &["edg201".to_string()], 0.75);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bbox, PixelBox::new(100, 200, 180, 240));
    }

    #[test]
    fn test_empty_allow_list_keeps_all_labels() {
        let kept = filter_detections(parse_detections(OUTPUT).unwrap(), &[], 0.75);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_blank_output_is_no_detections() {
        assert!(parse_detections("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_output_is_detector_error() {
        assert!(matches!(
            parse_detections("{not json"),
            Err(ProbeError::Detector { .. })
        ));
    }

    #[test]
    fn test_from_command_line() {
        let det = CommandDetector::from_command_line("python3 detect.py --weights tiles.pt").unwrap();
        assert_eq!(det.program(), "python3");
        assert_eq!(det.args.len(), 3);
        assert!(CommandDetector::from_command_line("   ").is_err());
    }
}
