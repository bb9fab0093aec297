//! Tesseract-backed text recognizer.
//!
//! Frames are cropped to the search region, binarized, and piped as PNG to
//! the `tesseract` executable, which answers with word-level TSV.

use super::{encode_png, RecognizedWord, TextRecognizer};
use crate::geometry::PixelBox;
use crate::result::{ProbeError, ProbeResult};
use image::{DynamicImage, GrayImage};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Default binarization threshold
pub const DEFAULT_THRESHOLD: u8 = 180;

/// TSV row level for single words
const WORD_LEVEL: &str = "5";

/// Recognizer that shells out to the Tesseract CLI
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
    language: String,
    threshold: u8,
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl TesseractRecognizer {
    /// Create a recognizer using `tesseract` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the recognition language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the binarization threshold
    #[must_use]
    pub const fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    fn run(&self, png: &[u8]) -> ProbeResult<String> {
        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "--oem", "3", "--psm", "6", "-l"])
            .arg(&self.language)
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProbeError::Recognizer {
                message: format!("cannot start {}: {e}", self.program.display()),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(png)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ProbeError::Recognizer {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn words(&self, image: &DynamicImage, roi: Option<PixelBox>) -> ProbeResult<Vec<RecognizedWord>> {
        let (crop, origin) = match roi {
            Some(r) => (
                image.crop_imm(r.x as u32, r.y as u32, r.width as u32, r.height as u32),
                (r.x, r.y),
            ),
            None => (image.clone(), (0, 0)),
        };
        let prepared = binarize(&crop, self.threshold);
        let png = encode_png(&DynamicImage::ImageLuma8(prepared))?;
        let tsv = self.run(&png)?;
        let words = parse_tsv(&tsv, origin);
        tracing::trace!(count = words.len(), ?roi, "tesseract words");
        Ok(words)
    }
}

/// Grayscale, stretch contrast to the full range, then threshold
#[must_use]
pub fn binarize(image: &DynamicImage, threshold: u8) -> GrayImage {
    let mut gray = image.to_luma8();
    let (lo, hi) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    let span = f32::from(hi.saturating_sub(lo)).max(1.0);
    for p in gray.pixels_mut() {
        let stretched = (f32::from(p.0[0].saturating_sub(lo)) * 255.0 / span).round();
        p.0[0] = if stretched >= f32::from(threshold) { 255 } else { 0 };
    }
    gray
}

/// Parse Tesseract TSV into word boxes offset by `origin`
#[must_use]
pub fn parse_tsv(tsv: &str, origin: (i32, i32)) -> Vec<RecognizedWord> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0] != WORD_LEVEL {
                return None;
            }
            let text = cols[11].trim();
            let conf: f32 = cols[10].parse().ok()?;
            if text.is_empty() || conf < 0.0 {
                return None;
            }
            let x: i32 = cols[6].parse().ok()?;
            let y: i32 = cols[7].parse().ok()?;
            let w: i32 = cols[8].parse().ok()?;
            let h: i32 = cols[9].parse().ok()?;
            Some(RecognizedWord::new(
                text,
                PixelBox::new(x + origin.0, y + origin.1, w, h),
            ))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t72\t-1\t
4\t1\t1\t1\t1\t0\t12\t20\t200\t24\t-1\t
5\t1\t1\t1\t1\t1\t12\t20\t60\t24\t91.5\tOperator
5\t1\t1\t1\t1\t2\t90\t21\t40\t22\t88\tUSD
5\t1\t1\t1\t1\t3\t140\t21\t10\t22\t-1\t
";

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parses_word_rows_only() {
            let words = parse_tsv(SAMPLE, (0, 0));
            assert_eq!(words.len(), 2);
            assert_eq!(words[0].text, "Operator");
            assert_eq!(words[0].bbox, PixelBox::new(12, 20, 60, 24));
        }

        #[test]
        fn test_offsets_by_origin() {
            let words = parse_tsv(SAMPLE, (100, 300));
            assert_eq!(words[1].bbox, PixelBox::new(190, 321, 40, 22));
        }

        #[test]
        fn test_garbage_is_ignored() {
            assert!(parse_tsv("nonsense\n5\tx", (0, 0)).is_empty());
        }
    }

    mod binarize_tests {
        use super::*;

        #[test]
        fn test_threshold_after_stretch() {
            let mut img = RgbImage::new(3, 1);
            img.put_pixel(0, 0, Rgb([100, 100, 100]));
            img.put_pixel(1, 0, Rgb([150, 150, 150]));
            img.put_pixel(2, 0, Rgb([200, 200, 200]));
            let out = binarize(&DynamicImage::ImageRgb8(img), DEFAULT_THRESHOLD);
            assert_eq!(out.get_pixel(0, 0), &Luma([0]));
            // 150 stretches to 128, below 180
            assert_eq!(out.get_pixel(1, 0), &Luma([0]));
            assert_eq!(out.get_pixel(2, 0), &Luma([255]));
        }

        #[test]
        fn test_flat_image_does_not_divide_by_zero() {
            let img = DynamicImage::new_luma8(4, 4);
            let out = binarize(&img, DEFAULT_THRESHOLD);
            assert!(out.pixels().all(|p| p.0[0] == 0));
        }
    }

    #[test]
    fn test_missing_program_is_recognizer_error() {
        let rec = TesseractRecognizer::new().with_program("/nonexistent/tesseract-bin");
        let err = rec.words(&DynamicImage::new_rgb8(8, 8), None).unwrap_err();
        assert!(matches!(err, ProbeError::Recognizer { .. }));
    }
}
