//! Recognizer and detector stubs.

use super::MockPage;
use crate::geometry::PixelBox;
use crate::result::ProbeResult;
use crate::vision::command::filter_detections;
use crate::vision::{RecognizedWord, TextRecognizer, TileDetection, TileDetector};
use image::DynamicImage;

fn inside(roi: Option<PixelBox>, bbox: &PixelBox) -> bool {
    roi.is_none_or(|r| {
        let (cx, cy) = bbox.center();
        r.contains(cx, cy)
    })
}

/// Reads the words currently scripted on a [`MockPage`]
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    page: MockPage,
}

impl MockRecognizer {
    /// Recognizer over `page`
    #[must_use]
    pub const fn new(page: MockPage) -> Self {
        Self { page }
    }
}

impl TextRecognizer for MockRecognizer {
    fn words(&self, _image: &DynamicImage, roi: Option<PixelBox>) -> ProbeResult<Vec<RecognizedWord>> {
        Ok(self
            .page
            .update(|s| s.words.iter().filter(|w| inside(roi, &w.bbox)).cloned().collect()))
    }
}

/// Reports the tiles visible on a [`MockPage`] at its current scroll offset
#[derive(Debug, Clone)]
pub struct MockDetector {
    page: MockPage,
}

impl MockDetector {
    /// Detector over `page`
    #[must_use]
    pub const fn new(page: MockPage) -> Self {
        Self { page }
    }
}

impl TileDetector for MockDetector {
    fn find_all(
        &self,
        _image: &DynamicImage,
        allowed_ids: &[String],
        min_confidence: f32,
    ) -> ProbeResult<Vec<TileDetection>> {
        let visible = self.page.update(|s| s.visible_tiles());
        Ok(filter_detections(visible, allowed_ids, min_confidence))
    }
}

/// Returns the same words for every frame
#[derive(Debug, Clone, Default)]
pub struct FixedRecognizer {
    words: Vec<RecognizedWord>,
}

impl FixedRecognizer {
    /// Recognizer returning `words`
    #[must_use]
    pub const fn new(words: Vec<RecognizedWord>) -> Self {
        Self { words }
    }
}

impl TextRecognizer for FixedRecognizer {
    fn words(&self, _image: &DynamicImage, roi: Option<PixelBox>) -> ProbeResult<Vec<RecognizedWord>> {
        Ok(self.words.iter().filter(|w| inside(roi, &w.bbox)).cloned().collect())
    }
}

/// Returns the same detections for every frame
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    detections: Vec<TileDetection>,
}

impl FixedDetector {
    /// Detector returning `detections`
    #[must_use]
    pub const fn new(detections: Vec<TileDetection>) -> Self {
        Self { detections }
    }
}

impl TileDetector for FixedDetector {
    fn find_all(
        &self,
        _image: &DynamicImage,
        allowed_ids: &[String],
        min_confidence: f32,
    ) -> ProbeResult<Vec<TileDetection>> {
        Ok(filter_detections(self.detections.clone(), allowed_ids, min_confidence))
    }
}
