//! Visual locator.
//!
//! A [`Locator`] resolves a target into one box on a screenshot. Targets
//! are either text (a list of synonyms matched through the
//! [`TextRecognizer`]) or objects (a class id matched through the
//! [`TileDetector`]). Callers name a registered target by key or pass a
//! [`TargetSpec`] inline for a single call; inline targets never touch the
//! registry.
//!
//! ```ignore
//! let ctx = SearchContext::new().exact().with_avoid_below(guard_y);
//! let hit = locator.locate(&frame, &TargetQuery::text(["USD"]), &ctx);
//! ```

use crate::geometry::PixelBox;
use crate::vision::{TextRecognizer, TileDetector};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default minimum fuzzy score
pub const DEFAULT_MIN_SCORE: u8 = 75;

/// Default minimum detector confidence
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.75;

// =============================================================================
// TARGETS
// =============================================================================

/// How a target is recognized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetKind {
    /// Rendered text, any of the synonyms
    Text {
        /// Accepted renderings, in precedence order
        #[serde(default)]
        synonyms: Vec<String>,
    },
    /// Detector class
    Object {
        /// Detector class id
        class_id: String,
    },
}

/// A named target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// Symbolic key
    pub key: String,
    /// Recognition method
    pub kind: TargetKind,
}

impl TargetSpec {
    /// Text target with the given synonyms
    #[must_use]
    pub fn text<I, S>(key: impl Into<String>, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            kind: TargetKind::Text {
                synonyms: synonyms.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Object target for a detector class
    #[must_use]
    pub fn object(key: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: TargetKind::Object {
                class_id: class_id.into(),
            },
        }
    }

    /// Synonyms of a text target; a text target without synonyms matches its key
    #[must_use]
    pub fn synonyms(&self) -> Vec<String> {
        match &self.kind {
            TargetKind::Text { synonyms } if synonyms.is_empty() => vec![self.key.clone()],
            TargetKind::Text { synonyms } => synonyms.clone(),
            TargetKind::Object { .. } => Vec::new(),
        }
    }
}

/// Persistent targets loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, TargetSpec>,
}

impl TargetRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a target
    pub fn insert(&mut self, spec: TargetSpec) {
        self.targets.insert(spec.key.clone(), spec);
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, spec: TargetSpec) -> Self {
        self.insert(spec);
        self
    }

    /// Look up a target by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TargetSpec> {
        self.targets.get(key)
    }

    /// Number of registered targets
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Registered keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}

/// What to look for in one `locate` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetQuery {
    /// A registered target
    Key(String),
    /// A target used for this call only
    Inline(TargetSpec),
}

impl TargetQuery {
    /// Registered target by key
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Inline text target
    #[must_use]
    pub fn text<I, S>(synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let synonyms: Vec<String> = synonyms.into_iter().map(Into::into).collect();
        let key = synonyms.first().cloned().unwrap_or_default();
        Self::Inline(TargetSpec::text(key, synonyms))
    }

    /// Inline tile target
    #[must_use]
    pub fn tile(tile_id: impl Into<String>) -> Self {
        let id = tile_id.into();
        Self::Inline(TargetSpec::object(id.clone(), id))
    }

    /// Key for logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Inline(spec) => &spec.key,
        }
    }
}

// =============================================================================
// SEARCH CONTEXT
// =============================================================================

/// Constraints for one lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SearchContext {
    /// Region to search, in device pixels
    pub roi: Option<PixelBox>,
    /// Require normalized equality instead of fuzzy scoring
    pub exact: bool,
    /// Minimum fuzzy score in `0..=100`
    pub min_score: u8,
    /// Ignore words whose top is at or above this line
    pub avoid_above_y: Option<i32>,
    /// Ignore words whose top is at or below this line
    pub avoid_below_y: Option<i32>,
    /// Minimum detector confidence for object targets
    pub min_confidence: f32,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            roi: None,
            exact: false,
            min_score: DEFAULT_MIN_SCORE,
            avoid_above_y: None,
            avoid_below_y: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl SearchContext {
    /// Whole-image fuzzy search with default thresholds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to exact matching
    #[must_use]
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Set minimum fuzzy score
    #[must_use]
    pub const fn with_min_score(mut self, min_score: u8) -> Self {
        self.min_score = min_score;
        self
    }

    /// Restrict to a region
    #[must_use]
    pub const fn with_roi(mut self, roi: PixelBox) -> Self {
        self.roi = Some(roi);
        self
    }

    /// Restrict to an optional region
    #[must_use]
    pub const fn with_roi_opt(mut self, roi: Option<PixelBox>) -> Self {
        self.roi = roi;
        self
    }

    /// Exclude matches at or below `y`
    #[must_use]
    pub const fn with_avoid_below(mut self, y: Option<i32>) -> Self {
        self.avoid_below_y = y;
        self
    }

    /// Exclude matches at or above `y`
    #[must_use]
    pub const fn with_avoid_above(mut self, y: Option<i32>) -> Self {
        self.avoid_above_y = y;
        self
    }

    /// Set minimum detector confidence
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Whether a match whose top edge is at `y` passes the guard band
    #[must_use]
    pub fn allows_y(&self, y: i32) -> bool {
        self.avoid_below_y.is_none_or(|bound| y < bound)
            && self.avoid_above_y.is_none_or(|bound| y > bound)
    }
}

// =============================================================================
// DETECTION
// =============================================================================

/// Which path produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionSource {
    /// Text recognizer
    TextMatch,
    /// Object detector
    ObjectDetect,
}

/// A located target
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Box in device pixels, non-empty and inside the frame
    pub bbox: PixelBox,
    /// Confidence in `0.0..=1.0`
    pub confidence: f32,
    /// Producing path
    pub source: DetectionSource,
}

// =============================================================================
// LOCATOR
// =============================================================================

/// Resolves targets to boxes on a frame
#[derive(Debug, Clone)]
pub struct Locator {
    registry: TargetRegistry,
    recognizer: Arc<dyn TextRecognizer>,
    detector: Option<Arc<dyn TileDetector>>,
}

impl Locator {
    /// Create a locator without an object detector
    #[must_use]
    pub fn new(registry: TargetRegistry, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            registry,
            recognizer,
            detector: None,
        }
    }

    /// Attach an object detector
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn TileDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Registered targets
    #[must_use]
    pub const fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    /// Locate `query` on `image` under `ctx`.
    ///
    /// Unknown keys, recognizer failures and weak matches all yield `None`.
    #[must_use]
    pub fn locate(&self, image: &DynamicImage, query: &TargetQuery, ctx: &SearchContext) -> Option<Detection> {
        let spec = match query {
            TargetQuery::Inline(spec) => spec,
            TargetQuery::Key(key) => match self.registry.get(key) {
                Some(spec) => spec,
                None => {
                    tracing::debug!(key = %key, "unregistered target");
                    return None;
                }
            },
        };

        let found = match &spec.kind {
            TargetKind::Object { class_id } => self.locate_object(image, class_id, ctx),
            TargetKind::Text { .. } => self.locate_text(image, &spec.synonyms(), ctx),
        }?;

        let bbox = found.bbox.clip_to(image.width(), image.height())?;
        tracing::debug!(target_key = %spec.key, ?bbox, confidence = found.confidence, "located");
        Some(Detection { bbox, ..found })
    }

    fn locate_text(&self, image: &DynamicImage, synonyms: &[String], ctx: &SearchContext) -> Option<Detection> {
        match self.recognizer.find(image, synonyms, ctx) {
            Ok(found) => found.map(|m| Detection {
                bbox: m.bbox,
                confidence: f32::from(m.score) / 100.0,
                source: DetectionSource::TextMatch,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "text recognition failed");
                None
            }
        }
    }

    fn locate_object(&self, image: &DynamicImage, class_id: &str, ctx: &SearchContext) -> Option<Detection> {
        let Some(detector) = &self.detector else {
            tracing::warn!(class_id, "object target without a detector");
            return None;
        };
        let allowed = [class_id.to_string()];
        let detections = match detector.find_all(image, &allowed, ctx.min_confidence) {
            Ok(d) => d,
            Err(err) => {
                tracing::warn!(error = %err, class_id, "tile detection failed");
                return None;
            }
        };
        detections
            .into_iter()
            .filter(|d| d.label == class_id && d.confidence >= ctx.min_confidence)
            .fold(None, |best: Option<crate::vision::TileDetection>, d| match best {
                Some(b) if b.confidence >= d.confidence => Some(b),
                _ => Some(d),
            })
            .map(|d| Detection {
                bbox: d.bbox,
                confidence: d.confidence,
                source: DetectionSource::ObjectDetect,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mock::{FixedDetector, FixedRecognizer};
    use crate::vision::{RecognizedWord, TileDetection};

    fn frame() -> DynamicImage {
        DynamicImage::new_rgb8(800, 600)
    }

    fn locator_with(words: Vec<RecognizedWord>) -> Locator {
        let registry = TargetRegistry::new()
            .with(TargetSpec::text("operator_label", ["Operator"]))
            .with(TargetSpec::text("Home", Vec::<String>::new()));
        Locator::new(registry, Arc::new(FixedRecognizer::new(words)))
    }

    mod target_tests {
        use super::*;

        #[test]
        fn test_text_without_synonyms_uses_key() {
            assert_eq!(TargetSpec::text("Home", Vec::<String>::new()).synonyms(), vec!["Home"]);
        }

        #[test]
        fn test_query_names() {
            assert_eq!(TargetQuery::key("operator_label").name(), "operator_label");
            assert_eq!(TargetQuery::text(["USD", "usd"]).name(), "USD");
            assert_eq!(TargetQuery::tile("edg201").name(), "edg201");
        }

        #[test]
        fn test_kind_yaml_shape() {
            let kind: TargetKind = serde_yaml_ng::from_str("type: object\nclass_id: edg201\n").unwrap();
            assert_eq!(
                kind,
                TargetKind::Object {
                    class_id: "edg201".into()
                }
            );
        }
    }

    mod context_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let ctx = SearchContext::new();
            assert!(!ctx.exact);
            assert_eq!(ctx.min_score, 75);
            assert_eq!(ctx.min_confidence, 0.75);
            assert!(ctx.allows_y(i32::MAX));
        }

        #[test]
        fn test_guard_band() {
            let ctx = SearchContext::new()
                .with_avoid_above(Some(100))
                .with_avoid_below(Some(500));
            assert!(!ctx.allows_y(100));
            assert!(ctx.allows_y(101));
            assert!(ctx.allows_y(499));
            assert!(!ctx.allows_y(500));
        }
    }

    mod locate_text_tests {
        use super::*;

        #[test]
        fn test_registered_key() {
            let loc = locator_with(vec![RecognizedWord::new("Operator", PixelBox::new(40, 50, 90, 20))]);
            let det = loc
                .locate(&frame(), &TargetQuery::key("operator_label"), &SearchContext::new())
                .unwrap();
            assert_eq!(det.bbox, PixelBox::new(40, 50, 90, 20));
            assert_eq!(det.source, DetectionSource::TextMatch);
            assert_eq!(det.confidence, 1.0);
        }

        #[test]
        fn test_unknown_key_is_none() {
            let loc = locator_with(vec![RecognizedWord::new("Operator", PixelBox::new(40, 50, 90, 20))]);
            assert!(loc
                .locate(&frame(), &TargetQuery::key("nope"), &SearchContext::new())
                .is_none());
        }

        #[test]
        fn test_inline_target_does_not_register() {
            let loc = locator_with(vec![RecognizedWord::new("USD", PixelBox::new(0, 0, 30, 20))]);
            assert!(loc
                .locate(&frame(), &TargetQuery::text(["USD"]), &SearchContext::new().exact())
                .is_some());
            assert!(loc.registry().get("USD").is_none());
            assert!(loc
                .locate(&frame(), &TargetQuery::key("USD"), &SearchContext::new())
                .is_none());
        }

        #[test]
        fn test_degenerate_roi_is_none() {
            let loc = locator_with(vec![RecognizedWord::new("USD", PixelBox::new(0, 0, 30, 20))]);
            let ctx = SearchContext::new().with_roi(PixelBox::new(900, 900, 50, 50));
            assert!(loc.locate(&frame(), &TargetQuery::text(["USD"]), &ctx).is_none());
        }

        #[test]
        fn test_box_clipped_to_frame() {
            let loc = locator_with(vec![RecognizedWord::new("Menu", PixelBox::new(780, 590, 40, 20))]);
            let det = loc
                .locate(&frame(), &TargetQuery::text(["Menu"]), &SearchContext::new().exact())
                .unwrap();
            assert!(det.bbox.within(800, 600));
            assert_eq!(det.bbox, PixelBox::new(780, 590, 20, 10));
        }
    }

    mod locate_object_tests {
        use super::*;

        #[test]
        fn test_highest_confidence_wins() {
            let detector = FixedDetector::new(vec![
                TileDetection::new("edg201", 0.80, PixelBox::new(0, 0, 100, 100)),
                TileDetection::new("edg201", 0.95, PixelBox::new(200, 0, 100, 100)),
                TileDetection::new("edg305", 0.99, PixelBox::new(400, 0, 100, 100)),
            ]);
            let loc = locator_with(Vec::new()).with_detector(Arc::new(detector));
            let det = loc
                .locate(&frame(), &TargetQuery::tile("edg201"), &SearchContext::new())
                .unwrap();
            assert_eq!(det.bbox.x, 200);
            assert_eq!(det.source, DetectionSource::ObjectDetect);
        }

        #[test]
        fn test_below_confidence_floor_is_none() {
            let detector = FixedDetector::new(vec![TileDetection::new(
                "edg201",
                0.70,
                PixelBox::new(0, 0, 100, 100),
            )]);
            let loc = locator_with(Vec::new()).with_detector(Arc::new(detector));
            assert!(loc
                .locate(&frame(), &TargetQuery::tile("edg201"), &SearchContext::new())
                .is_none());
        }

        #[test]
        fn test_no_detector_is_none() {
            let loc = locator_with(Vec::new());
            assert!(loc
                .locate(&frame(), &TargetQuery::tile("edg201"), &SearchContext::new())
                .is_none());
        }
    }
}
