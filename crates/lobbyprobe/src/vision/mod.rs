//! Recognition collaborators.
//!
//! [`TextRecognizer`] turns a frame into positioned words; [`TileDetector`]
//! turns a frame into labelled tile boxes. Both are traits so the engine
//! can run against Tesseract and an external detector in production and
//! against scripted stubs in tests.
//!
//! The word-selection rules (region, guard band, exact or fuzzy match,
//! tie-break order) live in [`select_word`] so that every recognizer
//! behaves identically once it has produced its word list.

pub mod command;
pub mod fuzzy;
pub mod tesseract;

pub use command::CommandDetector;
pub use fuzzy::weighted_ratio;
pub use tesseract::TesseractRecognizer;

use crate::geometry::PixelBox;
use crate::locator::SearchContext;
use crate::result::ProbeResult;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A recognized word (or phrase) and its box in device pixels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// Recognized text
    pub text: String,
    /// Box in frame coordinates
    pub bbox: PixelBox,
}

impl RecognizedWord {
    /// Create a new word
    #[must_use]
    pub fn new(text: impl Into<String>, bbox: PixelBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// A text match chosen by [`select_word`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    /// Matched text as recognized
    pub text: String,
    /// Box of the matched word or phrase
    pub bbox: PixelBox,
    /// Similarity score in `0..=100`
    pub score: u8,
}

/// A labelled tile detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDetection {
    /// Class label (game id)
    pub label: String,
    /// Confidence in `0.0..=1.0`
    pub confidence: f32,
    /// Box in frame coordinates
    #[serde(rename = "box", with = "box_tuple")]
    pub bbox: PixelBox,
}

impl TileDetection {
    /// Create a new detection
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32, bbox: PixelBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Extracts positioned words from a frame
pub trait TextRecognizer: Send + Sync + std::fmt::Debug {
    /// All words inside `roi` (whole frame when `None`), in reading order.
    ///
    /// `roi` is already clipped to the frame when this is called.
    fn words(&self, image: &DynamicImage, roi: Option<PixelBox>) -> ProbeResult<Vec<RecognizedWord>>;

    /// Best word for `synonyms` under `ctx`.
    ///
    /// A region that clips to nothing yields `Ok(None)` without running
    /// recognition.
    fn find(
        &self,
        image: &DynamicImage,
        synonyms: &[String],
        ctx: &SearchContext,
    ) -> ProbeResult<Option<TextMatch>> {
        let roi = match ctx.roi {
            Some(roi) => match roi.clip_to(image.width(), image.height()) {
                Some(clipped) => Some(clipped),
                None => return Ok(None),
            },
            None => None,
        };
        let words = self.words(image, roi)?;
        Ok(select_word(&words, synonyms, &ctx.clone().with_roi_opt(roi)))
    }
}

/// Detects labelled tiles in a frame
pub trait TileDetector: Send + Sync + std::fmt::Debug {
    /// Detections whose label is in `allowed_ids` (any label when empty)
    /// and whose confidence is at least `min_confidence`.
    fn find_all(
        &self,
        image: &DynamicImage,
        allowed_ids: &[String],
        min_confidence: f32,
    ) -> ProbeResult<Vec<TileDetection>>;
}

// =============================================================================
// WORD SELECTION
// =============================================================================

/// Lower-case and trim for exact comparison
#[must_use]
pub fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Pick the word that best matches `synonyms` under `ctx`.
///
/// Words outside the region or the guard band are ignored. A synonym of
/// `k` tokens is compared against runs of `k` consecutive words on the same
/// line, so multi-word labels match word-level recognizer output.
///
/// Exact mode returns the first synonym (in order) that equals some word,
/// taking the first such word in scan order. Fuzzy mode keeps the single
/// highest score over all pairs, earlier pairs winning ties, and requires
/// it to reach `ctx.min_score`.
#[must_use]
pub fn select_word(words: &[RecognizedWord], synonyms: &[String], ctx: &SearchContext) -> Option<TextMatch> {
    let kept: Vec<&RecognizedWord> = words
        .iter()
        .filter(|w| !w.bbox.is_empty())
        .filter(|w| ctx.allows_y(w.bbox.y))
        .filter(|w| {
            ctx.roi.is_none_or(|roi| {
                let (cx, cy) = w.bbox.center();
                roi.contains(cx, cy)
            })
        })
        .collect();

    if ctx.exact {
        for synonym in synonyms {
            let wanted = normalize_text(synonym);
            if wanted.is_empty() {
                continue;
            }
            let found = phrases(&kept, token_count(synonym))
                .into_iter()
                .find(|p| normalize_text(&p.text) == wanted);
            if let Some(phrase) = found {
                return Some(TextMatch {
                    text: phrase.text,
                    bbox: phrase.bbox,
                    score: 100,
                });
            }
        }
        return None;
    }

    let mut best: Option<TextMatch> = None;
    for synonym in synonyms {
        for phrase in phrases(&kept, token_count(synonym)) {
            let score = weighted_ratio(synonym, &phrase.text);
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(TextMatch {
                    text: phrase.text,
                    bbox: phrase.bbox,
                    score,
                });
            }
        }
    }
    best.filter(|b| b.score >= ctx.min_score)
}

fn token_count(s: &str) -> usize {
    s.split_whitespace().count().max(1)
}

/// Single words followed by runs of `len` consecutive words sharing a line
fn phrases(words: &[&RecognizedWord], len: usize) -> Vec<RecognizedWord> {
    let mut out: Vec<RecognizedWord> = words.iter().map(|w| (*w).clone()).collect();
    if len <= 1 {
        return out;
    }
    let runs = words
        .windows(len)
        .filter(|run| run.windows(2).all(|pair| same_line(&pair[0].bbox, &pair[1].bbox)))
        .map(|run| {
            let text = run.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            RecognizedWord::new(text, union(run.iter().map(|w| w.bbox)))
        });
    out.extend(runs);
    out
}

fn same_line(a: &PixelBox, b: &PixelBox) -> bool {
    let (_, ay) = a.center();
    let (_, by) = b.center();
    (ay - by).abs() <= a.height.max(b.height) / 2 && b.x >= a.x
}

fn union(boxes: impl Iterator<Item = PixelBox>) -> PixelBox {
    let mut iter = boxes;
    let Some(first) = iter.next() else {
        return PixelBox::new(0, 0, 0, 0);
    };
    let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.right(), first.bottom());
    for bx in iter {
        l = l.min(bx.x);
        t = t.min(bx.y);
        r = r.max(bx.right());
        b = b.max(bx.bottom());
    }
    PixelBox::new(l, t, r - l, b - t)
}

/// Encode a frame as PNG for external tools
pub(crate) fn encode_png(image: &DynamicImage) -> ProbeResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buf, image::ImageFormat::Png)?;
    Ok(buf.into_inner())
}

mod box_tuple {
    use crate::geometry::PixelBox;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(b: &PixelBox, s: S) -> Result<S::Ok, S::Error> {
        [b.x, b.y, b.width, b.height].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PixelBox, D::Error> {
        let [x, y, w, h] = <[i32; 4]>::deserialize(d)?;
        Ok(PixelBox::new(x, y, w, h))
    }
}
