//! In-memory browser for testing the interaction protocols.
//!
//! A [`MockPage`] is a shared handle to a scripted page: scroll geometry,
//! the words a recognizer would read off the current viewport, game tiles
//! laid out in page coordinates, and closures that react to clicks and
//! navigation. [`MockBrowser`] drives the page through the
//! [`BrowserAdapter`] contract and records every call, so tests can assert
//! on exactly what the engine did.
//!
//! ## Example
//!
//! ```rust,ignore
//! let page = MockPage::new().with_doc_height(3000);
//! page.on_click(|state, point| state.word_at(point).is_some());
//! let mut browser = page.browser();
//! browser.scroll_by(0, 520)?;
//! assert_eq!(page.count("scroll_by"), 1);
//! ```

mod vision;

pub use vision::{FixedDetector, FixedRecognizer, MockDetector, MockRecognizer};

use crate::driver::{jittered, normalize_url, BrowserAdapter, BrowserFactory, SessionHealth};
use crate::geometry::{PixelBox, ViewportPoint};
use crate::result::{ProbeError, ProbeResult};
use crate::vision::{RecognizedWord, TileDetection};
use image::DynamicImage;
use std::sync::{Arc, Mutex, PoisonError};

/// Reaction to a click at a viewport point; returns whether an element was hit
pub type ClickHandler = Box<dyn FnMut(&mut PageState, ViewportPoint) -> bool + Send>;

/// Reaction to a navigation
pub type PageHook = Box<dyn FnMut(&mut PageState) + Send>;

/// A game tile placed on the page
#[derive(Debug, Clone, PartialEq)]
pub struct MockTile {
    /// Detector label
    pub label: String,
    /// Detector confidence
    pub confidence: f32,
    /// Box in CSS page coordinates
    pub page_box: PixelBox,
}

impl MockTile {
    /// Create a tile
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32, page_box: PixelBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            page_box,
        }
    }
}

/// Scripted page contents
pub struct PageState {
    /// Current URL
    pub url: String,
    /// Navigation history
    pub history: Vec<String>,
    /// Horizontal scroll offset
    pub offset_x: i32,
    /// Vertical scroll offset
    pub offset_y: i32,
    /// Viewport width in CSS pixels
    pub viewport_width: i32,
    /// Viewport height in CSS pixels
    pub viewport_height: i32,
    /// Document height in CSS pixels
    pub doc_height: i32,
    /// Device pixel ratio
    pub device_pixel_ratio: f64,
    /// Words visible in the viewport, in device pixels
    pub words: Vec<RecognizedWord>,
    /// Tiles laid out on the page
    pub tiles: Vec<MockTile>,
    calls: Vec<String>,
    clicks: Vec<ViewportPoint>,
    generation: u64,
    alive: bool,
    fail_next: Vec<String>,
    kill_next: Vec<String>,
    failing_launches: u32,
    on_click: Option<ClickHandler>,
    on_back: Option<PageHook>,
    on_open: Option<PageHook>,
}

impl std::fmt::Debug for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageState")
            .field("url", &self.url)
            .field("offset_y", &self.offset_y)
            .field("doc_height", &self.doc_height)
            .field("words", &self.words.len())
            .field("tiles", &self.tiles.len())
            .field("generation", &self.generation)
            .field("alive", &self.alive)
            .finish_non_exhaustive()
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            history: Vec::new(),
            offset_x: 0,
            offset_y: 0,
            viewport_width: 1600,
            viewport_height: 1000,
            doc_height: 1000,
            device_pixel_ratio: 1.0,
            words: Vec::new(),
            tiles: Vec::new(),
            calls: Vec::new(),
            clicks: Vec::new(),
            generation: 0,
            alive: true,
            fail_next: Vec::new(),
            kill_next: Vec::new(),
            failing_launches: 0,
            on_click: None,
            on_back: None,
            on_open: None,
        }
    }
}

impl PageState {
    /// Largest reachable vertical offset
    #[must_use]
    pub fn max_offset_y(&self) -> i32 {
        (self.doc_height - self.viewport_height).max(0)
    }

    /// Word under a viewport point, with a few pixels of slack
    #[must_use]
    pub fn word_at(&self, point: ViewportPoint) -> Option<&RecognizedWord> {
        let dx = (f64::from(point.x) * self.device_pixel_ratio).round() as i32;
        let dy = (f64::from(point.y) * self.device_pixel_ratio).round() as i32;
        self.words.iter().find(|w| {
            let b = w.bbox;
            PixelBox::new(b.x - 3, b.y - 3, b.width + 6, b.height + 6).contains(dx, dy)
        })
    }

    /// Tile under a viewport point
    #[must_use]
    pub fn tile_at(&self, point: ViewportPoint) -> Option<&MockTile> {
        let px = point.x + self.offset_x;
        let py = point.y + self.offset_y;
        self.tiles.iter().find(|t| t.page_box.contains(px, py))
    }

    /// Tiles whose center is inside the viewport, in device pixels
    #[must_use]
    pub fn visible_tiles(&self) -> Vec<TileDetection> {
        let dpr = self.device_pixel_ratio;
        let scale = |v: i32| (f64::from(v) * dpr).round() as i32;
        let frame = PixelBox::new(0, 0, scale(self.viewport_width), scale(self.viewport_height));
        self.tiles
            .iter()
            .map(|t| {
                let b = t.page_box;
                let device = PixelBox::new(
                    scale(b.x - self.offset_x),
                    scale(b.y - self.offset_y),
                    scale(b.width),
                    scale(b.height),
                );
                TileDetection::new(t.label.clone(), t.confidence, device)
            })
            .filter(|d| {
                let (cx, cy) = d.bbox.center();
                frame.contains(cx, cy)
            })
            .collect()
    }

    /// Whether a visible word reads `text` (case-insensitive)
    #[must_use]
    pub fn has_word(&self, text: &str) -> bool {
        self.words.iter().any(|w| w.text.eq_ignore_ascii_case(text))
    }

    /// Drop every word reading `text` (case-insensitive)
    pub fn remove_words(&mut self, text: &str) {
        self.words.retain(|w| !w.text.eq_ignore_ascii_case(text));
    }

    /// Replace the text of every word reading `from`
    pub fn replace_word_text(&mut self, from: &str, to: &str) {
        for w in &mut self.words {
            if w.text.eq_ignore_ascii_case(from) {
                w.text = to.to_string();
            }
        }
    }

    fn clamp_scroll(&mut self) {
        self.offset_y = self.offset_y.clamp(0, self.max_offset_y());
        // documents never overflow horizontally
        self.offset_x = 0;
    }

    fn reset_view(&mut self) {
        self.offset_x = 0;
        self.offset_y = 0;
    }
}

fn take_injection(list: &mut Vec<String>, op: &str) -> bool {
    match list.iter().position(|o| o == op) {
        Some(idx) => {
            list.remove(idx);
            true
        }
        None => false,
    }
}

// =============================================================================
// PAGE HANDLE
// =============================================================================

/// Shared handle to a scripted page
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    state: Arc<Mutex<PageState>>,
}

impl MockPage {
    /// A blank 1600x1000 page at ratio 1.0
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the page state
    pub fn update<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Set viewport size
    #[must_use]
    pub fn with_viewport(self, width: i32, height: i32) -> Self {
        self.update(|s| {
            s.viewport_width = width;
            s.viewport_height = height;
            s.doc_height = s.doc_height.max(height);
        });
        self
    }

    /// Set document height
    #[must_use]
    pub fn with_doc_height(self, height: i32) -> Self {
        self.update(|s| s.doc_height = height);
        self
    }

    /// Set device pixel ratio
    #[must_use]
    pub fn with_device_pixel_ratio(self, ratio: f64) -> Self {
        self.set_device_pixel_ratio(ratio);
        self
    }

    /// Set visible words
    #[must_use]
    pub fn with_words(self, words: Vec<RecognizedWord>) -> Self {
        self.set_words(words);
        self
    }

    /// Set page tiles
    #[must_use]
    pub fn with_tiles(self, tiles: Vec<MockTile>) -> Self {
        self.update(|s| s.tiles = tiles);
        self
    }

    /// Change the device pixel ratio
    pub fn set_device_pixel_ratio(&self, ratio: f64) {
        self.update(|s| s.device_pixel_ratio = ratio);
    }

    /// Replace visible words
    pub fn set_words(&self, words: Vec<RecognizedWord>) {
        self.update(|s| s.words = words);
    }

    /// Make the next call to `op` fail with a browser error
    pub fn fail_next(&self, op: &str) {
        self.update(|s| s.fail_next.push(op.to_string()));
    }

    /// Make the session die during the next call to `op`
    pub fn kill_next(&self, op: &str) {
        self.update(|s| s.kill_next.push(op.to_string()));
    }

    /// Kill the current session now
    pub fn kill(&self) {
        self.update(|s| s.alive = false);
    }

    /// Make the next `n` launches fail
    pub fn fail_launches(&self, n: u32) {
        self.update(|s| s.failing_launches = n);
    }

    /// React to clicks
    pub fn on_click(&self, handler: impl FnMut(&mut PageState, ViewportPoint) -> bool + Send + 'static) {
        self.update(|s| s.on_click = Some(Box::new(handler)));
    }

    /// React to back navigation
    pub fn on_back(&self, hook: impl FnMut(&mut PageState) + Send + 'static) {
        self.update(|s| s.on_back = Some(Box::new(hook)));
    }

    /// React to `open`
    pub fn on_open(&self, hook: impl FnMut(&mut PageState) + Send + 'static) {
        self.update(|s| s.on_open = Some(Box::new(hook)));
    }

    /// Recorded adapter calls
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.update(|s| s.calls.clone())
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.update(|s| s.calls.iter().filter(|c| c.starts_with(prefix)).count())
    }

    /// Whether `op` was called
    #[must_use]
    pub fn was_called(&self, op: &str) -> bool {
        self.count(op) > 0
    }

    /// Points clicked, after jitter
    #[must_use]
    pub fn clicks(&self) -> Vec<ViewportPoint> {
        self.update(|s| s.clicks.clone())
    }

    /// Current vertical offset
    #[must_use]
    pub fn offset_y(&self) -> i32 {
        self.update(|s| s.offset_y)
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> String {
        self.update(|s| s.url.clone())
    }

    /// Whether a visible word reads `text`
    #[must_use]
    pub fn has_word(&self, text: &str) -> bool {
        self.update(|s| s.has_word(text))
    }

    /// Adapter bound to the current session
    #[must_use]
    pub fn browser(&self) -> MockBrowser {
        MockBrowser {
            page: self.clone(),
            generation: self.update(|s| s.generation),
        }
    }

    /// Factory launching fresh sessions on this page
    #[must_use]
    pub fn factory(&self) -> MockFactory {
        MockFactory { page: self.clone() }
    }

    /// Recognizer reading this page's words
    #[must_use]
    pub fn recognizer(&self) -> MockRecognizer {
        MockRecognizer::new(self.clone())
    }

    /// Detector reading this page's tiles
    #[must_use]
    pub fn detector(&self) -> MockDetector {
        MockDetector::new(self.clone())
    }
}

// =============================================================================
// BROWSER
// =============================================================================

/// [`BrowserAdapter`] over a [`MockPage`]
#[derive(Debug, Clone)]
pub struct MockBrowser {
    page: MockPage,
    generation: u64,
}

impl MockBrowser {
    fn op<R>(&self, op: &str, entry: String, f: impl FnOnce(&mut PageState) -> R) -> ProbeResult<R> {
        let generation = self.generation;
        self.page.update(|s| {
            s.calls.push(entry);
            if s.generation != generation || !s.alive {
                return Err(ProbeError::session_invalid(format!("{op}: session closed")));
            }
            if take_injection(&mut s.kill_next, op) {
                s.alive = false;
                return Err(ProbeError::session_invalid(format!("{op}: session crashed")));
            }
            if take_injection(&mut s.fail_next, op) {
                return Err(ProbeError::browser(format!("{op}: injected failure")));
            }
            Ok(f(s))
        })
    }
}

impl BrowserAdapter for MockBrowser {
    fn open(&mut self, url: &str) -> ProbeResult<()> {
        let url = normalize_url(url);
        self.op("open", format!("open:{url}"), |s| {
            s.history.push(url.clone());
            s.url = url;
            s.reset_view();
            if let Some(mut hook) = s.on_open.take() {
                hook(s);
                s.on_open.get_or_insert(hook);
            }
        })
    }

    fn back(&mut self) -> ProbeResult<()> {
        self.op("back", "back".to_string(), |s| {
            s.history.pop();
            s.url = s.history.last().cloned().unwrap_or_else(|| "about:blank".to_string());
            s.reset_view();
            if let Some(mut hook) = s.on_back.take() {
                hook(s);
                s.on_back.get_or_insert(hook);
            }
        })
    }

    fn screenshot(&mut self) -> ProbeResult<DynamicImage> {
        self.op("screenshot", "screenshot".to_string(), |s| {
            let w = (f64::from(s.viewport_width) * s.device_pixel_ratio).round() as u32;
            let h = (f64::from(s.viewport_height) * s.device_pixel_ratio).round() as u32;
            DynamicImage::new_luma8(w.max(1), h.max(1))
        })
    }

    fn device_pixel_ratio(&mut self) -> ProbeResult<f64> {
        self.op("device_pixel_ratio", "device_pixel_ratio".to_string(), |s| s.device_pixel_ratio)
    }

    fn scroll_to(&mut self, x: i32, y: i32) -> ProbeResult<()> {
        self.op("scroll_to", format!("scroll_to:{x},{y}"), |s| {
            s.offset_x = x;
            s.offset_y = y;
            s.clamp_scroll();
        })
    }

    fn scroll_by(&mut self, dx: i32, dy: i32) -> ProbeResult<()> {
        self.op("scroll_by", format!("scroll_by:{dx},{dy}"), |s| {
            s.offset_x += dx;
            s.offset_y += dy;
            s.clamp_scroll();
        })
    }

    fn page_offset_x(&mut self) -> ProbeResult<i32> {
        self.op("page_offset_x", "page_offset_x".to_string(), |s| s.offset_x)
    }

    fn page_offset_y(&mut self) -> ProbeResult<i32> {
        self.op("page_offset_y", "page_offset_y".to_string(), |s| s.offset_y)
    }

    fn viewport_height(&mut self) -> ProbeResult<i32> {
        self.op("viewport_height", "viewport_height".to_string(), |s| s.viewport_height)
    }

    fn doc_height(&mut self) -> ProbeResult<i32> {
        self.op("doc_height", "doc_height".to_string(), |s| s.doc_height)
    }

    fn click_at_viewport_coords(&mut self, point: ViewportPoint, repeats: u32, jitter: i32) -> ProbeResult<bool> {
        self.op("click", format!("click:{},{}", point.x, point.y), |s| {
            let mut handler = s.on_click.take();
            let mut hit = false;
            for _ in 0..repeats.max(1) {
                let p = jittered(point, jitter);
                s.clicks.push(p);
                hit |= handler.as_mut().is_none_or(|h| h(s, p));
            }
            if s.on_click.is_none() {
                s.on_click = handler;
            }
            hit
        })
    }

    fn type_text(&mut self, text: &str) -> ProbeResult<()> {
        self.op("type_text", format!("type_text:{text}"), |_| ())
    }

    fn health(&mut self) -> SessionHealth {
        let generation = self.generation;
        self.page.update(|s| {
            if s.alive && s.generation == generation {
                SessionHealth::Alive
            } else {
                SessionHealth::Dead
            }
        })
    }

    fn close(&mut self) -> ProbeResult<()> {
        let generation = self.generation;
        self.page.update(|s| {
            s.calls.push("close".to_string());
            if s.generation == generation {
                s.alive = false;
            }
        });
        Ok(())
    }
}

/// [`BrowserFactory`] that starts a new session on a [`MockPage`]
#[derive(Debug, Clone)]
pub struct MockFactory {
    page: MockPage,
}

impl BrowserFactory for MockFactory {
    fn launch(&self) -> ProbeResult<Box<dyn BrowserAdapter>> {
        let generation = self.page.update(|s| {
            s.calls.push("launch".to_string());
            if s.failing_launches > 0 {
                s.failing_launches -= 1;
                return Err(ProbeError::BrowserLaunch {
                    message: "injected launch failure".to_string(),
                });
            }
            s.generation += 1;
            s.alive = true;
            s.url = "about:blank".to_string();
            s.reset_view();
            Ok(s.generation)
        })?;
        Ok(Box::new(MockBrowser {
            page: self.page.clone(),
            generation,
        }))
    }
}
