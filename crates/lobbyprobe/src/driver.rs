//! Browser adapter contract.
//!
//! The engine never touches a browser directly. Everything it needs from
//! one (navigation, screenshots, scroll geometry, coordinate clicks) goes
//! through [`BrowserAdapter`], which lets the same protocols run against
//! Chromium in production and against [`crate::mock::MockBrowser`] in tests.
//!
//! Adapters are synchronous. The Chromium adapter hides its async runtime
//! behind the trait, which keeps the protocol code free of executors.
//!
//! An adapter whose session has died must answer with
//! [`ProbeError::SessionInvalid`] and report [`SessionHealth::Dead`]; that
//! is the signal [`crate::session::SessionGuard`] recovers from.

use crate::geometry::ViewportPoint;
use crate::result::ProbeResult;
use image::DynamicImage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(doc)]
use crate::result::ProbeError;

/// Slack in pixels when deciding whether the viewport reached the bottom
pub const BOTTOM_SLACK_PX: i32 = 4;

/// Liveness of the underlying browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionHealth {
    /// Session answers commands
    Alive,
    /// Session is gone and must be re-created
    Dead,
}

impl SessionHealth {
    /// Whether the session is usable
    #[must_use]
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Synchronous browser operations the engine depends on
pub trait BrowserAdapter: Send + std::fmt::Debug {
    /// Navigate to `url`
    fn open(&mut self, url: &str) -> ProbeResult<()>;

    /// Navigate back in history
    fn back(&mut self) -> ProbeResult<()>;

    /// Capture the viewport in device pixels
    fn screenshot(&mut self) -> ProbeResult<DynamicImage>;

    /// Current device pixel ratio
    fn device_pixel_ratio(&mut self) -> ProbeResult<f64>;

    /// Scroll to an absolute page offset in CSS pixels
    fn scroll_to(&mut self, x: i32, y: i32) -> ProbeResult<()>;

    /// Scroll by a relative amount in CSS pixels
    fn scroll_by(&mut self, dx: i32, dy: i32) -> ProbeResult<()>;

    /// Horizontal scroll offset
    fn page_offset_x(&mut self) -> ProbeResult<i32>;

    /// Vertical scroll offset
    fn page_offset_y(&mut self) -> ProbeResult<i32>;

    /// Viewport height in CSS pixels
    fn viewport_height(&mut self) -> ProbeResult<i32>;

    /// Scrollable document height in CSS pixels
    fn doc_height(&mut self) -> ProbeResult<i32>;

    /// Whether the viewport shows the end of the document
    fn at_bottom(&mut self) -> ProbeResult<bool> {
        let offset = self.page_offset_y()?;
        let viewport = self.viewport_height()?;
        let doc = self.doc_height()?;
        Ok(offset + viewport >= doc - BOTTOM_SLACK_PX)
    }

    /// Click `repeats` times near `point`, each click offset by up to
    /// `jitter` pixels on both axes. True when any click hit an element.
    fn click_at_viewport_coords(&mut self, point: ViewportPoint, repeats: u32, jitter: i32) -> ProbeResult<bool>;

    /// Type into the focused element
    fn type_text(&mut self, text: &str) -> ProbeResult<()>;

    /// Probe whether the session is still usable
    fn health(&mut self) -> SessionHealth;

    /// Release the session
    fn close(&mut self) -> ProbeResult<()>;
}

/// Creates fresh browser sessions
pub trait BrowserFactory: Send + std::fmt::Debug {
    /// Launch a new session
    fn launch(&self) -> ProbeResult<Box<dyn BrowserAdapter>>;
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Window width in CSS pixels
    pub window_width: u32,
    /// Window height in CSS pixels
    pub window_height: u32,
    /// Navigation timeout
    pub navigation_timeout: Duration,
    /// Chromium executable, autodetected when `None`
    pub executable: Option<std::path::PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1600,
            window_height: 1000,
            navigation_timeout: Duration::from_secs(45),
            executable: None,
        }
    }
}

impl DriverConfig {
    /// Create default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set window size
    #[must_use]
    pub const fn window(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn executable(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

/// Prefix `https://` when `url` carries no scheme
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") || trimmed.starts_with("about:") || trimmed.starts_with("data:") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Offset `point` by an independent random amount in `[-jitter, jitter]` per axis
#[must_use]
pub fn jittered(point: ViewportPoint, jitter: i32) -> ViewportPoint {
    if jitter <= 0 {
        return point;
    }
    let mut rng = rand::rng();
    point.offset(rng.random_range(-jitter..=jitter), rng.random_range(-jitter..=jitter))
}
