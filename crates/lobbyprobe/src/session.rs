//! Session recovery.
//!
//! [`SessionGuard`] owns the single browser session and is itself a
//! [`BrowserAdapter`], so protocols use it like any other adapter. Before
//! each call it checks [`BrowserAdapter::health`]; when a call fails with a
//! session-invalid error (or leaves the session dead) it discards the
//! session, launches a new one through the [`BrowserFactory`], restores the
//! last opened URL and then either retries the call or returns a neutral
//! value, depending on the operation.
//!
//! Recovery happens at most once per call. If it fails the call returns
//! [`ProbeError::SessionLost`].

use crate::clock::SharedClock;
use crate::driver::{normalize_url, BrowserAdapter, BrowserFactory, SessionHealth};
use crate::geometry::ViewportPoint;
use crate::result::{ProbeError, ProbeResult};
use image::DynamicImage;
use std::time::Duration;

/// Default settle after restoring the last URL
pub const DEFAULT_RESTORE_SETTLE: Duration = Duration::from_millis(800);

/// What a call does after the session was re-created
enum Recovery<T> {
    /// Run the call again on the new session
    Retry,
    /// Return this value without re-running
    Yield(T),
}

/// Browser adapter that survives session loss
#[derive(Debug)]
pub struct SessionGuard {
    factory: Box<dyn BrowserFactory>,
    adapter: Option<Box<dyn BrowserAdapter>>,
    last_url: Option<String>,
    clock: SharedClock,
    restore_settle: Duration,
    recoveries: u32,
}

impl SessionGuard {
    /// Guard sessions created by `factory`; nothing is launched yet
    #[must_use]
    pub fn new(factory: Box<dyn BrowserFactory>, clock: SharedClock) -> Self {
        Self {
            factory,
            adapter: None,
            last_url: None,
            clock,
            restore_settle: DEFAULT_RESTORE_SETTLE,
            recoveries: 0,
        }
    }

    /// Set the settle after restoring the last URL
    #[must_use]
    pub const fn with_restore_settle(mut self, settle: Duration) -> Self {
        self.restore_settle = settle;
        self
    }

    /// Launch the first session.
    ///
    /// # Errors
    ///
    /// Returns the factory error unchanged; failing here is fatal for a run.
    pub fn start(&mut self) -> ProbeResult<()> {
        if self.adapter.is_none() {
            self.adapter = Some(self.factory.launch()?);
            tracing::debug!("browser session started");
        }
        Ok(())
    }

    /// Number of recoveries performed so far
    #[must_use]
    pub const fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Last URL passed to `open`
    #[must_use]
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// Replace the current session with a fresh one and restore the last URL
    pub fn recover(&mut self) -> ProbeResult<()> {
        if let Some(mut old) = self.adapter.take() {
            if let Err(err) = old.close() {
                tracing::debug!(error = %err, "closing dead session failed");
            }
        }
        let mut fresh = self.factory.launch().map_err(|e| ProbeError::SessionLost {
            message: format!("relaunch failed: {e}"),
        })?;
        if let Some(url) = &self.last_url {
            fresh.open(url).map_err(|e| ProbeError::SessionLost {
                message: format!("restoring {url} failed: {e}"),
            })?;
            self.clock.sleep(self.restore_settle);
        }
        self.adapter = Some(fresh);
        self.recoveries += 1;
        tracing::warn!(
            recoveries = self.recoveries,
            url = self.last_url.as_deref().unwrap_or(""),
            "browser session recovered"
        );
        Ok(())
    }

    fn ensure_alive(&mut self) -> ProbeResult<()> {
        let dead = match self.adapter.as_mut() {
            None => true,
            Some(adapter) => adapter.health() == SessionHealth::Dead,
        };
        if dead {
            self.recover()?;
        }
        Ok(())
    }

    fn adapter(&mut self) -> ProbeResult<&mut Box<dyn BrowserAdapter>> {
        self.adapter.as_mut().ok_or_else(|| ProbeError::SessionLost {
            message: "no browser session".to_string(),
        })
    }

    fn call<T>(
        &mut self,
        op: &str,
        on_recovery: Recovery<T>,
        mut f: impl FnMut(&mut dyn BrowserAdapter) -> ProbeResult<T>,
    ) -> ProbeResult<T> {
        self.ensure_alive()?;
        let adapter = self.adapter()?;
        let err = match f(adapter.as_mut()) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let dead = err.is_session_invalid() || adapter.health() == SessionHealth::Dead;
        if !dead {
            return Err(err);
        }
        tracing::warn!(op, error = %err, "browser session invalid, recovering");
        self.recover()?;
        match on_recovery {
            Recovery::Retry => f(self.adapter()?.as_mut()),
            Recovery::Yield(value) => Ok(value),
        }
    }
}

impl BrowserAdapter for SessionGuard {
    fn open(&mut self, url: &str) -> ProbeResult<()> {
        let url = normalize_url(url);
        self.last_url = Some(url.clone());
        // recovery already navigates to the new last URL
        self.call("open", Recovery::Yield(()), |a| a.open(&url))
    }

    fn back(&mut self) -> ProbeResult<()> {
        self.call("back", Recovery::Yield(()), |a| a.back())
    }

    fn screenshot(&mut self) -> ProbeResult<DynamicImage> {
        self.call("screenshot", Recovery::Retry, |a| a.screenshot())
    }

    fn device_pixel_ratio(&mut self) -> ProbeResult<f64> {
        self.call("device_pixel_ratio", Recovery::Retry, |a| a.device_pixel_ratio())
    }

    fn scroll_to(&mut self, x: i32, y: i32) -> ProbeResult<()> {
        self.call("scroll_to", Recovery::Retry, |a| a.scroll_to(x, y))
    }

    fn scroll_by(&mut self, dx: i32, dy: i32) -> ProbeResult<()> {
        self.call("scroll_by", Recovery::Retry, |a| a.scroll_by(dx, dy))
    }

    fn page_offset_x(&mut self) -> ProbeResult<i32> {
        self.call("page_offset_x", Recovery::Retry, |a| a.page_offset_x())
    }

    fn page_offset_y(&mut self) -> ProbeResult<i32> {
        self.call("page_offset_y", Recovery::Retry, |a| a.page_offset_y())
    }

    fn viewport_height(&mut self) -> ProbeResult<i32> {
        self.call("viewport_height", Recovery::Retry, |a| a.viewport_height())
    }

    fn doc_height(&mut self) -> ProbeResult<i32> {
        self.call("doc_height", Recovery::Retry, |a| a.doc_height())
    }

    fn at_bottom(&mut self) -> ProbeResult<bool> {
        self.call("at_bottom", Recovery::Retry, |a| a.at_bottom())
    }

    fn click_at_viewport_coords(&mut self, point: ViewportPoint, repeats: u32, jitter: i32) -> ProbeResult<bool> {
        // coordinates are meaningless on a freshly restored page
        self.call("click", Recovery::Yield(false), |a| {
            a.click_at_viewport_coords(point, repeats, jitter)
        })
    }

    fn type_text(&mut self, text: &str) -> ProbeResult<()> {
        self.call("type_text", Recovery::Yield(()), |a| a.type_text(text))
    }

    fn health(&mut self) -> SessionHealth {
        self.adapter
            .as_mut()
            .map_or(SessionHealth::Dead, |a| a.health())
    }

    fn close(&mut self) -> ProbeResult<()> {
        match self.adapter.take() {
            Some(mut adapter) => adapter.close(),
            None => Ok(()),
        }
    }
}
