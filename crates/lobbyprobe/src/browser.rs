//! Chromium adapter over the Chrome DevTools Protocol.
//!
//! With the `browser` feature, [`CdpFactory`] launches Chromium through
//! chromiumoxide and hands out [`CdpAdapter`]s. Each adapter owns a private
//! current-thread tokio runtime and blocks on it for every call, so the
//! [`BrowserAdapter`] surface stays synchronous.
//!
//! Without the feature, [`CdpFactory::launch`] fails with
//! `ProbeError::BrowserLaunch`; everything else in the crate still works
//! against [`crate::mock::MockBrowser`].

use crate::driver::{BrowserAdapter, BrowserFactory, DriverConfig};
#[cfg(not(feature = "browser"))]
use crate::result::ProbeError;
use crate::result::ProbeResult;

/// Launches Chromium sessions
#[derive(Debug, Clone, Default)]
pub struct CdpFactory {
    config: DriverConfig,
}

impl CdpFactory {
    /// Create a factory
    #[must_use]
    pub const fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Launch settings
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Whether this build can drive a real browser
    #[must_use]
    pub const fn available() -> bool {
        cfg!(feature = "browser")
    }
}

impl BrowserFactory for CdpFactory {
    #[cfg(feature = "browser")]
    fn launch(&self) -> ProbeResult<Box<dyn BrowserAdapter>> {
        Ok(Box::new(cdp::CdpAdapter::launch(self.config.clone())?))
    }

    #[cfg(not(feature = "browser"))]
    fn launch(&self) -> ProbeResult<Box<dyn BrowserAdapter>> {
        Err(ProbeError::BrowserLaunch {
            message: "built without the `browser` feature".to_string(),
        })
    }
}

#[cfg(feature = "browser")]
pub use cdp::CdpAdapter;

/// Dispatches a synthetic click on the element under a viewport point
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn click_script(x: i32, y: i32) -> String {
    format!(
        "(() => {{\
            const el = document.elementFromPoint({x}, {y});\
            if (!el) return false;\
            const init = {{ bubbles: true, cancelable: true, view: window, clientX: {x}, clientY: {y} }};\
            for (const type of ['mousemove', 'mousedown', 'mouseup', 'click']) {{\
                el.dispatchEvent(new MouseEvent(type, init));\
            }}\
            return true;\
        }})()"
    )
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const DOC_HEIGHT_SCRIPT: &str = "Math.max(document.body ? document.body.scrollHeight : 0, \
     document.documentElement ? document.documentElement.scrollHeight : 0)";

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::{click_script, DOC_HEIGHT_SCRIPT};
    use crate::driver::{jittered, normalize_url, BrowserAdapter, DriverConfig, SessionHealth};
    use crate::geometry::ViewportPoint;
    use crate::result::{ProbeError, ProbeResult};
    use base64::Engine;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, GetNavigationHistoryParams, NavigateToHistoryEntryParams,
    };
    use chromiumoxide::error::CdpError;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use image::DynamicImage;
    use serde::de::DeserializeOwned;
    use tokio::runtime::Runtime;
    use tokio::task::JoinHandle;

    fn cdp_error(op: &str, err: CdpError) -> ProbeError {
        if matches!(err, CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse) {
            ProbeError::session_invalid(format!("{op}: {err}"))
        } else {
            ProbeError::browser(format!("{op}: {err}"))
        }
    }

    /// One Chromium window driven over CDP
    #[derive(Debug)]
    pub struct CdpAdapter {
        config: DriverConfig,
        runtime: Runtime,
        browser: Browser,
        page: Page,
        handler: JoinHandle<()>,
        closed: bool,
    }

    impl CdpAdapter {
        /// Launch Chromium and open a blank page
        pub fn launch(config: DriverConfig) -> ProbeResult<Self> {
            let launch_error = |message: String| ProbeError::BrowserLaunch { message };
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| launch_error(e.to_string()))?;

            let mut builder = BrowserConfig::builder()
                .window_size(config.window_width, config.window_height)
                .request_timeout(config.navigation_timeout);
            if !config.headless {
                builder = builder.with_head();
            }
            if let Some(ref path) = config.executable {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(launch_error)?;

            let (browser, page, handler) = runtime.block_on(async {
                let (browser, mut handler) = Browser::launch(cdp_config)
                    .await
                    .map_err(|e| launch_error(e.to_string()))?;
                let handler = tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if event.is_err() {
                            break;
                        }
                    }
                });
                let page = browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| launch_error(e.to_string()))?;
                page.execute(SetDeviceMetricsOverrideParams::new(
                    i64::from(config.window_width),
                    i64::from(config.window_height),
                    0.0,
                    false,
                ))
                .await
                .map_err(|e| launch_error(e.to_string()))?;
                Ok::<_, ProbeError>((browser, page, handler))
            })?;

            tracing::info!(
                headless = config.headless,
                width = config.window_width,
                height = config.window_height,
                "chromium launched"
            );
            Ok(Self {
                config,
                runtime,
                browser,
                page,
                handler,
                closed: false,
            })
        }

        fn ensure_open(&self, op: &str) -> ProbeResult<()> {
            if self.closed {
                return Err(ProbeError::session_invalid(format!("{op}: adapter closed")));
            }
            Ok(())
        }

        fn run(&mut self, op: &str, expr: &str) -> ProbeResult<()> {
            self.ensure_open(op)?;
            self.runtime
                .block_on(self.page.evaluate(expr.to_string()))
                .map_err(|e| cdp_error(op, e))?;
            Ok(())
        }

        fn eval<T: DeserializeOwned>(&mut self, op: &str, expr: &str) -> ProbeResult<T> {
            self.ensure_open(op)?;
            let result = self
                .runtime
                .block_on(self.page.evaluate(expr.to_string()))
                .map_err(|e| cdp_error(op, e))?;
            result
                .into_value()
                .map_err(|e| ProbeError::browser(format!("{op}: {e}")))
        }

        fn eval_i32(&mut self, op: &str, expr: &str) -> ProbeResult<i32> {
            let value: f64 = self.eval(op, expr)?;
            Ok(value.round() as i32)
        }

        fn history_back(&mut self) -> ProbeResult<()> {
            let page = &self.page;
            self.runtime.block_on(async {
                let history = page
                    .execute(GetNavigationHistoryParams::default())
                    .await
                    .map_err(|e| cdp_error("back", e))?;
                let index = usize::try_from(history.current_index - 1)
                    .map_err(|_| ProbeError::browser("back: no previous history entry"))?;
                let entry = history
                    .entries
                    .get(index)
                    .ok_or_else(|| ProbeError::browser("back: history entry missing"))?;
                page.execute(NavigateToHistoryEntryParams::new(entry.id))
                    .await
                    .map_err(|e| cdp_error("back", e))?;
                Ok(())
            })
        }
    }

    impl BrowserAdapter for CdpAdapter {
        fn open(&mut self, url: &str) -> ProbeResult<()> {
            self.ensure_open("open")?;
            let url = normalize_url(url);
            let timeout = self.config.navigation_timeout;
            let page = &self.page;
            let navigation = self
                .runtime
                .block_on(async { tokio::time::timeout(timeout, page.goto(url.as_str())).await });
            match navigation {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => match cdp_error("open", e) {
                    err @ ProbeError::SessionInvalid { .. } => Err(err),
                    other => Err(ProbeError::Navigation {
                        url,
                        message: other.to_string(),
                    }),
                },
                Err(_) => Err(ProbeError::Timeout {
                    ms: timeout.as_millis() as u64,
                }),
            }
        }

        fn back(&mut self) -> ProbeResult<()> {
            self.ensure_open("back")?;
            match self.history_back() {
                Err(err) if !err.is_session_invalid() => {
                    tracing::debug!(error = %err, "native back failed, using history.back()");
                    self.run("back", "history.back()")
                }
                other => other,
            }
        }

        fn screenshot(&mut self) -> ProbeResult<DynamicImage> {
            self.ensure_open("screenshot")?;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let shot = self
                .runtime
                .block_on(self.page.execute(params))
                .map_err(|e| cdp_error("screenshot", e))?;
            let png = base64::engine::general_purpose::STANDARD
                .decode(&shot.data)
                .map_err(|e| ProbeError::Image {
                    message: e.to_string(),
                })?;
            Ok(image::load_from_memory(&png)?)
        }

        fn device_pixel_ratio(&mut self) -> ProbeResult<f64> {
            self.eval("device_pixel_ratio", "window.devicePixelRatio || 1")
        }

        fn scroll_to(&mut self, x: i32, y: i32) -> ProbeResult<()> {
            self.run("scroll_to", &format!("window.scrollTo({x}, {y})"))
        }

        fn scroll_by(&mut self, dx: i32, dy: i32) -> ProbeResult<()> {
            self.run("scroll_by", &format!("window.scrollBy({dx}, {dy})"))
        }

        fn page_offset_x(&mut self) -> ProbeResult<i32> {
            self.eval_i32("page_offset_x", "window.pageXOffset || 0")
        }

        fn page_offset_y(&mut self) -> ProbeResult<i32> {
            self.eval_i32("page_offset_y", "window.pageYOffset || 0")
        }

        fn viewport_height(&mut self) -> ProbeResult<i32> {
            self.eval_i32("viewport_height", "window.innerHeight")
        }

        fn doc_height(&mut self) -> ProbeResult<i32> {
            self.eval_i32("doc_height", DOC_HEIGHT_SCRIPT)
        }

        fn click_at_viewport_coords(&mut self, point: ViewportPoint, repeats: u32, jitter: i32) -> ProbeResult<bool> {
            let mut hit = false;
            for _ in 0..repeats.max(1) {
                let p = jittered(point, jitter);
                hit |= self.eval::<bool>("click", &click_script(p.x, p.y))?;
            }
            Ok(hit)
        }

        fn type_text(&mut self, text: &str) -> ProbeResult<()> {
            self.ensure_open("type_text")?;
            self.runtime
                .block_on(self.page.execute(InsertTextParams::new(text)))
                .map_err(|e| cdp_error("type_text", e))?;
            Ok(())
        }

        fn health(&mut self) -> SessionHealth {
            if self.closed {
                return SessionHealth::Dead;
            }
            match self.runtime.block_on(self.page.evaluate("1".to_string())) {
                Ok(_) => SessionHealth::Alive,
                Err(e) => {
                    tracing::debug!(error = %e, "health probe failed");
                    SessionHealth::Dead
                }
            }
        }

        fn close(&mut self) -> ProbeResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            let result = self.runtime.block_on(self.browser.close());
            self.handler.abort();
            result.map(|_| ()).map_err(|e| ProbeError::browser(format!("close: {e}")))
        }
    }

    impl Drop for CdpAdapter {
        fn drop(&mut self) {
            if !self.closed {
                let _ = self.close();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_click_script_targets_point() {
        let script = click_script(120, 45);
        assert!(script.contains("elementFromPoint(120, 45)"));
        assert!(script.contains("'mousedown'"));
        assert!(script.contains("return true"));
    }

    #[test]
    fn test_factory_keeps_config() {
        let factory = CdpFactory::new(DriverConfig::new().window(1280, 800));
        assert_eq!(factory.config().window_width, 1280);
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_launch_without_feature_fails() {
        let err = CdpFactory::default().launch().unwrap_err();
        assert!(matches!(err, ProbeError::BrowserLaunch { .. }));
        assert!(!CdpFactory::available());
    }
}
