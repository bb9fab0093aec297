//! Device-pixel to viewport coordinate mapping.
//!
//! Detections come back in screenshot (device) pixels while clicks are
//! dispatched in CSS viewport pixels. The ratio is read from the page on
//! every call because it can change across navigations.

use crate::clock::Clock;
use crate::driver::BrowserAdapter;
use crate::geometry::{PixelBox, ViewportPoint};
use crate::result::ProbeResult;
use std::time::Duration;

/// Default horizontal padding kept between a scrolled-to point and the viewport edge
pub const DEFAULT_PAD_X: i32 = 800;

/// Default vertical padding
pub const DEFAULT_PAD_Y: i32 = 400;

/// Default pause between repeated clicks
pub const DEFAULT_CLICK_SETTLE: Duration = Duration::from_millis(50);

/// Converts detections into clickable viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    pad_x: i32,
    pad_y: i32,
    click_settle: Duration,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self {
            pad_x: DEFAULT_PAD_X,
            pad_y: DEFAULT_PAD_Y,
            click_settle: DEFAULT_CLICK_SETTLE,
        }
    }
}

impl CoordinateMapper {
    /// Mapper with default padding
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scroll padding
    #[must_use]
    pub const fn with_padding(mut self, pad_x: i32, pad_y: i32) -> Self {
        self.pad_x = pad_x;
        self.pad_y = pad_y;
        self
    }

    /// Set pause between repeated clicks
    #[must_use]
    pub const fn with_click_settle(mut self, settle: Duration) -> Self {
        self.click_settle = settle;
        self
    }

    /// Center of `bbox` in viewport pixels.
    ///
    /// Falls back to a ratio of 1.0 when the page cannot report one.
    pub fn to_viewport(&self, adapter: &mut dyn BrowserAdapter, bbox: &PixelBox) -> ViewportPoint {
        let dpr = match adapter.device_pixel_ratio() {
            Ok(r) if r.is_finite() && r > 0.0 => r,
            Ok(r) => {
                tracing::debug!(ratio = r, "unusable device pixel ratio, using 1.0");
                1.0
            }
            Err(err) => {
                tracing::debug!(error = %err, "device pixel ratio unavailable, using 1.0");
                1.0
            }
        };
        let (cx, cy) = bbox.center();
        ViewportPoint::new(
            (f64::from(cx) / dpr).round() as i32,
            (f64::from(cy) / dpr).round() as i32,
        )
    }

    /// Scroll so that `point` sits inside the padded viewport area and
    /// return where it lands afterwards.
    pub fn bring_into_view(&self, adapter: &mut dyn BrowserAdapter, point: ViewportPoint) -> ProbeResult<ViewportPoint> {
        let page_x = point.x + adapter.page_offset_x()?;
        let page_y = point.y + adapter.page_offset_y()?;
        adapter.scroll_to((page_x - self.pad_x).max(0), (page_y - self.pad_y).max(0))?;
        let landed = ViewportPoint::new(page_x - adapter.page_offset_x()?, page_y - adapter.page_offset_y()?);
        tracing::trace!(?point, ?landed, "brought into view");
        Ok(landed)
    }

    /// Click the center of `bbox` `repeats` times with random jitter.
    ///
    /// True when at least one click hit an element.
    pub fn click_center(
        &self,
        adapter: &mut dyn BrowserAdapter,
        clock: &dyn Clock,
        bbox: &PixelBox,
        jitter: i32,
        repeats: u32,
    ) -> ProbeResult<bool> {
        let point = self.to_viewport(adapter, bbox);
        let point = self.bring_into_view(adapter, point)?;
        let mut hit = false;
        for attempt in 0..repeats.max(1) {
            if attempt > 0 {
                clock.sleep(self.click_settle);
            }
            hit |= adapter.click_at_viewport_coords(point, 1, jitter)?;
        }
        Ok(hit)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::MockPage;

    mod viewport_tests {
        use super::*;

        #[test]
        fn test_divides_by_ratio() {
            let page = MockPage::new().with_device_pixel_ratio(2.0);
            let mut browser = page.browser();
            let p = CoordinateMapper::new().to_viewport(&mut browser, &PixelBox::new(100, 200, 40, 20));
            assert_eq!(p, ViewportPoint::new(60, 105));
        }

        #[test]
        fn test_ratio_failure_falls_back_to_one() {
            let page = MockPage::new().with_device_pixel_ratio(2.0);
            page.fail_next("device_pixel_ratio");
            let mut browser = page.browser();
            let p = CoordinateMapper::new().to_viewport(&mut browser, &PixelBox::new(100, 200, 40, 20));
            assert_eq!(p, ViewportPoint::new(120, 210));
        }

        #[test]
        fn test_ratio_read_live() {
            let page = MockPage::new();
            let mut browser = page.browser();
            let mapper = CoordinateMapper::new();
            let bbox = PixelBox::new(190, 90, 20, 20);
            assert_eq!(mapper.to_viewport(&mut browser, &bbox), ViewportPoint::new(200, 100));
            page.set_device_pixel_ratio(2.0);
            assert_eq!(mapper.to_viewport(&mut browser, &bbox), ViewportPoint::new(100, 50));
        }
    }

    mod scroll_tests {
        use super::*;

        #[test]
        fn test_point_lands_in_padded_area() {
            let page = MockPage::new().with_viewport(1600, 1000).with_doc_height(5000);
            let mut browser = page.browser();
            let landed = CoordinateMapper::new()
                .bring_into_view(&mut browser, ViewportPoint::new(300, 900))
                .unwrap();
            assert_eq!(page.offset_y(), 500);
            assert_eq!(landed, ViewportPoint::new(300, 400));
        }

        #[test]
        fn test_clamped_at_document_end() {
            let page = MockPage::new().with_viewport(1600, 1000).with_doc_height(1200);
            let mut browser = page.browser();
            let landed = CoordinateMapper::new()
                .bring_into_view(&mut browser, ViewportPoint::new(300, 900))
                .unwrap();
            assert_eq!(page.offset_y(), 200);
            assert_eq!(landed.y, 700);
        }
    }

    mod click_tests {
        use super::*;

        #[test]
        fn test_repeats_with_settle() {
            let page = MockPage::new();
            let mut browser = page.browser();
            let clock = FakeClock::new();
            let hit = CoordinateMapper::new()
                .click_center(&mut browser, &clock, &PixelBox::new(100, 100, 50, 50), 0, 2)
                .unwrap();
            assert!(hit);
            assert_eq!(page.clicks().len(), 2);
            assert_eq!(clock.now_ms(), 50);
        }

        #[test]
        fn test_zero_repeats_still_clicks_once() {
            let page = MockPage::new();
            let mut browser = page.browser();
            let clock = FakeClock::new();
            CoordinateMapper::new()
                .click_center(&mut browser, &clock, &PixelBox::new(0, 0, 10, 10), 0, 0)
                .unwrap();
            assert_eq!(page.clicks().len(), 1);
        }

        #[test]
        fn test_miss_reported() {
            let page = MockPage::new();
            page.on_click(|_, _| false);
            let mut browser = page.browser();
            let clock = FakeClock::new();
            let hit = CoordinateMapper::new()
                .click_center(&mut browser, &clock, &PixelBox::new(0, 0, 10, 10), 1, 1)
                .unwrap();
            assert!(!hit);
        }
    }
}
