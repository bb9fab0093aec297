//! Game tile opening.
//!
//! The scan looks for the tile with the detector on every frame. When it
//! finds the tile it clicks with increasing force until the lobby marker
//! goes away; when it doesn't (or the clicks didn't take) it scrolls one
//! step further down. The first time the scan hits the bottom of the page
//! it jumps back to the top once, because tiles render lazily. The second
//! bottom arrival ends the scan, and so does a scroll that didn't move.

use super::lobby::wait_lobby_gone;
use super::Interactor;
use crate::geometry::PixelBox;
use crate::locator::{SearchContext, TargetQuery, DEFAULT_MIN_CONFIDENCE};
use crate::result::{StepFailure, StepResult};
use crate::wait::PollOptions;
use serde::Serialize;

/// Scan parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileScan {
    /// Minimum detector confidence
    pub min_confidence: f32,
    /// Scroll step in CSS pixels
    pub step: i32,
    /// Bottom arrivals before giving up
    pub max_bottom_passes: u32,
}

impl Default for TileScan {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            step: 520,
            max_bottom_passes: 2,
        }
    }
}

/// Click escalation stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickStage {
    /// One click at the center
    Single,
    /// Two quick clicks at the center
    Double,
    /// One click below the center
    Lowered,
}

impl ClickStage {
    /// Stages in escalation order
    pub const ALL: [Self; 3] = [Self::Single, Self::Double, Self::Lowered];

    /// Box to click at this stage
    #[must_use]
    pub fn target(self, bbox: &PixelBox) -> PixelBox {
        match self {
            Self::Single | Self::Double => *bbox,
            Self::Lowered => bbox.shifted_down((bbox.height / 6).max(8)),
        }
    }

    const fn jitter(self) -> i32 {
        match self {
            Self::Single => 2,
            Self::Double | Self::Lowered => 1,
        }
    }

    const fn repeats(self) -> u32 {
        match self {
            Self::Double => 2,
            Self::Single | Self::Lowered => 1,
        }
    }

    fn wait(self, it: &Interactor) -> PollOptions {
        match self {
            Self::Single => it.timings().tile_click_wait,
            Self::Double | Self::Lowered => it.timings().tile_escalation_wait,
        }
    }
}

impl std::fmt::Display for ClickStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Lowered => "lowered",
        })
    }
}

/// A tile that opened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileOpen {
    /// Tile id
    pub tile_id: String,
    /// Stage whose click left the lobby
    pub stage: ClickStage,
    /// Forward scroll steps taken
    pub scrolls: u32,
    /// Detector confidence of the clicked tile
    pub confidence: f32,
}

/// Find `tile_id` in the lobby and open it
pub fn open_tile(it: &mut Interactor, tile_id: &str, scan: &TileScan) -> StepResult<TileOpen> {
    let query = TargetQuery::tile(tile_id);
    let ctx = SearchContext::new().with_min_confidence(scan.min_confidence);
    let mut bottom_passes = 0u32;
    let mut reset_to_top = false;
    let mut scrolls = 0u32;

    loop {
        if let Some(hit) = it.locate(&query, &ctx)? {
            for stage in ClickStage::ALL {
                let clicked = it.click_box(&stage.target(&hit.bbox), stage.jitter(), stage.repeats())?;
                let wait = stage.wait(it);
                let opened = wait_lobby_gone(it, wait)?;
                tracing::info!(
                    tile = tile_id,
                    %stage,
                    detected = true,
                    clicked,
                    opened,
                    confidence = hit.confidence,
                    bottom_passes,
                    "tile click"
                );
                if opened {
                    return Ok(TileOpen {
                        tile_id: tile_id.to_string(),
                        stage,
                        scrolls,
                        confidence: hit.confidence,
                    });
                }
            }
        }

        let offset_before = it.browser().page_offset_y()?;
        if it.browser().at_bottom()? {
            bottom_passes += 1;
            if !reset_to_top {
                reset_to_top = true;
                tracing::info!(tile = tile_id, offset_y = offset_before, bottom_passes, "bottom reached, back to top");
                it.browser().scroll_to(0, 0)?;
                it.sleep(it.timings().scroll_settle);
                continue;
            }
            if bottom_passes >= scan.max_bottom_passes {
                tracing::info!(tile = tile_id, detected = false, bottom_passes, "scan exhausted");
                return Err(StepFailure::ScanExhausted { bottom_passes });
            }
        } else {
            it.browser().scroll_by(0, scan.step)?;
            scrolls += 1;
        }
        it.sleep(it.timings().scroll_settle);

        let offset_after = it.browser().page_offset_y()?;
        tracing::info!(tile = tile_id, offset_y = offset_after, bottom_passes, "scan step");
        if offset_after == offset_before {
            return Err(StepFailure::ScrollStuck { offset_y: offset_after });
        }
    }
}
