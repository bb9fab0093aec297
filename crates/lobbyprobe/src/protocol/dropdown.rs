//! Dropdown selection (operator and currency).
//!
//! Each attempt runs `Idle -> Opened -> Picked -> Verified`:
//!
//! 1. open the dropdown by clicking the value currently shown, or a fixed
//!    offset right of the label when no known value is visible
//! 2. anchor a search region below the current value (or the label)
//! 3. click the first variant of the desired value found in that region,
//!    falling back to the whole frame
//! 4. poll until a variant of the desired value shows next to the label
//!
//! The label is located once; a missing label fails at once since it
//! means the page is not the lobby. Everything below the campaign panels
//! is excluded from value searches.

use super::Interactor;
use crate::canonical::{canonical_operator, currency_variants, known_operator_values, text_variants};
use crate::geometry::{dropdown_region_below, value_region_right_of, DropdownPadding, PixelBox, ViewportPoint};
use crate::locator::{SearchContext, TargetQuery};
use crate::result::{ProbeResult, StepFailure, StepResult};
use image::DynamicImage;
use serde::Serialize;

/// Attempts per selection
pub const MAX_ATTEMPTS: u32 = 3;

/// Minimum score when locating a field label
pub const LABEL_MIN_SCORE: u8 = 70;

/// Minimum score for campaign markers and verification
pub const VERIFY_MIN_SCORE: u8 = 72;

/// Panels whose top edge bounds value searches from below
pub const CAMPAIGN_MARKERS: &[&str] = &["Create Free Game Campaign", "Cancel Free Game Campaign"];

/// Values the currency dropdown may currently display
pub const KNOWN_CURRENCY_VALUES: &[&str] = &["SC", "WOW", "USD", "EUR", "GBP"];

/// Offset from the label center to the default dropdown trigger, in viewport pixels
const TRIGGER_OFFSET: (i32, i32) = (200, 36);

/// A dropdown-backed field
#[derive(Debug, Clone)]
pub struct DropdownField {
    /// Name used in logs
    pub name: &'static str,
    /// Registry key of the field label
    pub label_key: String,
    /// Values the field may be showing before it is opened, in search order
    pub current_values: Vec<String>,
    /// Minimum score when matching the current value
    pub open_min_score: u8,
    /// Jitter of the opening click
    pub open_jitter: i32,
    /// Minimum score when matching an option
    pub pick_min_score: u8,
    pick_variants: fn(&str) -> Vec<String>,
    verify_variants: fn(&str) -> Vec<String>,
}

fn operator_renderings(desired: &str) -> Vec<String> {
    canonical_operator(desired).variants()
}

impl DropdownField {
    /// The operator field
    #[must_use]
    pub fn operator() -> Self {
        Self {
            name: "operator",
            label_key: "operator_label".to_string(),
            current_values: known_operator_values(),
            open_min_score: 70,
            open_jitter: 1,
            pick_min_score: 70,
            pick_variants: operator_renderings,
            verify_variants: operator_renderings,
        }
    }

    /// The currency field
    #[must_use]
    pub fn currency() -> Self {
        Self {
            name: "currency",
            label_key: "currency_label".to_string(),
            current_values: KNOWN_CURRENCY_VALUES.iter().map(|s| (*s).to_string()).collect(),
            open_min_score: 68,
            open_jitter: 0,
            pick_min_score: 68,
            pick_variants: currency_variants,
            verify_variants: text_variants,
        }
    }

    /// Renderings accepted when picking `desired`
    #[must_use]
    pub fn pick_variants(&self, desired: &str) -> Vec<String> {
        (self.pick_variants)(desired)
    }

    /// Renderings accepted when verifying `desired`
    #[must_use]
    pub fn verify_variants(&self, desired: &str) -> Vec<String> {
        (self.verify_variants)(desired)
    }
}

/// A verified selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Field name
    pub field: String,
    /// Requested value
    pub desired: String,
    /// Attempt that verified
    pub attempts: u32,
}

/// Select `desired` in `field`
pub fn select(it: &mut Interactor, field: &DropdownField, desired: &str) -> StepResult<Selection> {
    let frame = it.snapshot()?;
    let label = it
        .locate_in(
            &frame,
            &TargetQuery::key(field.label_key.clone()),
            &SearchContext::new().with_min_score(LABEL_MIN_SCORE),
        )
        .ok_or_else(|| {
            tracing::info!(field = field.name, "label not found");
            StepFailure::not_found(field.label_key.clone())
        })?
        .bbox;
    let guard_y = guard_line(it, &frame);

    let pick = field.pick_variants(desired);
    let verify = field.verify_variants(desired);
    let mut ever_picked = false;

    for attempt in 1..=MAX_ATTEMPTS {
        let (opened, open_box) = open(it, field, &label, guard_y)?;
        it.sleep(it.timings().dropdown_open_settle);

        let frame = it.snapshot()?;
        let anchor = current_value(it, &frame, field, &label, guard_y)
            .or(open_box)
            .unwrap_or(label);
        let roi = dropdown_region_below(&anchor, DropdownPadding::default(), frame.width(), frame.height());

        let picked = pick_option(it, &frame, field, &pick, Some(roi))?
            || pick_option(it, &frame, field, &pick, None)?;
        ever_picked |= picked;

        let verified = picked && {
            let options = it.timings().dropdown_verify;
            it.wait_for(options, |it| value_shown(it, field, &verify))?.success
        };

        tracing::info!(field = field.name, desired, attempt, opened, picked, verified, "dropdown attempt");
        if verified {
            return Ok(Selection {
                field: field.name.to_string(),
                desired: desired.to_string(),
                attempts: attempt,
            });
        }
        it.sleep(it.timings().dropdown_pause);
    }

    Err(if ever_picked {
        StepFailure::VerificationTimeout { attempts: MAX_ATTEMPTS }
    } else {
        StepFailure::not_found(desired)
    })
}

/// Top of the highest campaign panel, if any is visible
fn guard_line(it: &Interactor, frame: &DynamicImage) -> Option<i32> {
    let ctx = SearchContext::new().exact().with_min_score(VERIFY_MIN_SCORE);
    CAMPAIGN_MARKERS
        .iter()
        .filter_map(|marker| it.locate_in(frame, &TargetQuery::text([*marker]), &ctx))
        .map(|hit| hit.bbox.y)
        .min()
}

/// Click the shown value, or the default trigger position next to the label
fn open(
    it: &mut Interactor,
    field: &DropdownField,
    label: &PixelBox,
    guard_y: Option<i32>,
) -> ProbeResult<(bool, Option<PixelBox>)> {
    let frame = it.snapshot()?;
    let ctx = SearchContext::new()
        .exact()
        .with_min_score(field.open_min_score)
        .with_avoid_below(guard_y);
    for value in &field.current_values {
        if let Some(hit) = it.locate_in(&frame, &TargetQuery::text([value.as_str()]), &ctx) {
            if it.click_box(&hit.bbox, field.open_jitter, 1)? {
                return Ok((true, Some(hit.bbox)));
            }
        }
    }
    let center = it.to_viewport(label);
    let trigger: ViewportPoint = center.offset(TRIGGER_OFFSET.0, TRIGGER_OFFSET.1);
    tracing::debug!(field = field.name, ?trigger, "no current value visible, clicking default trigger");
    Ok((it.click_point(trigger)?, None))
}

/// The current value next to the label
fn current_value(
    it: &Interactor,
    frame: &DynamicImage,
    field: &DropdownField,
    label: &PixelBox,
    guard_y: Option<i32>,
) -> Option<PixelBox> {
    let ctx = SearchContext::new()
        .exact()
        .with_min_score(field.open_min_score)
        .with_roi(value_region_right_of(label, frame.width(), frame.height()))
        .with_avoid_below(guard_y);
    field
        .current_values
        .iter()
        .find_map(|value| it.locate_in(frame, &TargetQuery::text([value.as_str()]), &ctx))
        .map(|hit| hit.bbox)
}

/// Click the first variant found, inside `roi` or on the whole frame
fn pick_option(
    it: &mut Interactor,
    frame: &DynamicImage,
    field: &DropdownField,
    variants: &[String],
    roi: Option<PixelBox>,
) -> ProbeResult<bool> {
    let ctx = SearchContext::new()
        .exact()
        .with_min_score(field.pick_min_score)
        .with_roi_opt(roi);
    for variant in variants {
        if let Some(hit) = it.locate_in(frame, &TargetQuery::text([variant.as_str()]), &ctx) {
            if it.click_box(&hit.bbox, 1, 1)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Whether any of `variants` shows right of the field label
fn value_shown(it: &mut Interactor, field: &DropdownField, variants: &[String]) -> ProbeResult<bool> {
    let frame = it.snapshot()?;
    let Some(label) = it.locate_in(
        &frame,
        &TargetQuery::key(field.label_key.clone()),
        &SearchContext::new().with_min_score(LABEL_MIN_SCORE),
    ) else {
        return Ok(false);
    };
    let ctx = SearchContext::new()
        .exact()
        .with_min_score(VERIFY_MIN_SCORE)
        .with_roi(value_region_right_of(&label.bbox, frame.width(), frame.height()));
    Ok(variants
        .iter()
        .any(|v| it.locate_in(&frame, &TargetQuery::text([v.as_str()]), &ctx).is_some()))
}
