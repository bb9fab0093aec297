//! Interaction protocols.
//!
//! Protocols turn one imprecise visual hit into a verified state change.
//! They all work through an [`Interactor`], which bundles the browser, the
//! [`Locator`], the [`CoordinateMapper`], the clock and the [`Timings`],
//! and offers the small vocabulary the protocols are written in:
//! screenshot, locate, click a box, click a point, wait for a condition.
//!
//! - [`dropdown`]: open a field's dropdown, pick a value, verify it
//! - [`tile`]: scan the lobby for a game tile and open it
//! - [`lobby`]: lobby-marker checks and return-to-lobby

pub mod dropdown;
pub mod lobby;
pub mod tile;

pub use dropdown::{select, DropdownField, Selection};
pub use lobby::{in_lobby, return_to_lobby, wait_for_lobby, wait_lobby_gone, ReturnPath};
pub use tile::{open_tile, ClickStage, TileOpen, TileScan};

use crate::clock::SharedClock;
use crate::config::Timings;
use crate::coords::CoordinateMapper;
use crate::driver::BrowserAdapter;
use crate::geometry::{PixelBox, ViewportPoint};
use crate::locator::{Detection, Locator, SearchContext, TargetQuery};
use crate::result::ProbeResult;
use crate::wait::{poll_until, PollOptions, WaitResult};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;

/// Registry key of the lobby marker
pub const LOBBY_MARKER_KEY: &str = "select_a_game_header";

/// Minimum score for generic target clicks
pub const CLICK_TARGET_MIN_SCORE: u8 = 72;

/// Minimum score for free-text clicks
pub const CLICK_TEXT_MIN_SCORE: u8 = 75;

/// Minimum score for visibility checks
pub const TEXT_VISIBLE_MIN_SCORE: u8 = 72;

/// Browser, locator and timing bundle the protocols act through
#[derive(Debug)]
pub struct Interactor {
    browser: Box<dyn BrowserAdapter>,
    locator: Locator,
    mapper: CoordinateMapper,
    clock: SharedClock,
    timings: Timings,
    lobby_marker: TargetQuery,
}

impl Interactor {
    /// Create an interactor with default timings
    #[must_use]
    pub fn new(browser: Box<dyn BrowserAdapter>, locator: Locator, clock: SharedClock) -> Self {
        let timings = Timings::default();
        Self {
            browser,
            locator,
            mapper: CoordinateMapper::new().with_click_settle(timings.click_settle),
            clock,
            timings,
            lobby_marker: TargetQuery::key(LOBBY_MARKER_KEY),
        }
    }

    /// Use custom timings
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.mapper = self.mapper.with_click_settle(timings.click_settle);
        self.timings = timings;
        self
    }

    /// Use a custom coordinate mapper
    #[must_use]
    pub fn with_mapper(mut self, mapper: CoordinateMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Use a different lobby marker
    #[must_use]
    pub fn with_lobby_marker(mut self, marker: TargetQuery) -> Self {
        self.lobby_marker = marker;
        self
    }

    /// The browser
    pub fn browser(&mut self) -> &mut dyn BrowserAdapter {
        self.browser.as_mut()
    }

    /// The locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The clock
    #[must_use]
    pub const fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// The timings
    #[must_use]
    pub const fn timings(&self) -> &Timings {
        &self.timings
    }

    /// The lobby marker target
    #[must_use]
    pub const fn lobby_marker(&self) -> &TargetQuery {
        &self.lobby_marker
    }

    /// Give the browser back
    #[must_use]
    pub fn into_browser(self) -> Box<dyn BrowserAdapter> {
        self.browser
    }

    /// Sleep on the interactor's clock
    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    /// Capture the viewport
    pub fn snapshot(&mut self) -> ProbeResult<DynamicImage> {
        self.browser.screenshot()
    }

    /// Locate on an existing frame
    #[must_use]
    pub fn locate_in(&self, frame: &DynamicImage, query: &TargetQuery, ctx: &SearchContext) -> Option<Detection> {
        self.locator.locate(frame, query, ctx)
    }

    /// Capture a frame and locate on it
    pub fn locate(&mut self, query: &TargetQuery, ctx: &SearchContext) -> ProbeResult<Option<Detection>> {
        let frame = self.snapshot()?;
        Ok(self.locate_in(&frame, query, ctx))
    }

    /// Center of `bbox` in viewport pixels
    pub fn to_viewport(&mut self, bbox: &PixelBox) -> ViewportPoint {
        self.mapper.to_viewport(self.browser.as_mut(), bbox)
    }

    /// Click the center of a detection box
    pub fn click_box(&mut self, bbox: &PixelBox, jitter: i32, repeats: u32) -> ProbeResult<bool> {
        self.mapper
            .click_center(self.browser.as_mut(), self.clock.as_ref(), bbox, jitter, repeats)
    }

    /// Scroll a viewport point into view and click it once
    pub fn click_point(&mut self, point: ViewportPoint) -> ProbeResult<bool> {
        let landed = self.mapper.bring_into_view(self.browser.as_mut(), point)?;
        self.browser.click_at_viewport_coords(landed, 1, 0)
    }

    /// Locate a target and click it
    pub fn click_target(&mut self, query: &TargetQuery, ctx: &SearchContext, jitter: i32, repeats: u32) -> ProbeResult<bool> {
        match self.locate(query, ctx)? {
            Some(hit) => self.click_box(&hit.bbox, jitter, repeats),
            None => Ok(false),
        }
    }

    /// Click the first of `synonyms` found on screen, then `text` itself
    pub fn click_text(&mut self, text: &str, synonyms: &[&str]) -> ProbeResult<bool> {
        let frame = self.snapshot()?;
        let ctx = SearchContext::new().with_min_score(CLICK_TEXT_MIN_SCORE);
        for candidate in synonyms.iter().copied().chain(std::iter::once(text)) {
            if let Some(hit) = self.locate_in(&frame, &TargetQuery::text([candidate]), &ctx) {
                return self.click_box(&hit.bbox, 1, 1);
            }
        }
        Ok(false)
    }

    /// Whether `text` or any of `synonyms` is on screen
    pub fn text_visible(&mut self, text: &str, synonyms: &[&str]) -> ProbeResult<bool> {
        let frame = self.snapshot()?;
        let ctx = SearchContext::new().with_min_score(TEXT_VISIBLE_MIN_SCORE);
        Ok(synonyms
            .iter()
            .copied()
            .chain(std::iter::once(text))
            .any(|candidate| self.locate_in(&frame, &TargetQuery::text([candidate]), &ctx).is_some()))
    }

    /// Poll `predicate` on the interactor's clock
    pub fn wait_for(
        &mut self,
        options: PollOptions,
        mut predicate: impl FnMut(&mut Self) -> ProbeResult<bool>,
    ) -> ProbeResult<WaitResult> {
        let clock = Arc::clone(&self.clock);
        poll_until(clock.as_ref(), options, || predicate(self))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A scripted lobby shared by the protocol tests.

    use super::*;
    use crate::clock::FakeClock;
    use crate::locator::{TargetRegistry, TargetSpec};
    use crate::mock::{MockPage, PageState};
    use crate::vision::RecognizedWord;

    pub const VALUE_X: i32 = 220;
    pub const OPERATOR_Y: i32 = 100;
    pub const CURRENCY_Y: i32 = 400;
    pub const OPTION_STEP: i32 = 80;

    pub fn word(text: &str, x: i32, y: i32) -> RecognizedWord {
        RecognizedWord::new(text, PixelBox::new(x, y, 12 * text.len().max(2) as i32, 24))
    }

    /// Lobby with both dropdown fields, a campaign panel and the lobby header
    pub fn lobby_page(operator: &str, currency: &str) -> MockPage {
        MockPage::new().with_words(vec![
            word("Operator", 100, OPERATOR_Y),
            word(operator, VALUE_X, OPERATOR_Y),
            word("Currency", 100, CURRENCY_Y),
            word(currency, VALUE_X, CURRENCY_Y),
            word("Select a Game", 700, 300),
            word("Create Free Game Campaign", 100, 800),
        ])
    }

    pub fn registry() -> TargetRegistry {
        TargetRegistry::new()
            .with(TargetSpec::text(LOBBY_MARKER_KEY, ["Select a Game"]))
            .with(TargetSpec::text("operator_label", ["Operator"]))
            .with(TargetSpec::text("currency_label", ["Currency"]))
    }

    pub fn interactor(page: &MockPage) -> (Interactor, Arc<FakeClock>) {
        let clock = FakeClock::shared();
        let locator = Locator::new(registry(), Arc::new(page.recognizer())).with_detector(Arc::new(page.detector()));
        let it = Interactor::new(Box::new(page.browser()), locator, clock.clone());
        (it, clock)
    }

    fn is_value(word: &RecognizedWord, y: i32) -> bool {
        word.bbox.x == VALUE_X && word.bbox.y == y
    }

    /// Make both value fields behave like dropdowns.
    ///
    /// Clicking a value opens a list of `options` below it; clicking an
    /// option writes it into the value field and closes the list. When
    /// `opens_after` is non-zero, that many clicks on a value are ignored
    /// first.
    pub fn install_dropdowns(page: &MockPage, operators: &[&str], currencies: &[&str], opens_after: u32) {
        page.on_click(dropdown_handler(operators, currencies, opens_after));
    }

    /// Click reaction behind [`install_dropdowns`], for composing with other page behavior
    pub fn dropdown_handler(
        operators: &[&str],
        currencies: &[&str],
        opens_after: u32,
    ) -> impl FnMut(&mut PageState, ViewportPoint) -> bool + Send + 'static {
        let operators: Vec<String> = operators.iter().map(|s| (*s).to_string()).collect();
        let currencies: Vec<String> = currencies.iter().map(|s| (*s).to_string()).collect();
        let mut open: Option<(i32, Vec<RecognizedWord>)> = None;
        let mut ignored = 0;
        move |state: &mut PageState, point| {
            let Some(hit) = state.word_at(point).cloned() else {
                return false;
            };
            if let Some((field_y, options)) = open.take() {
                if options.contains(&hit) {
                    state.words.retain(|w| !options.contains(w));
                    for w in &mut state.words {
                        if is_value(w, field_y) {
                            w.text.clone_from(&hit.text);
                        }
                    }
                    return true;
                }
                state.words.retain(|w| !options.contains(w));
            }
            for (field_y, list) in [(OPERATOR_Y, &operators), (CURRENCY_Y, &currencies)] {
                if is_value(&hit, field_y) {
                    if ignored < opens_after {
                        ignored += 1;
                        return true;
                    }
                    let options: Vec<RecognizedWord> = list
                        .iter()
                        .enumerate()
                        .map(|(i, text)| word(text, VALUE_X, field_y + OPTION_STEP * (i as i32 + 1)))
                        .collect();
                    state.words.extend(options.iter().cloned());
                    open = Some((field_y, options));
                }
            }
            true
        }
    }
}
