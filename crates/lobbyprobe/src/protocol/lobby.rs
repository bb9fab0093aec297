//! Lobby marker checks and return-to-lobby.

use super::Interactor;
use crate::locator::{SearchContext, TargetQuery};
use crate::result::ProbeResult;
use crate::wait::PollOptions;
use serde::Serialize;

/// Minimum score for the lobby marker
pub const LOBBY_MIN_SCORE: u8 = 70;

/// Buttons tried, in order, to leave a game
pub const RETURN_BUTTONS: &[&str] = &["Home", "Lobby", "Back", "Menu"];

/// Minimum score for return buttons
const RETURN_MIN_SCORE: u8 = 72;

/// How return-to-lobby left the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPath {
    /// An on-screen button was clicked
    Button(String),
    /// Browser back navigation
    HistoryBack,
}

/// Whether the lobby marker is on screen
pub fn in_lobby(it: &mut Interactor) -> ProbeResult<bool> {
    let marker = it.lobby_marker().clone();
    let ctx = SearchContext::new().with_min_score(LOBBY_MIN_SCORE);
    Ok(it.locate(&marker, &ctx)?.is_some())
}

/// Poll until the lobby marker shows
pub fn wait_for_lobby(it: &mut Interactor, options: PollOptions) -> ProbeResult<bool> {
    Ok(it.wait_for(options, in_lobby)?.success)
}

/// Poll until the lobby marker is gone
pub fn wait_lobby_gone(it: &mut Interactor, options: PollOptions) -> ProbeResult<bool> {
    Ok(it.wait_for(options, |it| in_lobby(it).map(|shown| !shown))?.success)
}

/// Leave the current game.
///
/// Clicks the first return button found, or navigates back when none is
/// visible, then settles. Whether the lobby actually came back is for the
/// caller to poll.
pub fn return_to_lobby(it: &mut Interactor) -> ProbeResult<ReturnPath> {
    let frame = it.snapshot()?;
    let ctx = SearchContext::new().exact().with_min_score(RETURN_MIN_SCORE);
    for button in RETURN_BUTTONS {
        if let Some(hit) = it.locate_in(&frame, &TargetQuery::text([*button]), &ctx) {
            if it.click_box(&hit.bbox, 1, 1)? {
                it.sleep(it.timings().return_settle);
                tracing::info!(button, "returned to lobby");
                return Ok(ReturnPath::Button((*button).to_string()));
            }
        }
    }
    it.browser().back()?;
    it.sleep(it.timings().return_settle);
    tracing::info!("returned to lobby via history");
    Ok(ReturnPath::HistoryBack)
}
