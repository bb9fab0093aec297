//! What the runner believes the lobby is set to.

use crate::canonical::{canonical_operator, CanonicalOperator};
use serde::Serialize;
use std::collections::BTreeSet;

/// Lobby state as of the last completed step.
///
/// Only the runner writes it, and only between steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    /// Operator last verified in the dropdown
    pub operator: Option<CanonicalOperator>,
    /// Currency last verified in the dropdown
    pub currency: Option<String>,
    /// Player id the run was started for
    pub player_id: Option<String>,
    /// Whether the home button toggle is on
    pub home_active: bool,
    /// Games opened at least once
    pub opened_games: BTreeSet<String>,
}

impl SessionState {
    /// Fresh state for a player
    #[must_use]
    pub fn new(player_id: Option<String>) -> Self {
        Self {
            player_id,
            ..Self::default()
        }
    }

    /// Record a verified operator; the currency is reset when it changes
    pub fn set_operator(&mut self, operator: &str) {
        let operator = canonical_operator(operator);
        if self.operator.as_ref() != Some(&operator) {
            self.currency = None;
        }
        self.operator = Some(operator);
    }

    /// Record a verified currency
    pub fn set_currency(&mut self, currency: &str) {
        self.currency = Some(currency.to_string());
    }

    /// Record an opened game
    pub fn mark_opened(&mut self, game_id: &str) {
        self.opened_games.insert(game_id.to_string());
    }

    /// Whether the lobby is known to show this pair
    #[must_use]
    pub fn is_on(&self, operator: &str, currency: &str) -> bool {
        self.operator.as_ref() == Some(&canonical_operator(operator))
            && self.currency.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(currency))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_change_clears_currency() {
        let mut state = SessionState::new(Some("p-42".into()));
        state.set_operator("WowVegas");
        state.set_currency("SC");
        assert!(state.is_on("wow vegas", "sc"));
        state.set_operator("Wow Vegas");
        assert_eq!(state.currency.as_deref(), Some("SC"));
        state.set_operator(".COM");
        assert_eq!(state.currency, None);
        assert_eq!(state.operator, Some(CanonicalOperator::DotCom));
    }

    #[test]
    fn test_opened_games_are_a_set() {
        let mut state = SessionState::default();
        state.mark_opened("edg201");
        state.mark_opened("edg201");
        assert_eq!(state.opened_games.len(), 1);
        assert!(!state.home_active);
    }
}
