//! Run parameters: which cells and games a matrix run covers.

use crate::canonical::{canonical_operator, CanonicalOperator};
use crate::config::{Game, GameCatalog, OperatorCurrencyMatrix};
use crate::protocol::TileScan;
use crate::result::ProbeResult;
use std::collections::BTreeMap;
use std::time::Duration;

/// Lobby the runner opens by default
pub const DEFAULT_ENTRY_URL: &str = "https://qa.edgelabs.game/FE/lobby/gen2/";

/// Operator selected by default
pub const DEFAULT_OPERATOR: &str = "WowVegas";

/// Default time spent inside each opened game
pub const DEFAULT_DWELL: Duration = Duration::from_secs(15);

/// Which currencies each operator is run with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CurrencySelection {
    /// Every currency the operator allows
    #[default]
    All,
    /// One currency per operator; operators without an entry are skipped
    PerOperator(BTreeMap<CanonicalOperator, String>),
    /// The same list for every operator
    List(Vec<String>),
}

impl CurrencySelection {
    /// Parse `All` (any case) or a comma-separated list
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("all") {
            return Self::All;
        }
        Self::List(
            s.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// One currency per operator
    #[must_use]
    pub fn per_operator<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::PerOperator(
            entries
                .into_iter()
                .map(|(op, cur)| (canonical_operator(op.as_ref()), cur.into()))
                .collect(),
        )
    }

    /// Currencies to run for `operator`, with empty entries dropped
    #[must_use]
    pub fn resolve(&self, operator: &str, matrix: &OperatorCurrencyMatrix) -> Vec<String> {
        let list: Vec<String> = match self {
            Self::All => matrix.currencies_for(operator).to_vec(),
            Self::PerOperator(map) => map.get(&canonical_operator(operator)).cloned().into_iter().collect(),
            Self::List(list) => list.clone(),
        };
        list.into_iter().filter(|c| !c.trim().is_empty()).collect()
    }
}

/// Which games each cell opens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GameSelection {
    /// No games; only the dropdowns are exercised
    #[default]
    None,
    /// Every catalog game, in catalog order
    All,
    /// Explicit ids or display names, in the given order
    Named(Vec<String>),
}

impl GameSelection {
    /// Parse `all` (any case), an empty string, or a comma-separated list
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            Self::None
        } else if s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Named(s.split(',').map(str::trim).filter(|g| !g.is_empty()).map(str::to_string).collect())
        }
    }

    /// Games to open, resolved against `catalog`
    pub fn resolve(&self, catalog: &GameCatalog) -> ProbeResult<Vec<Game>> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::All => Ok(catalog.games().to_vec()),
            Self::Named(names) => catalog.resolve_all(names),
        }
    }
}

/// Everything a matrix run needs besides its collaborators
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Lobby URL opened once at start
    pub entry_url: String,
    /// Operators in run order
    pub operators: Vec<String>,
    /// Currency selection
    pub currencies: CurrencySelection,
    /// Game selection
    pub games: GameSelection,
    /// Time spent inside each opened game
    pub dwell: Duration,
    /// Stop the run when a dropdown step fails
    pub stop_on_fail: bool,
    /// Player id carried into the session state
    pub player_id: Option<String>,
    /// Tile scan parameters
    pub scan: TileScan,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            entry_url: DEFAULT_ENTRY_URL.to_string(),
            operators: vec![DEFAULT_OPERATOR.to_string()],
            currencies: CurrencySelection::All,
            games: GameSelection::None,
            dwell: DEFAULT_DWELL,
            stop_on_fail: false,
            player_id: None,
            scan: TileScan::default(),
        }
    }
}

impl RunnerConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry URL
    #[must_use]
    pub fn with_entry_url(mut self, url: impl Into<String>) -> Self {
        self.entry_url = url.into();
        self
    }

    /// Set the operators
    #[must_use]
    pub fn with_operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators = operators.into_iter().map(Into::into).collect();
        self
    }

    /// Set the currency selection
    #[must_use]
    pub fn with_currencies(mut self, currencies: CurrencySelection) -> Self {
        self.currencies = currencies;
        self
    }

    /// Set the game selection
    #[must_use]
    pub fn with_games(mut self, games: GameSelection) -> Self {
        self.games = games;
        self
    }

    /// Set the in-game dwell
    #[must_use]
    pub const fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// Stop on dropdown failure
    #[must_use]
    pub const fn with_stop_on_fail(mut self, stop: bool) -> Self {
        self.stop_on_fail = stop;
        self
    }

    /// Set the player id
    #[must_use]
    pub fn with_player_id(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = Some(player_id.into());
        self
    }

    /// Set the tile scan parameters
    #[must_use]
    pub const fn with_scan(mut self, scan: TileScan) -> Self {
        self.scan = scan;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn matrix() -> OperatorCurrencyMatrix {
        OperatorCurrencyMatrix::from_entries([
            ("WowVegas", vec!["SC".to_string(), "WOW".to_string()]),
            ("DotCom", vec!["USD".to_string(), "EUR".to_string()]),
        ])
    }

    mod currency_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!(CurrencySelection::parse("ALL"), CurrencySelection::All);
            assert_eq!(
                CurrencySelection::parse(" SC, ,WOW "),
                CurrencySelection::List(vec!["SC".into(), "WOW".into()])
            );
        }

        #[test]
        fn test_all_uses_allowed_set() {
            assert_eq!(CurrencySelection::All.resolve("Wow Vegas", &matrix()), vec!["SC", "WOW"]);
            assert!(CurrencySelection::All.resolve("Unknown", &matrix()).is_empty());
        }

        #[test]
        fn test_per_operator_skips_missing() {
            let sel = CurrencySelection::per_operator([(".com", "USD"), ("WowVegas", "")]);
            assert_eq!(sel.resolve("DotCom", &matrix()), vec!["USD"]);
            assert!(sel.resolve("WowVegas", &matrix()).is_empty());
            assert!(sel.resolve("Other", &matrix()).is_empty());
        }

        #[test]
        fn test_list_applies_to_every_operator() {
            let sel = CurrencySelection::parse("USD");
            assert_eq!(sel.resolve("WowVegas", &matrix()), vec!["USD"]);
        }
    }

    mod game_tests {
        use super::*;

        #[test]
        fn test_parse_and_resolve() {
            let catalog = GameCatalog::from_entries([
                ("edg1002".to_string(), "Late Game".to_string()),
                ("edg201".to_string(), "Book of Luck".to_string()),
            ]);
            assert!(GameSelection::parse("").resolve(&catalog).unwrap().is_empty());
            let all = GameSelection::parse("all").resolve(&catalog).unwrap();
            assert_eq!(all[0].id, "edg201");
            let named = GameSelection::parse("late game, edg201").resolve(&catalog).unwrap();
            assert_eq!(named[0].id, "edg1002");
            assert!(GameSelection::parse("edg999").resolve(&catalog).is_err());
        }
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::new();
        assert_eq!(config.entry_url, DEFAULT_ENTRY_URL);
        assert_eq!(config.operators, vec!["WowVegas"]);
        assert_eq!(config.dwell, Duration::from_secs(15));
        assert!(!config.stop_on_fail);
    }
}
