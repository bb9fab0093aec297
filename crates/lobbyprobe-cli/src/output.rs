//! Terminal rendering for reports, configuration and variants

use console::{style, StyledObject, Term};
use lobbyprobe::config::{GameCatalog, OperatorCurrencyMatrix};
use lobbyprobe::protocol::ReturnPath;
use lobbyprobe::reporter::{CellReport, GameOutcome, MatrixReport, StepOutcome};
use lobbyprobe::CanonicalOperator;
use std::fmt::Write as _;

/// Writes rendered blocks to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Printer {
    /// Create a printer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a block unless quiet
    pub fn block(&self, text: &str) {
        if !self.quiet {
            self.emit(text);
        }
    }

    /// Print a line even in quiet mode
    pub fn always(&self, text: &str) {
        self.emit(text);
    }

    fn emit(&self, text: &str) {
        for line in text.lines() {
            // A closed stdout is not worth failing the run over.
            let _ = self.term.write_line(line);
        }
    }
}

fn paint<D>(obj: StyledObject<D>, use_color: bool) -> StyledObject<D> {
    obj.force_styling(use_color)
}

fn verdict(ok: bool, use_color: bool) -> String {
    if ok {
        paint(style("PASS").green().bold(), use_color).to_string()
    } else {
        paint(style("FAIL").red().bold(), use_color).to_string()
    }
}

fn step_line(label: &str, step: &StepOutcome) -> String {
    let attempts = step.attempts.map_or_else(String::new, |a| format!(" after {a} attempt(s)"));
    match &step.failure {
        None => format!("{label} {}{attempts}", step.desired),
        Some(failure) => format!("{label} {}: {failure}", step.desired),
    }
}

fn return_label(path: Option<&ReturnPath>) -> String {
    match path {
        Some(ReturnPath::Button(label)) => format!("via {label}"),
        Some(ReturnPath::HistoryBack) => "via back".to_string(),
        None => "no return".to_string(),
    }
}

fn game_line(game: &GameOutcome, use_color: bool) -> String {
    let detail = if game.opened {
        let stage = game.stage.map_or_else(String::new, |s| format!("{s} click, "));
        let restored = if game.lobby_restored == Some(true) {
            "lobby back"
        } else {
            "lobby missing"
        };
        format!(
            "{stage}{} scroll(s), {}, {restored}",
            game.scrolls,
            return_label(game.return_path.as_ref())
        )
    } else {
        game.failure.clone().unwrap_or_else(|| "not opened".to_string())
    };
    format!(
        "    {} {} ({}) {detail}",
        verdict(game.passed(), use_color),
        game.game_id,
        game.name
    )
}

fn cell_block(cell: &CellReport, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} / {}",
        verdict(cell.passed(), use_color),
        paint(style(&cell.operator).bold(), use_color),
        cell.currency
    );
    let _ = writeln!(out, "    {}", step_line("operator", &cell.operator_step));
    let _ = writeln!(out, "    {}", step_line("currency", &cell.currency_step));
    if !cell.lobby_ready {
        let _ = writeln!(out, "    lobby not ready");
    }
    for game in &cell.games {
        let _ = writeln!(out, "{}", game_line(game, use_color));
    }
    out
}

/// Render a finished matrix report
#[must_use]
pub fn render_report(report: &MatrixReport, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        paint(style("Run").cyan().bold(), use_color),
        report.run_id
    );
    let _ = writeln!(out, "  url: {}", report.entry_url);
    if let Some(duration) = report.duration() {
        let _ = writeln!(out, "  took: {}s", duration.num_seconds());
    }
    let _ = writeln!(out);
    for cell in &report.cells {
        out.push_str(&cell_block(cell, use_color));
    }
    let _ = writeln!(out);
    let summary = report.summary();
    let _ = writeln!(
        out,
        "{}",
        if report.all_passed() {
            paint(style(summary).green(), use_color)
        } else {
            paint(style(summary).red(), use_color)
        }
    );
    out
}

/// Render the operator/currency matrix and the game catalog
#[must_use]
pub fn render_plan(matrix: &OperatorCurrencyMatrix, catalog: &GameCatalog, targets: &[&str], use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", paint(style("Targets").cyan().bold(), use_color));
    for key in targets {
        let _ = writeln!(out, "  {key}");
    }
    let _ = writeln!(out, "{}", paint(style("Operators").cyan().bold(), use_color));
    for operator in matrix.operators() {
        let currencies = matrix.currencies_for(operator.as_str());
        let _ = writeln!(out, "  {operator}: {}", currencies.join(", "));
    }
    let _ = writeln!(out, "{} ({})", paint(style("Games").cyan().bold(), use_color), catalog.len());
    for game in catalog.games() {
        let _ = writeln!(out, "  {} {}", game.id, game.name);
    }
    out
}

/// Render the renderings tried for a piece of text
#[must_use]
pub fn render_variants(
    canonical: &CanonicalOperator,
    operator: &[String],
    text: &[String],
    currency: &[String],
    use_color: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {canonical}", paint(style("canonical:").bold(), use_color));
    let _ = writeln!(out, "{} {}", paint(style("operator:").bold(), use_color), operator.join(" | "));
    let _ = writeln!(out, "{} {}", paint(style("text:").bold(), use_color), text.join(" | "));
    let _ = writeln!(out, "{} {}", paint(style("currency:").bold(), use_color), currency.join(" | "));
    out
}
