//! Variants command handler

use crate::commands::VariantsArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{render_variants, Printer};
use lobbyprobe::canonical::{canonical_operator, currency_variants, operator_variants, text_variants, CanonicalOperator};
use serde::Serialize;

/// Every rendering the locator would try for one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variants {
    /// Canonical operator the text maps to
    pub canonical: CanonicalOperator,
    /// Operator synonyms
    pub operator: Vec<String>,
    /// Generic text renderings
    pub text: Vec<String>,
    /// Currency code renderings
    pub currency: Vec<String>,
}

impl Variants {
    /// Compute all renderings of `text`
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self {
            canonical: canonical_operator(text),
            operator: operator_variants(text),
            text: text_variants(text),
            currency: currency_variants(text),
        }
    }
}

/// Execute the variants command
pub fn execute_variants(config: &CliConfig, args: &VariantsArgs) -> CliResult<()> {
    let v = Variants::of(&args.text);
    let printer = Printer::new(config.use_color(), false);
    if args.json {
        printer.always(&serde_json::to_string_pretty(&v).map_err(lobbyprobe::ProbeError::from)?);
    } else {
        printer.always(&render_variants(
            &v.canonical,
            &v.operator,
            &v.text,
            &v.currency,
            config.use_color(),
        ));
    }
    Ok(())
}
