pub mod csv;
pub mod json;
pub mod md;
pub mod text;

use crate::error::{Result, ScoreError};
use crate::types::result::{Composite, TestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Text,
    Md,
}

pub fn render(result: &TestResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::to_json(result).map_err(ScoreError::Json),
        OutputFormat::Csv => csv::to_csv(result),
        OutputFormat::Text => Ok(text::to_text(result)),
        OutputFormat::Md => Ok(md::to_markdown(result)),
    }
}

/// Heading and value for the composite line every format prints, e.g.
/// `("Holland code", "RIA")` or `("Signature strengths", "creativity, ...")`.
pub(crate) fn composite_summary(composite: &Composite) -> (&'static str, String) {
    match composite {
        Composite::Code { code, .. } => ("Code", code.clone()),
        Composite::Wing { code, category, .. } => match category {
            Some(category) => ("Type", format!("{code} ({category})")),
            None => ("Type", code.clone()),
        },
        Composite::Signature { strengths } => ("Signature strengths", strengths.join(", ")),
        Composite::TopTalents { talents } => ("Top talents", talents.join(", ")),
        Composite::Dichotomies { type_code, .. } => ("Type", type_code.clone()),
    }
}
