use crate::error::{Result, ScoreError};
use crate::report::composite_summary;
use crate::types::result::TestResult;
use csv::WriterBuilder;

const BOM: &str = "\u{feff}";
const CAREER_SEPARATOR: &str = "、";

const HEADER: [&str; 13] = [
    "id",
    "name",
    "name_en",
    "raw_score",
    "percentage",
    "t_score",
    "percentile",
    "sten",
    "level",
    "rank",
    "top",
    "interpretation",
    "careers",
];

/// One row per group in report order, then two-column summary rows. The
/// byte-order mark lets spreadsheet tools detect UTF-8.
pub fn to_csv(result: &TestResult) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_writer(BOM.as_bytes().to_vec());
    writer.write_record(HEADER)?;

    for group in &result.groups {
        writer.write_record([
            group.id.clone(),
            group.name.clone(),
            group.name_en.clone(),
            group.raw_score.to_string(),
            group.percentage.to_string(),
            optional(group.t_score),
            optional(group.percentile),
            optional(group.sten),
            group
                .level_label
                .clone()
                .or_else(|| group.level.clone())
                .unwrap_or_default(),
            group.rank.to_string(),
            group.is_top.to_string(),
            group.interpretation.clone().unwrap_or_default(),
            group.careers.join(CAREER_SEPARATOR),
        ])?;
    }

    if let Some(composite) = &result.composite {
        let (heading, value) = composite_summary(composite);
        writer.write_record([heading.to_string(), value])?;
    }
    for summary in &result.categories {
        writer.write_record([
            summary.category.clone(),
            format!("{:.1}", summary.mean_percentage),
        ])?;
    }
    writer.write_record(["completed_at".to_string(), result.completed_at.to_rfc3339()])?;
    writer.write_record(["complete".to_string(), result.complete.to_string()])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ScoreError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| ScoreError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}
