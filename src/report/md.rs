use crate::report::composite_summary;
use crate::types::result::{Composite, TestResult};

pub fn to_markdown(result: &TestResult) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "# {} ({})\n\n",
        result.instrument_name, result.instrument_name_en
    ));
    output.push_str(&format!("- completed: {}\n", result.completed_at.to_rfc3339()));
    output.push_str(&format!("- complete: {}\n", result.complete));
    if let Some(norm_set) = &result.norm_set {
        output.push_str(&format!("- norm set: {norm_set}\n"));
    }
    if let Some(composite) = &result.composite {
        let (heading, value) = composite_summary(composite);
        output.push_str(&format!("- {}: **{}**\n", heading.to_lowercase(), value));
    }
    output.push('\n');

    output.push_str("## Scores\n\n");
    output.push_str("| Rank | Id | Name | Raw | % | Standard | Level |\n");
    output.push_str("|---:|---|---|---:|---:|---:|---|\n");
    for group in &result.groups {
        let standard = match (group.t_score, group.sten) {
            (Some(t_score), _) => format!("T {t_score}"),
            (None, Some(sten)) => format!("sten {sten:.1}"),
            (None, None) => String::new(),
        };
        output.push_str(&format!(
            "| {}{} | {} | {} | {} | {} | {} | {} |\n",
            group.rank,
            if group.is_top { " *" } else { "" },
            group.id,
            group.name,
            group.raw_score,
            group.percentage,
            standard,
            group
                .level_label
                .as_deref()
                .or(group.level.as_deref())
                .unwrap_or("-"),
        ));
    }

    let detailed = result
        .groups
        .iter()
        .filter(|group| group.interpretation.is_some() || !group.careers.is_empty())
        .collect::<Vec<_>>();
    if !detailed.is_empty() {
        output.push_str("\n## Details\n");
        for group in detailed {
            output.push_str(&format!("\n### {} ({})\n\n", group.name, group.id));
            if let Some(interpretation) = &group.interpretation {
                output.push_str(&format!("{interpretation}\n"));
            }
            if !group.careers.is_empty() {
                output.push_str(&format!("- careers: {}\n", group.careers.join("、")));
            }
        }
    }

    if let Some(Composite::Dichotomies { dichotomies, .. }) = &result.composite {
        output.push_str("\n## Dichotomies\n\n");
        let pole = |id: &str| match result.group(id) {
            Some(group) => format!("{} ({id})", group.name),
            None => id.to_string(),
        };
        for axis in dichotomies {
            output.push_str(&format!(
                "- {}: {} {}% / {} {}% ({}, {})\n",
                axis.name,
                pole(axis.first_pole.as_str()),
                axis.first_pole_score,
                pole(axis.second_pole.as_str()),
                axis.second_pole_score,
                axis.preference,
                axis.clarity_label.as_deref().unwrap_or(&axis.clarity),
            ));
        }
    }

    if !result.categories.is_empty() {
        output.push_str("\n## Categories\n\n");
        for summary in &result.categories {
            output.push_str(&format!(
                "- {}: {:.1}% ({})\n",
                summary.category,
                summary.mean_percentage,
                summary.groups.join(", ")
            ));
        }
    }

    output
}
