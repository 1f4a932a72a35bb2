use crate::report::composite_summary;
use crate::types::result::TestResult;

/// Plain text suited to pasting into a chat or note: one line per group,
/// followed by its interpretation and careers when the instrument has them.
pub fn to_text(result: &TestResult) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{} ({})\n",
        result.instrument_name, result.instrument_name_en
    ));
    output.push_str(&format!(
        "Completed: {}\n",
        result.completed_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if !result.complete {
        output.push_str("Note: some questions were left unanswered\n");
    }
    output.push('\n');

    for group in &result.groups {
        let mut line = format!(
            "{} ({}): {} ({}%)",
            group.name, group.id, group.raw_score, group.percentage
        );
        if let Some(t_score) = group.t_score {
            line.push_str(&format!(" T={t_score}"));
        }
        if let Some(sten) = group.sten {
            line.push_str(&format!(" sten={sten:.1}"));
        }
        if let Some(level) = group.level_label.as_ref().or(group.level.as_ref()) {
            line.push_str(&format!(" - {level}"));
        }
        if group.is_top {
            line.push_str(" [top]");
        }
        output.push_str(&line);
        output.push('\n');
        if let Some(interpretation) = &group.interpretation {
            output.push_str(&format!("  {interpretation}\n"));
        }
        if !group.careers.is_empty() {
            output.push_str(&format!("  Careers: {}\n", group.careers.join("、")));
        }
    }

    if let Some(composite) = &result.composite {
        let (heading, value) = composite_summary(composite);
        output.push_str(&format!("\n{heading}: {value}\n"));
    }
    output
}
