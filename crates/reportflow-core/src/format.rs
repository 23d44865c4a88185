use std::fmt::Write as _;

use crate::crew::CrewOutput;

/// Render the fixed report template, or pass the raw text through when the
/// writer's output never validated against the schema. Sections appear in
/// the order the report supplied them; nothing is resorted.
pub fn format_report(topic: &str, output: &CrewOutput) -> String {
    let Some(report) = output.structured.as_ref() else {
        return output.raw.clone();
    };

    let mut text = format!("# Research Report: {topic}\n\n");
    let _ = write!(
        text,
        "## Executive Summary\n{}\n\n",
        report.executive_summary
    );

    text.push_str("## Key Findings\n");
    for finding in &report.findings {
        let _ = write!(
            text,
            "### {} ({} importance)\n{}\n\n",
            finding.title, finding.importance, finding.description
        );
    }

    text.push_str("## Recommendations\n");
    for rec in &report.recommendations {
        let _ = write!(
            text,
            "### Priority {}: {}\n{}\n\n",
            rec.priority, rec.action, rec.rationale
        );
    }

    let _ = write!(text, "## Conclusion\n{}", report.conclusion);
    text
}
