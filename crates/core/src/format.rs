use std::fmt::Write as _;

use crate::{
    grouping::{SuggestionContext, group_for_context},
    tags::is_tag_added,
    types::{AnalysisResult, GradingDetails, IntelligenceResult, SavedGrading, VideoMetadata},
};

/// Coarse verdict for a 0-100 score
pub fn score_label(score: u8) -> &'static str {
    match score {
        90.. => "Excellent",
        75..=89 => "Good",
        50..=74 => "Needs work",
        _ => "Poor",
    }
}

/// Format an analysis as human-readable markdown. `metadata` is the draft
/// the tag checklist is compared against.
pub fn format_report_readable(analysis: &AnalysisResult, metadata: &VideoMetadata) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}\n", metadata.title.trim());
    let _ = writeln!(
        output,
        "**Overall:** {}/100 ({}) | **Title:** {} | **Description:** {} | **Tags:** {}\n",
        analysis.overall_score,
        score_label(analysis.overall_score),
        analysis.title.score,
        analysis.description.score,
        analysis.tags.score
    );

    if !analysis.summary.is_empty() {
        output.push_str("## Summary\n\n");
        output.push_str(&analysis.summary);
        output.push_str("\n\n");
    }

    push_details(&mut output, "Title", &analysis.title, SuggestionContext::Title);
    push_details(
        &mut output,
        "Description",
        &analysis.description,
        SuggestionContext::Description,
    );
    push_details(&mut output, "Tags", &analysis.tags, SuggestionContext::Tags);

    if let Some(tags) = analysis.tags.specific_tags.as_ref().filter(|t| !t.is_empty()) {
        output.push_str("### Recommended tags\n\n");
        for tag in tags {
            let mark = if is_tag_added(tag, &metadata.tags) { "x" } else { " " };
            let _ = writeln!(output, "- [{mark}] {tag}");
        }
        output.push('\n');
    }

    if let Some(audit) = &analysis.competitive_audit {
        output.push_str("## Competitive audit\n\n");
        push_list(&mut output, "Your strengths", &audit.user_strengths);
        push_list(&mut output, "Competitor strengths", &audit.competitor_strengths);
        if !audit.gap_analysis.is_empty() {
            let _ = writeln!(output, "**Gap:** {}\n", audit.gap_analysis);
        }
        if !audit.strategic_move.is_empty() {
            let _ = writeln!(output, "**Strategic move:** {}\n", audit.strategic_move);
        }
    }

    output
}

fn push_details(
    output: &mut String,
    name: &str,
    details: &GradingDetails,
    context: SuggestionContext,
) {
    let _ = writeln!(output, "## {} ({}/100)\n", name, details.score);
    push_list(output, "Feedback", &details.feedback);
    push_list(output, "Recommendations", &details.recommendations);
    push_list(output, "Suggestions", &details.suggestions);

    let Some(groups) = group_for_context(context, details.structural_suggestions.as_deref()) else {
        return;
    };
    if groups.is_empty() {
        return;
    }

    output.push_str("### Missing blocks\n\n");
    for (group, items) in groups.in_display_order() {
        let _ = writeln!(output, "#### {group}\n");
        for item in items {
            let _ = writeln!(output, "{}. **{}**: {}", item.original_index + 1, item.title, item.description);
            if !item.template.is_empty() {
                output.push_str("   ```\n");
                for line in item.template.lines() {
                    let _ = writeln!(output, "   {line}");
                }
                output.push_str("   ```\n");
            }
        }
        output.push('\n');
    }
}

fn push_list(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "**{heading}**\n");
    for item in items {
        let _ = writeln!(output, "• {item}");
    }
    output.push('\n');
}

/// One line per saved grading, newest first
pub fn format_history(entries: &[SavedGrading]) -> String {
    entries
        .iter()
        .map(|entry| {
            let id = entry.id.to_string();
            format!(
                "{}  {}  {:>3}/100  {}",
                &id[..8],
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.analysis.overall_score,
                entry.metadata.title.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_intelligence(result: &IntelligenceResult) -> String {
    let mut output = String::new();
    output.push_str(result.text.trim());
    output.push('\n');

    if !result.sources.is_empty() {
        output.push_str("\n## Sources\n\n");
        for (i, source) in result.sources.iter().enumerate() {
            match &source.title {
                Some(title) => {
                    let _ = writeln!(output, "{}. {} <{}>", i + 1, title, source.uri);
                }
                None => {
                    let _ = writeln!(output, "{}. <{}>", i + 1, source.uri);
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompetitiveAudit, Source};

    fn details(score: u8) -> GradingDetails {
        GradingDetails {
            score,
            feedback: vec!["Too short".to_string()],
            recommendations: vec![],
            suggestions: vec![],
            specific_tags: None,
            structural_suggestions: None,
        }
    }

    #[test]
    fn report_groups_description_blocks_and_marks_tags() {
        let mut description = details(40);
        description.structural_suggestions = Some(vec![
            "DISCLAIMER | Affiliate note | Required by law | Template: [Links are affiliate links]".to_string(),
            "ABOUT | About | Introduce yourself".to_string(),
        ]);
        let mut title = details(80);
        title.structural_suggestions = Some(vec!["ABOUT | never grouped | x".to_string()]);
        let mut tags = details(60);
        tags.specific_tags = Some(vec!["cats".to_string(), "pets".to_string()]);

        let analysis = AnalysisResult {
            overall_score: 58,
            summary: "Decent".to_string(),
            title,
            description,
            tags,
            competitive_audit: Some(CompetitiveAudit {
                user_strengths: vec!["Warm tone".to_string()],
                competitor_strengths: vec![],
                gap_analysis: "No chapters".to_string(),
                strategic_move: String::new(),
            }),
        };
        let metadata = VideoMetadata {
            title: "Cats".to_string(),
            tags: "Cats".to_string(),
            ..Default::default()
        };

        let report = format_report_readable(&analysis, &metadata);

        assert!(report.contains("**Overall:** 58/100 (Needs work)"));
        let about = report.find("#### About Sections").unwrap();
        let legal = report.find("#### Legal & Disclaimers").unwrap();
        assert!(about < legal);
        assert!(report.contains("1. **Affiliate note**: Required by law"));
        assert!(report.contains("   Links are affiliate links"));
        assert!(!report.contains("never grouped"));
        assert!(report.contains("- [x] cats"));
        assert!(report.contains("- [ ] pets"));
        assert!(report.contains("**Gap:** No chapters"));
        assert!(!report.contains("Strategic move"));
    }

    #[test]
    fn intelligence_lists_sources() {
        let result = IntelligenceResult {
            text: "Report\n".to_string(),
            sources: vec![
                Source { uri: "https://a.example".to_string(), title: Some("A".to_string()) },
                Source { uri: "https://b.example".to_string(), title: None },
            ],
        };
        let out = format_intelligence(&result);
        assert!(out.contains("1. A <https://a.example>"));
        assert!(out.contains("2. <https://b.example>"));
    }

    #[test]
    fn score_labels() {
        assert_eq!(score_label(100), "Excellent");
        assert_eq!(score_label(75), "Good");
        assert_eq!(score_label(50), "Needs work");
        assert_eq!(score_label(0), "Poor");
    }
}
