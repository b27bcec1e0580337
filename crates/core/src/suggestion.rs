//! Parsing of structural suggestions.
//!
//! The grading model describes each missing description block as
//! `Category | Title | Suggestion | Template: [ready-to-paste text]`.
//! Model output is not trusted to follow that shape, so parsing never fails:
//! anything that does not split into at least two segments becomes a single
//! catch-all item.

use crate::types::SuggestionItem;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_TITLE: &str = "Suggestion";
pub const DEFAULT_DESCRIPTION: &str = "No details provided";

const TEMPLATE_MARKER: &str = "Template:";

/// Parse one raw suggestion string found at `index` in its source list.
pub fn parse_suggestion(raw: &str, index: usize) -> SuggestionItem {
    let segments: Vec<&str> = raw.split('|').map(str::trim).collect();

    if segments.len() < 2 {
        let text = raw.trim();
        return SuggestionItem {
            category: DEFAULT_CATEGORY.to_string(),
            title: or_default(text, DEFAULT_TITLE),
            description: or_default(text, DEFAULT_DESCRIPTION),
            template: String::new(),
            original_index: index,
        };
    }

    let mut description = segments.get(2).copied().unwrap_or_default();
    if let Some(pos) = description.find(TEMPLATE_MARKER) {
        description = description[..pos].trim();
    }

    SuggestionItem {
        category: or_default(segments[0], DEFAULT_CATEGORY),
        title: or_default(segments[1], DEFAULT_TITLE),
        description: or_default(description, DEFAULT_DESCRIPTION),
        template: extract_template(raw),
        original_index: index,
    }
}

/// Everything after the first `Template:` marker, with one `[...]` layer removed.
pub fn extract_template(raw: &str) -> String {
    let Some(pos) = raw.find(TEMPLATE_MARKER) else {
        return String::new();
    };

    let value = raw[pos + TEMPLATE_MARKER.len()..].trim();
    let value = value
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(value);

    value.trim().to_string()
}

fn or_default(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_suggestion_with_template() {
        let item = parse_suggestion(
            "SOCIAL | Add your socials | Viewers cannot find you elsewhere | Template: [Follow me: https://x.com/me]",
            3,
        );

        assert_eq!(item.category, "SOCIAL");
        assert_eq!(item.title, "Add your socials");
        assert_eq!(item.description, "Viewers cannot find you elsewhere");
        assert_eq!(item.template, "Follow me: https://x.com/me");
        assert_eq!(item.original_index, 3);
    }

    #[test]
    fn degenerate_input_falls_back_to_single_item() {
        let item = parse_suggestion("Just add more keywords", 0);
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert_eq!(item.title, "Just add more keywords");
        assert_eq!(item.description, "Just add more keywords");
        assert!(item.template.is_empty());

        let empty = parse_suggestion("", 7);
        assert_eq!(empty.category, DEFAULT_CATEGORY);
        assert_eq!(empty.title, DEFAULT_TITLE);
        assert_eq!(empty.description, DEFAULT_DESCRIPTION);
        assert_eq!(empty.original_index, 7);
    }

    #[test]
    fn degenerate_input_ignores_template_marker() {
        let item = parse_suggestion("Template: [orphan]", 0);
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert!(item.template.is_empty());
    }

    #[test]
    fn empty_segments_use_fallback_labels() {
        let item = parse_suggestion(" | | ", 1);
        assert_eq!(item.category, DEFAULT_CATEGORY);
        assert_eq!(item.title, DEFAULT_TITLE);
        assert_eq!(item.description, DEFAULT_DESCRIPTION);
        assert!(item.template.is_empty());
    }

    #[test]
    fn description_is_cut_at_inline_template() {
        let item = parse_suggestion(
            "CTA | Ask to subscribe | Close with a call to action Template: [Subscribe for more!]",
            0,
        );
        assert_eq!(item.description, "Close with a call to action");
        assert_eq!(item.template, "Subscribe for more!");
    }

    #[test]
    fn two_segment_input_has_no_description() {
        let item = parse_suggestion("ABOUT | Write an about section", 0);
        assert_eq!(item.category, "ABOUT");
        assert_eq!(item.title, "Write an about section");
        assert_eq!(item.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn template_strips_exactly_one_bracket_layer() {
        assert_eq!(extract_template("x | y | z | Template: [[nested]]"), "[nested]");
        assert_eq!(extract_template("x | y | Template: no brackets"), "no brackets");
        assert_eq!(extract_template("x | y | Template: [unclosed"), "[unclosed");
        assert_eq!(extract_template("x | y | Template:"), "");
        assert_eq!(extract_template("x | y | template: lower"), "");
    }

    #[test]
    fn template_keeps_pipes_and_newlines() {
        let raw = "CHAPTER | Add chapters | Helps navigation | Template: [0:00 Intro\n1:30 Setup | Tools]";
        let item = parse_suggestion(raw, 0);
        assert_eq!(item.template, "0:00 Intro\n1:30 Setup | Tools");
    }
}
