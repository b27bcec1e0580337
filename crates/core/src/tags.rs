//! Reconciliation of recommended tags against the comma-separated tags field.
//!
//! Membership is case-insensitive and ignores surrounding whitespace; the
//! field itself keeps the creator's spelling and order.

use std::collections::HashSet;

/// Non-empty, trimmed pieces of a tags field in their original order.
pub fn split_tags(field: &str) -> impl Iterator<Item = &str> {
    field.split(',').map(str::trim).filter(|t| !t.is_empty())
}

pub fn is_tag_added(tag: &str, current_tags: &str) -> bool {
    let current: HashSet<String> = split_tags(current_tags).map(str::to_lowercase).collect();
    current.contains(&tag.trim().to_lowercase())
}

/// Append `tag` unless it is already present; the field is returned as-is then.
pub fn add_tag(tag: &str, current_tags: &str) -> String {
    let tag = tag.trim();
    if current_tags.trim().is_empty() {
        return tag.to_string();
    }
    if tag.is_empty() || is_tag_added(tag, current_tags) {
        return current_tags.to_string();
    }

    let mut tags: Vec<&str> = split_tags(current_tags).collect();
    tags.push(tag);
    tags.join(", ")
}

/// Recommended tags that are not yet in the field, in recommendation order.
pub fn missing_tags<'a>(recommended: &'a [String], current_tags: &str) -> Vec<&'a str> {
    recommended
        .iter()
        .map(String::as_str)
        .filter(|tag| !tag.trim().is_empty() && !is_tag_added(tag, current_tags))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_case_insensitive_and_exact() {
        assert!(is_tag_added("Tech", "tech, gaming"));
        assert!(is_tag_added("Tech", "TECH"));
        assert!(is_tag_added("  gaming ", "tech,gaming,"));
        assert!(!is_tag_added("Tech", "techy"));
        assert!(!is_tag_added("Tech", ""));
    }

    #[test]
    fn add_tag_appends_once() {
        assert_eq!(add_tag("Gaming", ""), "Gaming");
        assert_eq!(add_tag("  Gaming ", "   "), "Gaming");
        assert_eq!(add_tag("Gaming", "tech, gaming"), "tech, gaming");
        assert_eq!(add_tag("Vlog", "tech, gaming"), "tech, gaming, Vlog");
        assert_eq!(add_tag("Vlog", "tech ,gaming,, "), "tech, gaming, Vlog");
    }

    #[test]
    fn duplicate_leaves_field_untouched() {
        let field = "tech ,  Gaming";
        assert_eq!(add_tag("gaming", field), field);
    }

    #[test]
    fn missing_tags_skips_present_ones() {
        let recommended = vec![
            "tech".to_string(),
            "review".to_string(),
            " ".to_string(),
            "Unboxing".to_string(),
        ];
        assert_eq!(
            missing_tags(&recommended, "Tech, unboxing"),
            vec!["review"]
        );
    }
}
