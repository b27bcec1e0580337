//! Grouping of description structural suggestions into display sections.

use std::fmt;

use serde::Serialize;

use crate::{suggestion::parse_suggestion, types::SuggestionItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SuggestionGroup {
    AboutSections,
    SocialsAndLinks,
    CallToActions,
    TimestampsAndChapters,
    LegalAndDisclaimers,
    Miscellaneous,
}

impl SuggestionGroup {
    /// Fixed display order.
    pub const ALL: [SuggestionGroup; 6] = [
        SuggestionGroup::AboutSections,
        SuggestionGroup::SocialsAndLinks,
        SuggestionGroup::CallToActions,
        SuggestionGroup::TimestampsAndChapters,
        SuggestionGroup::LegalAndDisclaimers,
        SuggestionGroup::Miscellaneous,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SuggestionGroup::AboutSections => "About Sections",
            SuggestionGroup::SocialsAndLinks => "Socials & Links",
            SuggestionGroup::CallToActions => "Call to Actions",
            SuggestionGroup::TimestampsAndChapters => "Timestamps & Chapters",
            SuggestionGroup::LegalAndDisclaimers => "Legal & Disclaimers",
            SuggestionGroup::Miscellaneous => "Miscellaneous",
        }
    }

    /// Classify a parsed category. First matching rule wins.
    pub fn classify(category: &str) -> Self {
        let category = category.to_uppercase();
        let has = |needle: &str| category.contains(needle);

        if has("ABOUT") {
            SuggestionGroup::AboutSections
        } else if has("SOCIAL") || has("LINK") {
            SuggestionGroup::SocialsAndLinks
        } else if has("CTA") || has("SUBSCRIBE") {
            SuggestionGroup::CallToActions
        } else if has("TIMESTAMP") || has("CHAPTER") {
            SuggestionGroup::TimestampsAndChapters
        } else if has("DISCLAIMER") {
            SuggestionGroup::LegalAndDisclaimers
        } else {
            SuggestionGroup::Miscellaneous
        }
    }
}

impl fmt::Display for SuggestionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which part of the report a suggestion list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionContext {
    Title,
    Description,
    Tags,
}

impl SuggestionContext {
    /// Only description (content strategy) suggestions are grouped.
    pub fn is_content_strategy(&self) -> bool {
        matches!(self, SuggestionContext::Description)
    }
}

/// Groups keyed in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedSuggestions {
    groups: Vec<(SuggestionGroup, Vec<SuggestionItem>)>,
}

impl GroupedSuggestions {
    pub fn get(&self, group: SuggestionGroup) -> Option<&[SuggestionItem]> {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, items)| items.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SuggestionGroup, &[SuggestionItem])> {
        self.groups.iter().map(|(g, items)| (*g, items.as_slice()))
    }

    /// Same groups, reordered to [`SuggestionGroup::ALL`].
    pub fn in_display_order(&self) -> impl Iterator<Item = (SuggestionGroup, &[SuggestionItem])> {
        SuggestionGroup::ALL
            .into_iter()
            .filter_map(|group| self.get(group).map(|items| (group, items)))
    }

    pub fn group_names(&self) -> Vec<&'static str> {
        self.groups.iter().map(|(g, _)| g.label()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|(_, items)| items.len()).sum()
    }

    fn push(&mut self, item: SuggestionItem) {
        let group = SuggestionGroup::classify(&item.category);
        match self.groups.iter_mut().find(|(g, _)| *g == group) {
            Some((_, items)) => items.push(item),
            None => self.groups.push((group, vec![item])),
        }
    }
}

/// Parse and group raw suggestion strings, keeping source order inside each group.
pub fn group_suggestions<S: AsRef<str>>(raw: &[S]) -> GroupedSuggestions {
    let mut grouped = GroupedSuggestions::default();
    for (index, suggestion) in raw.iter().enumerate() {
        grouped.push(parse_suggestion(suggestion.as_ref(), index));
    }
    grouped
}

/// `None` when grouping does not apply: a non content-strategy context or
/// no source list at all. An empty source list yields an empty grouping.
pub fn group_for_context<S: AsRef<str>>(
    context: SuggestionContext,
    source: Option<&[S]>,
) -> Option<GroupedSuggestions> {
    if !context.is_content_strategy() {
        return None;
    }
    source.map(group_suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_precedence() {
        assert_eq!(SuggestionGroup::classify("About"), SuggestionGroup::AboutSections);
        assert_eq!(SuggestionGroup::classify("social links"), SuggestionGroup::SocialsAndLinks);
        assert_eq!(SuggestionGroup::classify("Affiliate LINKS"), SuggestionGroup::SocialsAndLinks);
        assert_eq!(SuggestionGroup::classify("cta"), SuggestionGroup::CallToActions);
        assert_eq!(SuggestionGroup::classify("Subscribe prompt"), SuggestionGroup::CallToActions);
        assert_eq!(SuggestionGroup::classify("Chapters"), SuggestionGroup::TimestampsAndChapters);
        assert_eq!(SuggestionGroup::classify("Disclaimer"), SuggestionGroup::LegalAndDisclaimers);
        assert_eq!(SuggestionGroup::classify("Hashtags"), SuggestionGroup::Miscellaneous);
        // "ABOUT" wins over "LINK"
        assert_eq!(SuggestionGroup::classify("About links"), SuggestionGroup::AboutSections);
        // "SOCIAL" wins over "CTA"
        assert_eq!(SuggestionGroup::classify("Social CTA"), SuggestionGroup::SocialsAndLinks);
    }

    #[test]
    fn groups_keep_first_appearance_and_source_order() {
        let raw = [
            "CTA | Ask to subscribe | End with a CTA",
            "ABOUT | About the channel | Explain the channel",
            "not a structured suggestion",
            "SUBSCRIBE | Pin a subscribe link | Add a link",
            "TIMESTAMPS | Chapters | Add chapters | Template: [0:00 Intro]",
        ];

        let grouped = group_suggestions(&raw);

        assert_eq!(
            grouped.group_names(),
            vec![
                "Call to Actions",
                "About Sections",
                "Miscellaneous",
                "Timestamps & Chapters"
            ]
        );

        let ctas = grouped.get(SuggestionGroup::CallToActions).unwrap();
        assert_eq!(
            ctas.iter().map(|i| i.original_index).collect::<Vec<_>>(),
            vec![0, 3]
        );

        let misc = grouped.get(SuggestionGroup::Miscellaneous).unwrap();
        assert_eq!(misc[0].title, "not a structured suggestion");

        assert_eq!(grouped.item_count(), raw.len());
    }

    #[test]
    fn display_order_is_fixed() {
        let raw = ["DISCLAIMER | Legal | Add one", "ABOUT | About | Add one"];
        let grouped = group_suggestions(&raw);
        let order: Vec<_> = grouped.in_display_order().map(|(g, _)| g).collect();
        assert_eq!(
            order,
            vec![SuggestionGroup::AboutSections, SuggestionGroup::LegalAndDisclaimers]
        );
    }

    #[test]
    fn context_distinguishes_empty_from_not_applicable() {
        let empty: Vec<String> = Vec::new();

        let grouped = group_for_context(SuggestionContext::Description, Some(empty.as_slice()));
        assert_eq!(grouped, Some(GroupedSuggestions::default()));

        let absent = group_for_context::<String>(SuggestionContext::Description, None);
        assert!(absent.is_none());

        let title = group_for_context(SuggestionContext::Title, Some(["ABOUT | x | y"].as_slice()));
        assert!(title.is_none());
    }
}
