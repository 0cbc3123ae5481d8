//! Keyword-driven grouping of manual lines into topical sections.

use crate::parser::Manual;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Topical section of the manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Maintenance,
    Troubleshooting,
    Engine,
    Transmission,
    Electrical,
    Brakes,
    Suspension,
    AirConditioning,
    Heating,
}

impl Section {
    /// Every section, in header-matching order.
    pub const ALL: [Section; 9] = [
        Section::Maintenance,
        Section::Troubleshooting,
        Section::Engine,
        Section::Transmission,
        Section::Electrical,
        Section::Brakes,
        Section::Suspension,
        Section::AirConditioning,
        Section::Heating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintenance => "maintenance",
            Self::Troubleshooting => "troubleshooting",
            Self::Engine => "engine",
            Self::Transmission => "transmission",
            Self::Electrical => "electrical",
            Self::Brakes => "brakes",
            Self::Suspension => "suspension",
            Self::AirConditioning => "air_conditioning",
            Self::Heating => "heating",
        }
    }

    /// Lowercase substrings that mark a line as this section's header.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Maintenance => &["maintenance", "service"],
            Self::Troubleshooting => &["troubleshoot", "problem", "diagnostic"],
            Self::Engine => &["engine"],
            Self::Transmission => &["transmission"],
            Self::Electrical => &["electrical"],
            Self::Brakes => &["brake"],
            Self::Suspension => &["suspension"],
            Self::AirConditioning => &["air conditioning", "a/c", "hvac"],
            Self::Heating => &["heating"],
        }
    }

    /// First section whose keywords appear in `line`.
    fn detect(line: &str) -> Option<Section> {
        let lower = line.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|section| section.keywords().iter().any(|kw| lower.contains(kw)))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group the manual's lines into sections.
///
/// A line containing a section keyword switches the current section. Every
/// non-blank line, header included, is appended to the current section with a
/// trailing newline. Lines before the first header are dropped. All nine
/// sections are present in the result, possibly empty.
pub fn extract_sections(manual: &Manual) -> BTreeMap<Section, String> {
    let mut sections: BTreeMap<Section, String> =
        Section::ALL.into_iter().map(|s| (s, String::new())).collect();

    let full_text = manual.full_text();
    let mut current: Option<Section> = None;

    for line in full_text.split('\n') {
        if let Some(section) = Section::detect(line) {
            current = Some(section);
        }

        if let Some(section) = current {
            if !line.trim().is_empty() {
                if let Some(body) = sections.get_mut(&section) {
                    body.push_str(line);
                    body.push('\n');
                }
            }
        }
    }

    tracing::debug!(
        "Extracted sections: {}",
        sections
            .iter()
            .map(|(s, body)| format!("{}={}", s, body.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(pages: &[&str]) -> Manual {
        Manual::from_pages("manual.pdf", pages.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_all_sections_present() {
        let sections = extract_sections(&manual(&["Nothing relevant here"]));
        assert_eq!(sections.len(), 9);
        assert!(sections.values().all(|body| body.is_empty()));
    }

    #[test]
    fn test_lines_follow_current_header() {
        let sections = extract_sections(&manual(&[
            "Introduction\nENGINE COMPARTMENT\nCheck oil level\n\nCoolant reservoir\nBRAKE SYSTEM\nPads wear indicator",
        ]));

        assert_eq!(
            sections[&Section::Engine],
            "ENGINE COMPARTMENT\nCheck oil level\nCoolant reservoir\n"
        );
        assert_eq!(sections[&Section::Brakes], "BRAKE SYSTEM\nPads wear indicator\n");
        assert!(!sections[&Section::Engine].contains("Introduction"));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // "service" (maintenance) is checked before "engine"
        let sections = extract_sections(&manual(&["Engine service intervals\nEvery 6000 miles"]));
        assert!(sections[&Section::Maintenance].contains("Every 6000 miles"));
        assert!(sections[&Section::Engine].is_empty());
    }

    #[test]
    fn test_air_conditioning_aliases() {
        let sections = extract_sections(&manual(&["Using the A/C\nSelect recirculation"]));
        assert!(sections[&Section::AirConditioning].contains("Select recirculation"));
    }

    #[test]
    fn test_page_markers_belong_to_open_section() {
        let sections = extract_sections(&manual(&["Transmission fluid", "Use ATF+4"]));
        assert_eq!(
            sections[&Section::Transmission],
            "Transmission fluid\n--- Page 2 ---\nUse ATF+4\n"
        );
    }

    #[test]
    fn test_serializes_with_snake_case_keys() {
        let sections = extract_sections(&manual(&["HVAC controls"]));
        let json = serde_json::to_value(&sections).unwrap();
        assert_eq!(json["air_conditioning"], "HVAC controls\n");
    }
}
