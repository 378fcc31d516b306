use std::collections::BTreeSet;

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Tag a category interest gains when the museum training option is picked.
pub const MUSEUM_TAG: &str = "museum";

/// Canonical tag form: NFKC fold, lowercase, underscores become spaces,
/// internal whitespace collapses to single spaces. Empty input stays empty.
pub fn canonical_tag(input: &str) -> String {
    let folded = input
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .replace('_', " ");
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Group names carry one legacy plural that has to line up with the singular
/// category written on projects.
pub fn canonical_group_tag(name: &str) -> String {
    let tag = canonical_tag(name);
    if tag == "study groups" {
        return "study group".to_string();
    }
    tag
}

/// Flatten the nested profile skills map (`category -> { skill: bool }`) into
/// sorted canonical tags. Only `true` leaves count; anything that is not an
/// object is skipped rather than rejected, since historical rows are messy.
pub fn flatten_skill_map(skills: &Value) -> Vec<String> {
    let mut tags = BTreeSet::new();
    if let Value::Object(categories) = skills {
        for group in categories.values() {
            let Value::Object(entries) = group else {
                continue;
            };
            for (name, selected) in entries {
                if selected.as_bool() == Some(true) {
                    let tag = canonical_tag(name);
                    if !tag.is_empty() {
                        tags.insert(tag);
                    }
                }
            }
        }
    }
    tags.into_iter().collect()
}

/// Derive the interest tags stored on a profile: every joined group plus the
/// museum tag when `volunteer_opportunities.museum.training` is set.
pub fn interest_tags(groups: Option<&Value>, opportunities: Option<&Value>) -> Vec<String> {
    let mut tags = BTreeSet::new();
    if let Some(Value::Object(entries)) = groups {
        for (name, joined) in entries {
            if joined.as_bool() == Some(true) {
                let tag = canonical_group_tag(name);
                if !tag.is_empty() {
                    tags.insert(tag);
                }
            }
        }
    }
    if museum_training_selected(opportunities) {
        tags.insert(MUSEUM_TAG.to_string());
    }
    tags.into_iter().collect()
}

fn museum_training_selected(opportunities: Option<&Value>) -> bool {
    opportunities
        .and_then(|value| value.get("museum"))
        .and_then(|museum| museum.get("training"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Bidirectional substring match between one required skill and the canonical
/// tags: either side containing the other counts.
pub fn skill_matches(required: &str, tags: &[String]) -> bool {
    let needle = canonical_tag(required);
    if needle.is_empty() {
        return false;
    }
    tags.iter()
        .any(|tag| tag.contains(&needle) || needle.contains(tag.as_str()))
}

/// Category interest: exact canonical tag equality, with one widening — any
/// category mentioning the museum matches the museum tag.
pub fn interest_matches(category: &str, tags: &[String]) -> bool {
    let needle = canonical_tag(category);
    if needle.is_empty() {
        return false;
    }
    if tags.iter().any(|tag| *tag == needle) {
        return true;
    }
    needle.contains(MUSEUM_TAG) && tags.iter().any(|tag| tag == MUSEUM_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_tag_folds_case_underscores_and_width() {
        assert_eq!(canonical_tag("Heritage_Research"), "heritage research");
        assert_eq!(canonical_tag("  Guiding   Tours "), "guiding tours");
        assert_eq!(canonical_tag("Ｒｅｓｅａｒｃｈ"), "research");
        assert_eq!(canonical_tag("___"), "");
    }

    #[test]
    fn flatten_keeps_only_selected_skills() {
        let skills = json!({
            "research": { "archival_research": true, "oral_history": false },
            "communication": { "public_speaking": true, "Translation": true },
            "noise": "not an object"
        });

        assert_eq!(
            flatten_skill_map(&skills),
            vec![
                "archival research".to_string(),
                "public speaking".to_string(),
                "translation".to_string(),
            ]
        );
    }

    #[test]
    fn flatten_of_non_object_input_is_empty() {
        assert!(flatten_skill_map(&json!(null)).is_empty());
        assert!(flatten_skill_map(&json!(["list"])).is_empty());
    }

    #[test]
    fn interest_tags_alias_study_groups_and_add_museum() {
        let groups = json!({ "Study_Groups": true, "conservation": true, "events": false });
        let opportunities = json!({ "museum": { "training": true, "tour": false } });

        assert_eq!(
            interest_tags(Some(&groups), Some(&opportunities)),
            vec![
                "conservation".to_string(),
                "museum".to_string(),
                "study group".to_string(),
            ]
        );
    }

    #[test]
    fn interest_tags_without_museum_training() {
        let opportunities = json!({ "museum": { "training": false } });
        assert!(interest_tags(None, Some(&opportunities)).is_empty());
    }

    #[test]
    fn skill_match_is_bidirectional() {
        let tags = vec!["archival research".to_string(), "javanese".to_string()];

        // Required skill contained in a tag.
        assert!(skill_matches("research", &tags));
        // Tag contained in the required skill.
        assert!(skill_matches("Javanese script reading", &tags));
        assert!(!skill_matches("carpentry", &tags));
        assert!(!skill_matches("   ", &tags));
    }

    #[test]
    fn interest_match_is_exact_except_for_museum() {
        let tags = vec!["conservation".to_string(), "museum".to_string()];

        assert!(interest_matches("Conservation", &tags));
        assert!(!interest_matches("conservation training", &tags));
        assert!(interest_matches("museum tour guide", &tags));
        assert!(!interest_matches("archive", &tags));
    }
}
