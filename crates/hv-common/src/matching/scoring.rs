use crate::matching::buckets::duration_demand;
use crate::matching::skills::{interest_matches, skill_matches};
use crate::matching::weights::RuleWeights;
use crate::{Opportunity, Volunteer};

/// Scores are clamped here; reasons are not, so a capped score still carries
/// its full audit trail.
pub const MAX_SCORE: u32 = 100;

/// Result of scoring one volunteer against one opportunity. The reasons are
/// the strings persisted in `match_reason` and shown to admins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub score: u32,
    pub reasons: Vec<String>,
}

struct RuleHit {
    points: u32,
    reasons: Vec<String>,
}

impl RuleHit {
    fn none() -> Self {
        Self {
            points: 0,
            reasons: Vec::new(),
        }
    }

    fn single(points: u32, reason: String) -> Self {
        Self {
            points,
            reasons: vec![reason],
        }
    }
}

/// Rule-based matcher. Pure and deterministic: no I/O, no clock, the same
/// inputs always produce the same outcome.
#[derive(Debug, Clone, Default)]
pub struct MatchEngine {
    weights: RuleWeights,
}

impl MatchEngine {
    pub fn new(weights: RuleWeights) -> Self {
        Self { weights }
    }

    pub fn from_env() -> Self {
        Self::new(RuleWeights::from_env())
    }

    /// Evaluate the five dimensions in fixed order (skills, languages,
    /// experience, duration, interest) and sum their points. A dimension
    /// missing data on either side contributes nothing; there are no
    /// penalties, so the score never goes below zero.
    pub fn score(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> MatchOutcome {
        let mut total = 0u32;
        let mut reasons = Vec::new();

        for hit in [
            self.score_skills(volunteer, opportunity),
            self.score_languages(volunteer, opportunity),
            self.score_experience(volunteer, opportunity),
            self.score_duration(volunteer, opportunity),
            self.score_interest(volunteer, opportunity),
        ] {
            total += hit.points;
            reasons.extend(hit.reasons);
        }

        MatchOutcome {
            score: total.min(MAX_SCORE),
            reasons,
        }
    }

    /// Every required skill found among the volunteer's tags earns the skill
    /// weight once, so skill-heavy opportunities reward broad volunteers.
    fn score_skills(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> RuleHit {
        let mut hit = RuleHit::none();
        if volunteer.skill_tags.is_empty() {
            return hit;
        }
        for required in &opportunity.required_skills {
            if skill_matches(required, &volunteer.skill_tags) {
                hit.points += self.weights.skills;
                hit.reasons
                    .push(format!("Memiliki keahlian yang dibutuhkan: {required}"));
            }
        }
        hit
    }

    /// Case-insensitive exact match per required language.
    fn score_languages(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> RuleHit {
        let mut hit = RuleHit::none();
        if volunteer.languages.is_empty() {
            return hit;
        }
        for required in &opportunity.required_languages {
            let needle = required.trim().to_lowercase();
            if needle.is_empty() {
                continue;
            }
            if volunteer
                .languages
                .iter()
                .any(|spoken| spoken.trim().to_lowercase() == needle)
            {
                hit.points += self.weights.languages;
                hit.reasons
                    .push(format!("Menguasai bahasa yang dibutuhkan: {required}"));
            }
        }
        hit
    }

    fn score_experience(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> RuleHit {
        let (Some(minimum), Some(level)) = (opportunity.min_experience, volunteer.years_experience)
        else {
            return RuleHit::none();
        };
        if level.rank() >= minimum.rank() {
            return RuleHit::single(
                self.weights.experience,
                format!("Memiliki pengalaman yang cukup: {}", level.as_str()),
            );
        }
        RuleHit::none()
    }

    /// The opportunity's free-text duration is bucketed into a demand rank;
    /// the rule passes when the volunteer is willing to commit at least that
    /// long.
    fn score_duration(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> RuleHit {
        let Some(preference) = volunteer.preferred_duration else {
            return RuleHit::none();
        };
        let Some(text) = opportunity
            .duration
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        else {
            return RuleHit::none();
        };
        if duration_demand(text) <= preference.rank() {
            return RuleHit::single(
                self.weights.duration,
                format!("Durasi proyek sesuai preferensi: {}", preference.as_str()),
            );
        }
        RuleHit::none()
    }

    fn score_interest(&self, volunteer: &Volunteer, opportunity: &Opportunity) -> RuleHit {
        let Some(category) = opportunity
            .category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
        else {
            return RuleHit::none();
        };
        if interest_matches(category, &volunteer.interest_tags) {
            return RuleHit::single(
                self.weights.interest,
                format!("Tertarik dengan tipe proyek: {category}"),
            );
        }
        RuleHit::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::buckets::{DurationPreference, ExperienceLevel};
    use crate::{AvailabilityStatus, OpportunityKind, OpportunityStatus};
    use uuid::Uuid;

    fn archive_project() -> Opportunity {
        Opportunity {
            id: 1,
            kind: OpportunityKind::Project,
            title: "Kota Tua archive digitization".into(),
            category: Some("conservation".into()),
            required_skills: vec!["Research".into(), "Typing".into()],
            required_languages: vec!["Indonesian".into(), "English".into()],
            min_experience: Some(ExperienceLevel::UnderSixMonths),
            duration: Some("1 month".into()),
            status: OpportunityStatus::Active,
        }
    }

    fn seasoned_volunteer() -> Volunteer {
        Volunteer {
            id: Uuid::from_u128(1),
            name: Some("Sari".into()),
            skill_tags: vec!["archival research".into(), "typing".into()],
            languages: vec!["Indonesian".into(), "English".into()],
            years_experience: Some(ExperienceLevel::OverOneYear),
            preferred_duration: Some(DurationPreference::OverOneMonth),
            interest_tags: vec!["conservation".into()],
            availability: AvailabilityStatus::Open,
        }
    }

    #[test]
    fn three_matched_dimensions_score_their_weights_in_order() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills = vec!["Research".into()];
        opportunity.required_languages = vec!["Indonesian".into()];
        opportunity.duration = None;
        opportunity.category = None;

        let mut volunteer = seasoned_volunteer();
        volunteer.preferred_duration = None;
        volunteer.interest_tags.clear();

        let outcome = engine.score(&volunteer, &opportunity);

        assert_eq!(outcome.score, 60);
        assert_eq!(
            outcome.reasons,
            vec![
                "Memiliki keahlian yang dibutuhkan: Research",
                "Menguasai bahasa yang dibutuhkan: Indonesian",
                "Memiliki pengalaman yang cukup: > 1 year",
            ]
        );
    }

    #[test]
    fn each_matched_skill_earns_the_weight_once() {
        let engine = MatchEngine::default();
        let opportunity = archive_project();

        let mut volunteer = seasoned_volunteer();
        volunteer.languages.clear();
        volunteer.years_experience = None;
        volunteer.preferred_duration = None;
        volunteer.interest_tags.clear();

        let outcome = engine.score(&volunteer, &opportunity);

        // "Research" hits "archival research", "Typing" hits "typing".
        assert_eq!(outcome.score, 40);
        assert_eq!(outcome.reasons.len(), 2);
    }

    #[test]
    fn language_match_is_exact_but_case_insensitive() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills.clear();
        opportunity.required_languages = vec!["INDONESIAN".into(), "Dutch".into()];
        opportunity.min_experience = None;
        opportunity.duration = None;
        opportunity.category = None;

        let outcome = engine.score(&seasoned_volunteer(), &opportunity);

        assert_eq!(outcome.score, 20);
        assert_eq!(
            outcome.reasons,
            vec!["Menguasai bahasa yang dibutuhkan: INDONESIAN"]
        );
    }

    #[test]
    fn insufficient_experience_earns_nothing() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills.clear();
        opportunity.required_languages.clear();
        opportunity.duration = None;
        opportunity.category = None;
        opportunity.min_experience = Some(ExperienceLevel::OverOneYear);

        let mut volunteer = seasoned_volunteer();
        volunteer.years_experience = Some(ExperienceLevel::UnderSixMonths);

        let outcome = engine.score(&volunteer, &opportunity);

        assert_eq!(outcome.score, 0);
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn longer_demand_than_preference_earns_nothing() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills.clear();
        opportunity.required_languages.clear();
        opportunity.min_experience = None;
        opportunity.category = None;
        opportunity.duration = Some("> 1 month".into());

        let mut volunteer = seasoned_volunteer();
        volunteer.preferred_duration = Some(DurationPreference::OneWeek);

        assert_eq!(engine.score(&volunteer, &opportunity).score, 0);

        volunteer.preferred_duration = Some(DurationPreference::OverOneMonth);
        let outcome = engine.score(&volunteer, &opportunity);
        assert_eq!(outcome.score, 20);
        assert_eq!(
            outcome.reasons,
            vec!["Durasi proyek sesuai preferensi: > 1 month"]
        );
    }

    #[test]
    fn unrecognized_duration_counts_as_shortest_demand() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills.clear();
        opportunity.required_languages.clear();
        opportunity.min_experience = None;
        opportunity.category = None;
        opportunity.duration = Some("flexible schedule".into());

        let mut volunteer = seasoned_volunteer();
        volunteer.preferred_duration = Some(DurationPreference::OneWeek);

        assert_eq!(engine.score(&volunteer, &opportunity).score, 20);
    }

    #[test]
    fn museum_category_matches_the_museum_tag() {
        let engine = MatchEngine::default();

        let mut opportunity = archive_project();
        opportunity.required_skills.clear();
        opportunity.required_languages.clear();
        opportunity.min_experience = None;
        opportunity.duration = None;
        opportunity.category = Some("Museum Guiding".into());

        let mut volunteer = seasoned_volunteer();
        volunteer.interest_tags = vec!["museum".into()];

        let outcome = engine.score(&volunteer, &opportunity);

        assert_eq!(outcome.score, 20);
        assert_eq!(
            outcome.reasons,
            vec!["Tertarik dengan tipe proyek: Museum Guiding"]
        );
    }

    #[test]
    fn full_match_clamps_the_score_but_keeps_every_reason() {
        let engine = MatchEngine::default();

        // Two skills, two languages, experience, duration and interest all
        // hit: 40 + 40 + 20 + 20 + 20 raw.
        let outcome = engine.score(&seasoned_volunteer(), &archive_project());

        assert_eq!(outcome.score, MAX_SCORE);
        assert_eq!(outcome.reasons.len(), 7);
    }

    #[test]
    fn empty_sides_are_neutral() {
        let engine = MatchEngine::default();

        let outcome = engine.score(&Volunteer::default(), &Opportunity::default());

        assert_eq!(outcome.score, 0);
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn custom_weights_flow_through() {
        let engine = MatchEngine::new(RuleWeights {
            skills: 50,
            languages: 0,
            experience: 0,
            duration: 0,
            interest: 0,
        });

        let mut opportunity = archive_project();
        opportunity.required_skills = vec!["Typing".into()];

        let outcome = engine.score(&seasoned_volunteer(), &opportunity);

        assert_eq!(outcome.score, 50);
    }
}
