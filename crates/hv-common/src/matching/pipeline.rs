use serde::Serialize;
use uuid::Uuid;

use crate::matching::scoring::MatchEngine;
use crate::{AvailabilityStatus, Opportunity, OpportunityKind, OpportunityStatus, Volunteer};

/// One volunteer ranked against a fixed opportunity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedVolunteer {
    pub volunteer_id: Uuid,
    pub name: Option<String>,
    pub score: u32,
    pub reasons: Vec<String>,
}

/// One opportunity ranked for a fixed volunteer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOpportunity {
    pub opportunity_id: i64,
    pub kind: OpportunityKind,
    pub title: String,
    pub score: u32,
    pub reasons: Vec<String>,
}

impl MatchEngine {
    /// Matchmaking direction: rank the given volunteers for one opportunity.
    /// Closed profiles are skipped before scoring, zero scores are dropped,
    /// and equal scores keep their input order.
    pub fn rank_volunteers(
        &self,
        opportunity: &Opportunity,
        volunteers: &[Volunteer],
    ) -> Vec<RankedVolunteer> {
        if opportunity.status != OpportunityStatus::Active {
            return Vec::new();
        }

        let mut ranked: Vec<RankedVolunteer> = volunteers
            .iter()
            .filter(|volunteer| volunteer.availability == AvailabilityStatus::Open)
            .filter_map(|volunteer| {
                let outcome = self.score(volunteer, opportunity);
                if outcome.score == 0 {
                    return None;
                }
                Some(RankedVolunteer {
                    volunteer_id: volunteer.id,
                    name: volunteer.name.clone(),
                    score: outcome.score,
                    reasons: outcome.reasons,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Recommendation direction: rank opportunities for one volunteer.
    /// A closed profile gets no recommendations at all; terminal
    /// opportunities are skipped before scoring.
    pub fn rank_opportunities(
        &self,
        volunteer: &Volunteer,
        opportunities: &[Opportunity],
    ) -> Vec<RankedOpportunity> {
        if volunteer.availability != AvailabilityStatus::Open {
            return Vec::new();
        }

        let mut ranked: Vec<RankedOpportunity> = opportunities
            .iter()
            .filter(|opportunity| opportunity.status == OpportunityStatus::Active)
            .filter_map(|opportunity| {
                let outcome = self.score(volunteer, opportunity);
                if outcome.score == 0 {
                    return None;
                }
                Some(RankedOpportunity {
                    opportunity_id: opportunity.id,
                    kind: opportunity.kind,
                    title: opportunity.title.clone(),
                    score: outcome.score,
                    reasons: outcome.reasons,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::buckets::ExperienceLevel;

    fn guiding_project() -> Opportunity {
        Opportunity {
            id: 7,
            kind: OpportunityKind::Project,
            title: "Old town guided walks".into(),
            category: Some("events".into()),
            required_skills: vec!["public speaking".into(), "history".into()],
            required_languages: vec!["English".into()],
            min_experience: None,
            duration: None,
            status: OpportunityStatus::Active,
        }
    }

    fn volunteer(id: u128, tags: &[&str], languages: &[&str]) -> Volunteer {
        Volunteer {
            id: Uuid::from_u128(id),
            name: Some(format!("volunteer-{id}")),
            skill_tags: tags.iter().map(|t| t.to_string()).collect(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            ..Volunteer::default()
        }
    }

    #[test]
    fn volunteers_rank_by_score_descending() {
        let engine = MatchEngine::default();
        let strong = volunteer(1, &["public speaking", "history"], &["English"]);
        let weak = volunteer(2, &["history"], &[]);
        let unrelated = volunteer(3, &["carpentry"], &[]);

        let ranked =
            engine.rank_volunteers(&guiding_project(), &[weak, unrelated, strong.clone()]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].volunteer_id, strong.id);
        assert_eq!(ranked[0].score, 60);
        assert_eq!(ranked[1].score, 20);
    }

    #[test]
    fn closed_volunteers_are_skipped_before_scoring() {
        let engine = MatchEngine::default();
        let mut closed = volunteer(1, &["public speaking"], &["English"]);
        closed.availability = AvailabilityStatus::Closed;

        let ranked = engine.rank_volunteers(&guiding_project(), &[closed]);

        assert!(ranked.is_empty());
    }

    #[test]
    fn terminal_opportunity_yields_no_ranking() {
        let engine = MatchEngine::default();
        let mut done = guiding_project();
        done.status = OpportunityStatus::Terminal;

        let ranked =
            engine.rank_volunteers(&done, &[volunteer(1, &["history"], &["English"])]);

        assert!(ranked.is_empty());
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let engine = MatchEngine::default();
        let first = volunteer(1, &["history"], &[]);
        let second = volunteer(2, &["history"], &[]);

        let ranked = engine.rank_volunteers(&guiding_project(), &[first, second]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].volunteer_id, Uuid::from_u128(1));
        assert_eq!(ranked[1].volunteer_id, Uuid::from_u128(2));
    }

    #[test]
    fn opportunities_rank_for_a_volunteer_and_skip_terminal_ones() {
        let engine = MatchEngine::default();
        let candidate = volunteer(1, &["public speaking", "history"], &["English"]);

        let mut archived = guiding_project();
        archived.id = 8;
        archived.status = OpportunityStatus::Terminal;

        let mut task = guiding_project();
        task.id = 9;
        task.kind = OpportunityKind::Task;
        task.required_skills = vec!["history".into()];
        task.required_languages.clear();
        task.category = None;

        let ranked =
            engine.rank_opportunities(&candidate, &[archived, task, guiding_project()]);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].opportunity_id, 7);
        assert_eq!(ranked[0].score, 60);
        assert_eq!(ranked[1].opportunity_id, 9);
        assert_eq!(ranked[1].kind, OpportunityKind::Task);
        assert_eq!(ranked[1].score, 20);
    }

    #[test]
    fn closed_profile_gets_no_recommendations() {
        let engine = MatchEngine::default();
        let mut candidate = volunteer(1, &["history"], &["English"]);
        candidate.availability = AvailabilityStatus::Closed;

        let ranked = engine.rank_opportunities(&candidate, &[guiding_project()]);

        assert!(ranked.is_empty());
    }

    #[test]
    fn experience_gate_still_applies_inside_ranking() {
        let engine = MatchEngine::default();
        let mut project = guiding_project();
        project.min_experience = Some(ExperienceLevel::OverOneYear);
        project.required_skills.clear();
        project.required_languages.clear();
        project.category = None;

        // No experience on the profile: nothing can score, so nothing ranks.
        let ranked = engine.rank_volunteers(&project, &[volunteer(1, &["history"], &[])]);

        assert!(ranked.is_empty());
    }
}
