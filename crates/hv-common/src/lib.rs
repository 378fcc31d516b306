pub mod api;
pub mod cache;
pub mod db;
pub mod logging;
pub mod matching;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use matching::buckets::{DurationPreference, ExperienceLevel};

// Commonly used data models for the matching engine. These are the scoring
// views; full row shapes live under `api` and are produced by `db`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volunteer {
    pub id: Uuid,
    pub name: Option<String>,
    pub skill_tags: Vec<String>,
    pub languages: Vec<String>,
    pub years_experience: Option<ExperienceLevel>,
    pub preferred_duration: Option<DurationPreference>,
    pub interest_tags: Vec<String>,
    pub availability: AvailabilityStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Opportunity {
    pub id: i64,
    pub kind: OpportunityKind,
    pub title: String,
    pub category: Option<String>,
    pub required_skills: Vec<String>,
    pub required_languages: Vec<String>,
    pub min_experience: Option<ExperienceLevel>,
    pub duration: Option<String>,
    pub status: OpportunityStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    #[default]
    Project,
    Task,
}

impl OpportunityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityKind::Project => "project",
            OpportunityKind::Task => "task",
        }
    }
}

/// Whether an opportunity still accepts volunteers. Projects and tasks store
/// different wire strings for the same two states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpportunityStatus {
    #[default]
    Active,
    Terminal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    OnGoing,
    Done,
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_going" => Some(ProjectStatus::OnGoing),
            "done" => Some(ProjectStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::OnGoing => "on_going",
            ProjectStatus::Done => "done",
        }
    }
}

impl From<ProjectStatus> for OpportunityStatus {
    fn from(status: ProjectStatus) -> Self {
        match status {
            ProjectStatus::OnGoing => OpportunityStatus::Active,
            ProjectStatus::Done => OpportunityStatus::Terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    Closed,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TaskStatus::Open),
            "closed" => Some(TaskStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Closed => "closed",
        }
    }
}

impl From<TaskStatus> for OpportunityStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Open => OpportunityStatus::Active,
            TaskStatus::Closed => OpportunityStatus::Terminal,
        }
    }
}

/// Volunteer-side gate: a closed profile neither applies nor gets matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    #[default]
    Open,
    Closed,
}

impl AvailabilityStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(AvailabilityStatus::Open),
            "closed" => Some(AvailabilityStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Open => "open",
            AvailabilityStatus::Closed => "closed",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            AvailabilityStatus::Open => AvailabilityStatus::Closed,
            AvailabilityStatus::Closed => AvailabilityStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Volunteer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "volunteer" => Some(Role::Volunteer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Volunteer => "volunteer",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Applied,
    Recommended,
    Confirmed,
    Rejected,
}

impl AssignmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(AssignmentStatus::Applied),
            "recommended" => Some(AssignmentStatus::Recommended),
            "confirmed" => Some(AssignmentStatus::Confirmed),
            "rejected" => Some(AssignmentStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Applied => "applied",
            AssignmentStatus::Recommended => "recommended",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::Rejected => "rejected",
        }
    }

    /// Capacity side effect of moving this assignment to `next`, or `None`
    /// when the status would not change. Slot accounting hangs off these two
    /// rules: entering `Confirmed` reserves a slot, leaving it releases one.
    pub fn transition_to(self, next: AssignmentStatus) -> Option<TransitionEffect> {
        if self == next {
            return None;
        }
        if next == AssignmentStatus::Confirmed {
            return Some(TransitionEffect::Confirm);
        }
        if self == AssignmentStatus::Confirmed {
            return Some(TransitionEffect::Release);
        }
        Some(TransitionEffect::Plain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Status write only, fill count untouched.
    Plain,
    /// Reserve one project slot in the same transaction as the write.
    Confirm,
    /// Free one project slot in the same transaction as the write.
    Release,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            AssignmentStatus::Applied,
            AssignmentStatus::Recommended,
            AssignmentStatus::Confirmed,
            AssignmentStatus::Rejected,
        ] {
            assert_eq!(AssignmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProjectStatus::parse("on_going"), Some(ProjectStatus::OnGoing));
        assert_eq!(TaskStatus::parse("open"), Some(TaskStatus::Open));
        assert_eq!(AssignmentStatus::parse("pending"), None);
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn confirming_reserves_exactly_once() {
        assert_eq!(
            AssignmentStatus::Applied.transition_to(AssignmentStatus::Confirmed),
            Some(TransitionEffect::Confirm)
        );
        assert_eq!(
            AssignmentStatus::Recommended.transition_to(AssignmentStatus::Confirmed),
            Some(TransitionEffect::Confirm)
        );
        // Re-confirming is not a transition, so it cannot reserve again.
        assert_eq!(
            AssignmentStatus::Confirmed.transition_to(AssignmentStatus::Confirmed),
            None
        );
    }

    #[test]
    fn leaving_confirmed_releases_the_slot() {
        assert_eq!(
            AssignmentStatus::Confirmed.transition_to(AssignmentStatus::Rejected),
            Some(TransitionEffect::Release)
        );
        // A rejection that never held a slot releases nothing.
        assert_eq!(
            AssignmentStatus::Applied.transition_to(AssignmentStatus::Rejected),
            Some(TransitionEffect::Plain)
        );
        assert_eq!(
            AssignmentStatus::Rejected.transition_to(AssignmentStatus::Rejected),
            None
        );
    }

    #[test]
    fn plain_moves_do_not_touch_capacity() {
        assert_eq!(
            AssignmentStatus::Applied.transition_to(AssignmentStatus::Recommended),
            Some(TransitionEffect::Plain)
        );
        assert_eq!(
            AssignmentStatus::Rejected.transition_to(AssignmentStatus::Recommended),
            Some(TransitionEffect::Plain)
        );
    }

    #[test]
    fn terminal_statuses_map_across_kinds() {
        assert_eq!(
            OpportunityStatus::from(ProjectStatus::Done),
            OpportunityStatus::Terminal
        );
        assert_eq!(
            OpportunityStatus::from(TaskStatus::Closed),
            OpportunityStatus::Terminal
        );
        assert_eq!(
            OpportunityStatus::from(ProjectStatus::OnGoing),
            OpportunityStatus::Active
        );
    }

    #[test]
    fn toggling_availability_flips_between_the_two_states() {
        assert_eq!(AvailabilityStatus::Open.toggled(), AvailabilityStatus::Closed);
        assert_eq!(AvailabilityStatus::Closed.toggled(), AvailabilityStatus::Open);
    }
}
