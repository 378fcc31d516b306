use serde::Serialize;
use uuid::Uuid;

use crate::api::opportunity::{Project, Task};
use crate::matching::buckets::ExperienceLevel;

/// Project listing entry annotated with the caller's match result.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedProject {
    #[serde(flatten)]
    pub project: Project,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
}

/// Task listing entry annotated with the caller's match result.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedTask {
    #[serde(flatten)]
    pub task: Task,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
}

/// Admin view of one candidate for a project, including whether the
/// volunteer already has an application and in what state.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendedVolunteer {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub languages: Vec<String>,
    pub experience: Option<ExperienceLevel>,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
    pub application_status: Option<String>,
}
