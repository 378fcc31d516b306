use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AssignmentStatus, AvailabilityStatus, ProjectStatus};

/// One volunteer/project application row.
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub volunteer_id: Uuid,
    pub project_id: i64,
    pub status: AssignmentStatus,
    pub match_score: Option<i32>,
    pub match_reason: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One volunteer/task application row.
#[derive(Debug, Clone, Serialize)]
pub struct TaskApplication {
    pub id: i64,
    pub volunteer_id: Uuid,
    pub task_id: i64,
    pub status: AssignmentStatus,
    pub match_score: Option<i32>,
    pub match_reason: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with the project columns the volunteer-facing
/// listings need; one query instead of a fetch per row.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentWithProject {
    pub id: i64,
    pub project_id: i64,
    pub status: AssignmentStatus,
    pub match_score: Option<i32>,
    pub match_reason: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub project_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status_project: ProjectStatus,
}

/// Compact volunteer columns for the admin application table.
#[derive(Debug, Clone, Serialize)]
pub struct VolunteerBrief {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub status_volunteer: AvailabilityStatus,
}

/// Compact project columns for the admin application table.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBrief {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub project_type: String,
    pub status_project: ProjectStatus,
}

/// Admin view of one application with both sides of the join inlined.
#[derive(Debug, Clone, Serialize)]
pub struct AdminApplication {
    pub id: i64,
    pub status: AssignmentStatus,
    pub match_score: Option<i32>,
    pub match_reason: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub volunteer: VolunteerBrief,
    pub project: ProjectBrief,
}

/// Page of admin applications; `has_more` comes from over-fetching one row.
#[derive(Debug, Clone, Serialize)]
pub struct AdminApplicationPage {
    pub items: Vec<AdminApplication>,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

/// Admin request: move an application to confirmed or rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusUpdate {
    /// Only the two decision states are reachable from this endpoint;
    /// applied and recommended are machine-written.
    pub fn validate(&self) -> Result<AssignmentStatus, String> {
        match self.status.as_deref().and_then(AssignmentStatus::parse) {
            Some(status @ (AssignmentStatus::Confirmed | AssignmentStatus::Rejected)) => {
                Ok(status)
            }
            _ => Err(r#"Status harus "confirmed" atau "rejected""#.to_string()),
        }
    }
}

/// Admin request: directly assign a batch of volunteers to a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub volunteer_ids: Vec<Uuid>,
}

impl AssignRequest {
    pub fn validate(&self) -> Result<&[Uuid], String> {
        if self.volunteer_ids.is_empty() {
            return Err("Daftar volunteer_id diperlukan".to_string());
        }
        Ok(&self.volunteer_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_accepts_only_decision_states() {
        let confirm = StatusUpdate {
            status: Some("confirmed".into()),
        };
        assert_eq!(confirm.validate().unwrap(), AssignmentStatus::Confirmed);

        let reject = StatusUpdate {
            status: Some("rejected".into()),
        };
        assert_eq!(reject.validate().unwrap(), AssignmentStatus::Rejected);

        for raw in ["applied", "recommended", "done", ""] {
            let update = StatusUpdate {
                status: Some(raw.into()),
            };
            assert_eq!(
                update.validate().unwrap_err(),
                r#"Status harus "confirmed" atau "rejected""#
            );
        }
    }

    #[test]
    fn status_update_requires_a_status() {
        let update = StatusUpdate { status: None };
        assert!(update.validate().is_err());
    }

    #[test]
    fn assign_request_rejects_empty_batch() {
        assert_eq!(
            AssignRequest::default().validate().unwrap_err(),
            "Daftar volunteer_id diperlukan"
        );

        let request = AssignRequest {
            volunteer_ids: vec![Uuid::new_v4()],
        };
        assert_eq!(request.validate().unwrap().len(), 1);
    }
}
