use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::matching::buckets::ExperienceLevel;
use crate::{Opportunity, OpportunityKind, ProjectStatus, TaskStatus};

/// Project row as the API returns it. The fill count pair is only ever
/// changed through slot reservation, never through a plain patch.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub project_type: String,
    pub details: Value,
    pub required_skills: Vec<String>,
    pub required_languages: Vec<String>,
    pub min_experience: Option<ExperienceLevel>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<String>,
    pub max_volunteers: i32,
    pub current_volunteers: i32,
    pub status_project: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Reduce to the matching engine's target view.
    pub fn as_opportunity(&self) -> Opportunity {
        Opportunity {
            id: self.id,
            kind: OpportunityKind::Project,
            title: self.title.clone(),
            category: Some(self.project_type.clone()),
            required_skills: self.required_skills.clone(),
            required_languages: self.required_languages.clone(),
            min_experience: self.min_experience,
            duration: self.duration.clone(),
            status: self.status_project.into(),
        }
    }

    pub fn available_slots(&self) -> i32 {
        (self.max_volunteers - self.current_volunteers).max(0)
    }
}

/// Task row as the API returns it. Tasks carry no languages, experience
/// floor, duration or category, so only the skills dimension can score.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn as_opportunity(&self) -> Opportunity {
        Opportunity {
            id: self.id,
            kind: OpportunityKind::Task,
            title: self.title.clone(),
            category: None,
            required_skills: self.required_skills.clone(),
            required_languages: Vec::new(),
            min_experience: None,
            duration: None,
            status: self.status.into(),
        }
    }
}

/// Create-project request. Only title and type are mandatory; the rest
/// defaults the way the admin form leaves fields blank.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub required_languages: Option<Vec<String>>,
    #[serde(default)]
    pub min_experience: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub max_volunteers: Option<i32>,
}

/// Validated create-project payload with defaults applied.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub project_type: String,
    pub details: Value,
    pub required_skills: Vec<String>,
    pub required_languages: Vec<String>,
    pub min_experience: Option<ExperienceLevel>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<String>,
    pub max_volunteers: i32,
}

impl ProjectInput {
    pub fn validate(self) -> Result<NewProject, String> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let project_type = self
            .project_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let (Some(title), Some(project_type)) = (title, project_type) else {
            return Err("Judul dan tipe proyek diperlukan".to_string());
        };

        let max_volunteers = self.max_volunteers.unwrap_or(1);
        if max_volunteers < 1 {
            return Err("max_volunteers must be at least 1".to_string());
        }

        Ok(NewProject {
            title,
            description: self.description,
            project_type,
            details: self.details.unwrap_or_else(|| Value::Object(Default::default())),
            required_skills: self.required_skills.unwrap_or_default(),
            required_languages: self.required_languages.unwrap_or_default(),
            min_experience: self
                .min_experience
                .as_deref()
                .and_then(ExperienceLevel::parse),
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
            max_volunteers,
        })
    }
}

/// Partial project update; absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub required_languages: Option<Vec<String>>,
    #[serde(default)]
    pub min_experience: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub max_volunteers: Option<i32>,
    #[serde(default)]
    pub status_project: Option<String>,
}

/// Validated partial update. Like the profile buckets, an unrecognized
/// experience floor writes NULL instead of propagating free text.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_type: Option<String>,
    pub details: Option<Value>,
    pub required_skills: Option<Vec<String>>,
    pub required_languages: Option<Vec<String>>,
    pub min_experience: Option<Option<ExperienceLevel>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<String>,
    pub max_volunteers: Option<i32>,
    pub status_project: Option<ProjectStatus>,
}

impl ProjectPatch {
    pub fn validate(self) -> Result<ProjectChanges, String> {
        let status_project = match self.status_project.as_deref() {
            None => None,
            Some(raw) => Some(ProjectStatus::parse(raw).ok_or_else(|| {
                r#"Status must be either "on_going" or "done""#.to_string()
            })?),
        };
        if let Some(max) = self.max_volunteers {
            if max < 1 {
                return Err("max_volunteers must be at least 1".to_string());
            }
        }

        Ok(ProjectChanges {
            title: self.title,
            description: self.description,
            project_type: self.project_type,
            details: self.details,
            required_skills: self.required_skills,
            required_languages: self.required_languages,
            min_experience: self
                .min_experience
                .map(|raw| ExperienceLevel::parse(&raw)),
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
            max_volunteers: self.max_volunteers,
            status_project,
        })
    }
}

/// Admin request: flip a project between on_going and done.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectStatusUpdate {
    #[serde(default)]
    pub status_project: Option<String>,
}

impl ProjectStatusUpdate {
    pub fn validate(&self) -> Result<ProjectStatus, String> {
        self.status_project
            .as_deref()
            .and_then(ProjectStatus::parse)
            .ok_or_else(|| r#"Status must be either "on_going" or "done""#.to_string())
    }
}

/// Create-task request; only the title is mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub event_date: Option<DateTime<Utc>>,
}

impl TaskInput {
    pub fn validate(self) -> Result<NewTask, String> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "Title is required".to_string())?;

        Ok(NewTask {
            title,
            description: self.description,
            required_skills: self.required_skills.unwrap_or_default(),
            event_date: self.event_date,
        })
    }
}

/// Partial task update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<Vec<String>>,
    pub event_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn validate(self) -> Result<TaskChanges, String> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(TaskStatus::parse(raw).ok_or_else(|| {
                r#"Status must be either "open" or "closed""#.to_string()
            })?),
        };

        Ok(TaskChanges {
            title: self.title,
            description: self.description,
            required_skills: self.required_skills,
            event_date: self.event_date,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_input_requires_title_and_type() {
        let missing = ProjectInput {
            title: Some("Restorasi arsip".into()),
            ..ProjectInput::default()
        };
        assert_eq!(
            missing.validate().unwrap_err(),
            "Judul dan tipe proyek diperlukan"
        );

        let blank = ProjectInput {
            title: Some("   ".into()),
            project_type: Some("conservation".into()),
            ..ProjectInput::default()
        };
        assert_eq!(
            blank.validate().unwrap_err(),
            "Judul dan tipe proyek diperlukan"
        );
    }

    #[test]
    fn project_input_applies_defaults() {
        let input = ProjectInput {
            title: Some("Restorasi arsip".into()),
            project_type: Some("conservation".into()),
            min_experience: Some("> 1 year".into()),
            ..ProjectInput::default()
        };

        let project = input.validate().unwrap();
        assert_eq!(project.max_volunteers, 1);
        assert!(project.required_skills.is_empty());
        assert_eq!(project.details, serde_json::json!({}));
        assert_eq!(project.min_experience, Some(ExperienceLevel::OverOneYear));
    }

    #[test]
    fn project_input_rejects_zero_capacity() {
        let input = ProjectInput {
            title: Some("Restorasi arsip".into()),
            project_type: Some("conservation".into()),
            max_volunteers: Some(0),
            ..ProjectInput::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn project_patch_validates_status() {
        let patch = ProjectPatch {
            status_project: Some("paused".into()),
            ..ProjectPatch::default()
        };
        assert_eq!(
            patch.validate().unwrap_err(),
            r#"Status must be either "on_going" or "done""#
        );
    }

    #[test]
    fn task_input_requires_title() {
        assert_eq!(
            TaskInput::default().validate().unwrap_err(),
            "Title is required"
        );
    }

    #[test]
    fn task_becomes_a_skills_only_opportunity() {
        let task = Task {
            id: 3,
            title: "Weekend museum desk".into(),
            description: None,
            required_skills: vec!["public speaking".into()],
            event_date: None,
            status: TaskStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let opportunity = task.as_opportunity();
        assert_eq!(opportunity.kind, OpportunityKind::Task);
        assert!(opportunity.required_languages.is_empty());
        assert!(opportunity.category.is_none());
        assert!(opportunity.min_experience.is_none());
    }

    #[test]
    fn available_slots_never_go_negative() {
        let project = Project {
            id: 1,
            title: "t".into(),
            description: None,
            project_type: "conservation".into(),
            details: serde_json::json!({}),
            required_skills: Vec::new(),
            required_languages: Vec::new(),
            min_experience: None,
            start_date: None,
            end_date: None,
            duration: None,
            max_volunteers: 2,
            current_volunteers: 5,
            status_project: ProjectStatus::OnGoing,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(project.available_slots(), 0);
    }
}
