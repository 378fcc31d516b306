use deadpool_postgres::{GenericClient, PoolError};
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tokio_postgres::types::{Json, ToSql};
use tracing::instrument;

use crate::api::opportunity::{NewProject, NewTask, Project, ProjectChanges, Task, TaskChanges};
use crate::db::PgPool;
use crate::db::util::{TimedClientExt, push_set};
use crate::matching::buckets::ExperienceLevel;
use crate::{ProjectStatus, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum OpportunityStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map opportunity row: {0}")]
    Mapping(String),
}

fn parse_project_status(value: &str) -> Result<ProjectStatus, OpportunityStorageError> {
    ProjectStatus::parse(value).ok_or_else(|| {
        OpportunityStorageError::Mapping(format!("unknown status_project: {value}"))
    })
}

fn parse_task_status(value: &str) -> Result<TaskStatus, OpportunityStorageError> {
    TaskStatus::parse(value)
        .ok_or_else(|| OpportunityStorageError::Mapping(format!("unknown task status: {value}")))
}

fn row_to_project(row: &Row) -> Result<Project, OpportunityStorageError> {
    Ok(Project {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        project_type: row.try_get("project_type")?,
        details: row.try_get("details")?,
        required_skills: row.try_get("required_skills")?,
        required_languages: row.try_get("required_languages")?,
        min_experience: row
            .try_get::<_, Option<String>>("min_experience")?
            .as_deref()
            .and_then(ExperienceLevel::parse),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        duration: row.try_get("duration")?,
        max_volunteers: row.try_get("max_volunteers")?,
        current_volunteers: row.try_get("current_volunteers")?,
        status_project: parse_project_status(
            row.try_get::<_, String>("status_project")?.as_str(),
        )?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_task(row: &Row) -> Result<Task, OpportunityStorageError> {
    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        required_skills: row.try_get("required_skills")?,
        event_date: row.try_get("event_date")?,
        status: parse_task_status(row.try_get::<_, String>("status")?.as_str())?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip(pool, project))]
pub async fn insert_project(
    pool: &PgPool,
    project: &NewProject,
) -> Result<Project, OpportunityStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_one(
            "INSERT INTO hv.projects (
                title, description, project_type, details,
                required_skills, required_languages, min_experience,
                start_date, end_date, duration, max_volunteers
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *",
            &[
                &project.title,
                &project.description,
                &project.project_type,
                &Json(&project.details),
                &project.required_skills,
                &project.required_languages,
                &project.min_experience.map(|l| l.as_str()),
                &project.start_date,
                &project.end_date,
                &project.duration,
                &project.max_volunteers,
            ],
            "insert_project",
        )
        .await?;
    row_to_project(&row)
}

#[instrument(skip(pool))]
pub async fn fetch_project(
    pool: &PgPool,
    id: i64,
) -> Result<Option<Project>, OpportunityStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT * FROM hv.projects WHERE id = $1",
            &[&id],
            "fetch_project",
        )
        .await?;
    row.as_ref().map(row_to_project).transpose()
}

#[instrument(skip(pool))]
pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.projects ORDER BY start_date ASC NULLS LAST, id",
            &[],
            "list_projects",
        )
        .await?;
    rows.iter().map(row_to_project).collect()
}

#[instrument(skip(pool))]
pub async fn list_active_projects(
    pool: &PgPool,
) -> Result<Vec<Project>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.projects WHERE status_project = 'on_going'
             ORDER BY start_date ASC NULLS LAST, id",
            &[],
            "list_active_projects",
        )
        .await?;
    rows.iter().map(row_to_project).collect()
}

/// Active projects worth recommending: starting inside the next 30 days
/// (or already started) and not yet past their end date. Projects without
/// dates are excluded, there is nothing to schedule against.
#[instrument(skip(pool))]
pub async fn list_projects_starting_soon(
    pool: &PgPool,
) -> Result<Vec<Project>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.projects
             WHERE status_project = 'on_going'
               AND start_date < NOW() + INTERVAL '30 days'
               AND end_date > NOW()
             ORDER BY start_date ASC, id",
            &[],
            "list_projects_starting_soon",
        )
        .await?;
    rows.iter().map(row_to_project).collect()
}

#[instrument(skip(pool, changes))]
pub async fn update_project(
    pool: &PgPool,
    id: i64,
    changes: ProjectChanges,
) -> Result<Option<Project>, OpportunityStorageError> {
    let client = pool.get().await?;

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

    if let Some(title) = changes.title {
        push_set(&mut sets, &mut values, "title", Box::new(title));
    }
    if let Some(description) = changes.description {
        push_set(&mut sets, &mut values, "description", Box::new(description));
    }
    if let Some(project_type) = changes.project_type {
        push_set(&mut sets, &mut values, "project_type", Box::new(project_type));
    }
    if let Some(details) = changes.details {
        push_set(&mut sets, &mut values, "details", Box::new(Json(details)));
    }
    if let Some(required_skills) = changes.required_skills {
        push_set(
            &mut sets,
            &mut values,
            "required_skills",
            Box::new(required_skills),
        );
    }
    if let Some(required_languages) = changes.required_languages {
        push_set(
            &mut sets,
            &mut values,
            "required_languages",
            Box::new(required_languages),
        );
    }
    if let Some(level) = changes.min_experience {
        push_set(
            &mut sets,
            &mut values,
            "min_experience",
            Box::new(level.map(|l| l.as_str())),
        );
    }
    if let Some(start_date) = changes.start_date {
        push_set(&mut sets, &mut values, "start_date", Box::new(start_date));
    }
    if let Some(end_date) = changes.end_date {
        push_set(&mut sets, &mut values, "end_date", Box::new(end_date));
    }
    if let Some(duration) = changes.duration {
        push_set(&mut sets, &mut values, "duration", Box::new(duration));
    }
    if let Some(max_volunteers) = changes.max_volunteers {
        push_set(
            &mut sets,
            &mut values,
            "max_volunteers",
            Box::new(max_volunteers),
        );
    }
    if let Some(status) = changes.status_project {
        push_set(
            &mut sets,
            &mut values,
            "status_project",
            Box::new(status.as_str()),
        );
    }

    sets.push("updated_at = NOW()".to_string());

    values.push(Box::new(id));
    let query = format!(
        "UPDATE hv.projects SET {} WHERE id = ${} RETURNING *",
        sets.join(", "),
        values.len()
    );

    let params: Vec<&(dyn ToSql + Sync)> = values
        .iter()
        .map(|v| v.as_ref() as &(dyn ToSql + Sync))
        .collect();
    let row = client.timed_query_opt(&query, &params, "update_project").await?;
    row.as_ref().map(row_to_project).transpose()
}

#[instrument(skip(pool))]
pub async fn set_project_status(
    pool: &PgPool,
    id: i64,
    status: ProjectStatus,
) -> Result<Option<Project>, OpportunityStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "UPDATE hv.projects SET status_project = $2, updated_at = NOW()
             WHERE id = $1 RETURNING *",
            &[&id, &status.as_str()],
            "set_project_status",
        )
        .await?;
    row.as_ref().map(row_to_project).transpose()
}

/// Delete a project; application rows go with it through the FK cascade.
#[instrument(skip(pool))]
pub async fn delete_project(pool: &PgPool, id: i64) -> Result<bool, OpportunityStorageError> {
    let client = pool.get().await?;
    let deleted = client
        .timed_execute(
            "DELETE FROM hv.projects WHERE id = $1",
            &[&id],
            "delete_project",
        )
        .await?;
    Ok(deleted == 1)
}

/// Outcome of a conditional slot reservation, classified for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotReservation {
    Reserved,
    ProjectMissing,
    ProjectDone,
    Full { available: i32 },
}

/// Claim `count` slots in one conditional statement. Zero rows affected
/// means the guard failed; a diagnostic read tells the caller which gate
/// it was. Runs on any client so transactions can hold their row locks.
pub async fn reserve_project_slots(
    client: &impl GenericClient,
    project_id: i64,
    count: i32,
) -> Result<SlotReservation, PgError> {
    let updated = client
        .timed_execute(
            "UPDATE hv.projects
                SET current_volunteers = current_volunteers + $2, updated_at = NOW()
              WHERE id = $1
                AND status_project = 'on_going'
                AND current_volunteers + $2 <= max_volunteers",
            &[&project_id, &count],
            "reserve_project_slots",
        )
        .await?;
    if updated == 1 {
        return Ok(SlotReservation::Reserved);
    }

    let row = client
        .timed_query_opt(
            "SELECT max_volunteers, current_volunteers, status_project
             FROM hv.projects WHERE id = $1",
            &[&project_id],
            "reserve_project_slots_diagnose",
        )
        .await?;

    Ok(match row {
        None => SlotReservation::ProjectMissing,
        Some(row) => {
            let status: String = row.get("status_project");
            if status != "on_going" {
                SlotReservation::ProjectDone
            } else {
                let max: i32 = row.get("max_volunteers");
                let current: i32 = row.get("current_volunteers");
                SlotReservation::Full {
                    available: (max - current).max(0),
                }
            }
        }
    })
}

/// Mirror of the reservation, floored at zero.
pub async fn release_project_slot(
    client: &impl GenericClient,
    project_id: i64,
) -> Result<(), PgError> {
    client
        .timed_execute(
            "UPDATE hv.projects
                SET current_volunteers = GREATEST(current_volunteers - 1, 0),
                    updated_at = NOW()
              WHERE id = $1",
            &[&project_id],
            "release_project_slot",
        )
        .await?;
    Ok(())
}

#[instrument(skip(pool, task))]
pub async fn insert_task(pool: &PgPool, task: &NewTask) -> Result<Task, OpportunityStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_one(
            "INSERT INTO hv.tasks (title, description, required_skills, event_date)
             VALUES ($1, $2, $3, $4) RETURNING *",
            &[
                &task.title,
                &task.description,
                &task.required_skills,
                &task.event_date,
            ],
            "insert_task",
        )
        .await?;
    row_to_task(&row)
}

#[instrument(skip(pool))]
pub async fn fetch_task(pool: &PgPool, id: i64) -> Result<Option<Task>, OpportunityStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt("SELECT * FROM hv.tasks WHERE id = $1", &[&id], "fetch_task")
        .await?;
    row.as_ref().map(row_to_task).transpose()
}

#[instrument(skip(pool))]
pub async fn list_tasks(pool: &PgPool) -> Result<Vec<Task>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.tasks ORDER BY event_date ASC NULLS LAST, id",
            &[],
            "list_tasks",
        )
        .await?;
    rows.iter().map(row_to_task).collect()
}

/// Open tasks whose event is still ahead, soonest first. Feeds both the
/// public active listing and per-volunteer ranking.
#[instrument(skip(pool))]
pub async fn list_open_upcoming_tasks(
    pool: &PgPool,
) -> Result<Vec<Task>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.tasks WHERE status = 'open' AND event_date > NOW()
             ORDER BY event_date ASC, id",
            &[],
            "list_open_upcoming_tasks",
        )
        .await?;
    rows.iter().map(row_to_task).collect()
}

/// Admin listing, newest first.
#[instrument(skip(pool))]
pub async fn list_tasks_recent_first(
    pool: &PgPool,
) -> Result<Vec<Task>, OpportunityStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.tasks ORDER BY created_at DESC, id DESC",
            &[],
            "list_tasks_recent_first",
        )
        .await?;
    rows.iter().map(row_to_task).collect()
}

#[instrument(skip(pool, changes))]
pub async fn update_task(
    pool: &PgPool,
    id: i64,
    changes: TaskChanges,
) -> Result<Option<Task>, OpportunityStorageError> {
    let client = pool.get().await?;

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

    if let Some(title) = changes.title {
        push_set(&mut sets, &mut values, "title", Box::new(title));
    }
    if let Some(description) = changes.description {
        push_set(&mut sets, &mut values, "description", Box::new(description));
    }
    if let Some(required_skills) = changes.required_skills {
        push_set(
            &mut sets,
            &mut values,
            "required_skills",
            Box::new(required_skills),
        );
    }
    if let Some(event_date) = changes.event_date {
        push_set(&mut sets, &mut values, "event_date", Box::new(event_date));
    }
    if let Some(status) = changes.status {
        push_set(&mut sets, &mut values, "status", Box::new(status.as_str()));
    }

    sets.push("updated_at = NOW()".to_string());

    values.push(Box::new(id));
    let query = format!(
        "UPDATE hv.tasks SET {} WHERE id = ${} RETURNING *",
        sets.join(", "),
        values.len()
    );

    let params: Vec<&(dyn ToSql + Sync)> = values
        .iter()
        .map(|v| v.as_ref() as &(dyn ToSql + Sync))
        .collect();
    let row = client.timed_query_opt(&query, &params, "update_task").await?;
    row.as_ref().map(row_to_task).transpose()
}

#[instrument(skip(pool))]
pub async fn delete_task(pool: &PgPool, id: i64) -> Result<bool, OpportunityStorageError> {
    let client = pool.get().await?;
    let deleted = client
        .timed_execute("DELETE FROM hv.tasks WHERE id = $1", &[&id], "delete_task")
        .await?;
    Ok(deleted == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_status_parser_rejects_unknown_values() {
        assert!(parse_project_status("on_going").is_ok());
        assert!(parse_project_status("done").is_ok());
        assert!(matches!(
            parse_project_status("paused"),
            Err(OpportunityStorageError::Mapping(_))
        ));
    }

    #[test]
    fn task_status_parser_rejects_unknown_values() {
        assert!(parse_task_status("open").is_ok());
        assert!(parse_task_status("closed").is_ok());
        assert!(parse_task_status("archived").is_err());
    }
}
