use std::collections::{BTreeSet, HashMap};

use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::api::assignment::{
    AdminApplication, AdminApplicationPage, Assignment, AssignmentWithProject, ProjectBrief,
    TaskApplication, VolunteerBrief,
};
use crate::db::PgPool;
use crate::db::opportunities::{SlotReservation, release_project_slot, reserve_project_slots};
use crate::db::util::TimedClientExt;
use crate::matching::RankedVolunteer;
use crate::{AssignmentStatus, AvailabilityStatus, ProjectStatus, TransitionEffect};

/// Stored when an admin bypasses matchmaking and assigns directly.
pub const DIRECT_ASSIGNMENT_REASON: &str = "Ditugaskan langsung oleh admin";

#[derive(Debug, thiserror::Error)]
pub enum AssignmentStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map assignment row: {0}")]
    Mapping(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

fn parse_assignment_status(value: &str) -> Result<AssignmentStatus, AssignmentStorageError> {
    AssignmentStatus::parse(value).ok_or_else(|| {
        AssignmentStorageError::Mapping(format!("unknown assignment status: {value}"))
    })
}

fn parse_availability(value: &str) -> Result<AvailabilityStatus, AssignmentStorageError> {
    AvailabilityStatus::parse(value).ok_or_else(|| {
        AssignmentStorageError::Mapping(format!("unknown status_volunteer: {value}"))
    })
}

fn parse_project_status(value: &str) -> Result<ProjectStatus, AssignmentStorageError> {
    ProjectStatus::parse(value).ok_or_else(|| {
        AssignmentStorageError::Mapping(format!("unknown status_project: {value}"))
    })
}

fn row_to_assignment(row: &Row) -> Result<Assignment, AssignmentStorageError> {
    Ok(Assignment {
        id: row.try_get("id")?,
        volunteer_id: row.try_get("volunteer_id")?,
        project_id: row.try_get("project_id")?,
        status: parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?,
        match_score: row.try_get("match_score")?,
        match_reason: row.try_get("match_reason")?,
        applied_at: row.try_get("applied_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_task_application(row: &Row) -> Result<TaskApplication, AssignmentStorageError> {
    Ok(TaskApplication {
        id: row.try_get("id")?,
        volunteer_id: row.try_get("volunteer_id")?,
        task_id: row.try_get("task_id")?,
        status: parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?,
        match_score: row.try_get("match_score")?,
        match_reason: row.try_get("match_reason")?,
        applied_at: row.try_get("applied_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_assignment_with_project(
    row: &Row,
) -> Result<AssignmentWithProject, AssignmentStorageError> {
    Ok(AssignmentWithProject {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        status: parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?,
        match_score: row.try_get("match_score")?,
        match_reason: row.try_get("match_reason")?,
        applied_at: row.try_get("applied_at")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        project_type: row.try_get("project_type")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status_project: parse_project_status(
            row.try_get::<_, String>("status_project")?.as_str(),
        )?,
    })
}

fn row_to_admin_application(row: &Row) -> Result<AdminApplication, AssignmentStorageError> {
    Ok(AdminApplication {
        id: row.try_get("id")?,
        status: parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?,
        match_score: row.try_get("match_score")?,
        match_reason: row.try_get("match_reason")?,
        applied_at: row.try_get("applied_at")?,
        updated_at: row.try_get("updated_at")?,
        volunteer: VolunteerBrief {
            id: row.try_get("volunteer_id")?,
            name: row.try_get("volunteer_name")?,
            email: row.try_get("volunteer_email")?,
            status_volunteer: parse_availability(
                row.try_get::<_, String>("status_volunteer")?.as_str(),
            )?,
        },
        project: ProjectBrief {
            id: row.try_get("project_id")?,
            title: row.try_get("project_title")?,
            description: row.try_get("project_description")?,
            project_type: row.try_get("project_type")?,
            status_project: parse_project_status(
                row.try_get::<_, String>("status_project")?.as_str(),
            )?,
        },
    })
}

fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

#[instrument(skip(pool))]
pub async fn find_application(
    pool: &PgPool,
    volunteer_id: Uuid,
    project_id: i64,
) -> Result<Option<Assignment>, AssignmentStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT * FROM hv.volunteer_assignments
             WHERE volunteer_id = $1 AND project_id = $2",
            &[&volunteer_id, &project_id],
            "find_application",
        )
        .await?;
    row.as_ref().map(row_to_assignment).transpose()
}

/// Record a volunteer-initiated application. The unique pair index settles
/// duplicate races: if the insert is swallowed by `DO NOTHING`, the winning
/// row's status is read back and reported as the duplicate conflict.
#[instrument(skip(pool, reason))]
pub async fn insert_application(
    pool: &PgPool,
    volunteer_id: Uuid,
    project_id: i64,
    score: i32,
    reason: Option<&str>,
) -> Result<Assignment, AssignmentStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "INSERT INTO hv.volunteer_assignments
                (volunteer_id, project_id, status, match_score, match_reason)
             VALUES ($1, $2, 'applied', $3, $4)
             ON CONFLICT (volunteer_id, project_id) DO NOTHING
             RETURNING *",
            &[&volunteer_id, &project_id, &score, &reason],
            "insert_application",
        )
        .await?;

    if let Some(row) = row {
        return row_to_assignment(&row);
    }

    let existing = client
        .timed_query_opt(
            "SELECT status FROM hv.volunteer_assignments
             WHERE volunteer_id = $1 AND project_id = $2",
            &[&volunteer_id, &project_id],
            "insert_application_diagnose",
        )
        .await?;
    match existing {
        Some(row) => {
            let status: String = row.try_get("status")?;
            Err(AssignmentStorageError::Conflict(format!(
                "Anda sudah mendaftar untuk proyek ini (status: {status})"
            )))
        }
        None => Err(AssignmentStorageError::Conflict(
            "Anda sudah mendaftar untuk proyek ini".to_string(),
        )),
    }
}

#[instrument(skip(pool))]
pub async fn find_task_application(
    pool: &PgPool,
    volunteer_id: Uuid,
    task_id: i64,
) -> Result<Option<TaskApplication>, AssignmentStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT * FROM hv.task_applications
             WHERE volunteer_id = $1 AND task_id = $2",
            &[&volunteer_id, &task_id],
            "find_task_application",
        )
        .await?;
    row.as_ref().map(row_to_task_application).transpose()
}

#[instrument(skip(pool, reason))]
pub async fn insert_task_application(
    pool: &PgPool,
    volunteer_id: Uuid,
    task_id: i64,
    score: i32,
    reason: Option<&str>,
) -> Result<TaskApplication, AssignmentStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "INSERT INTO hv.task_applications
                (volunteer_id, task_id, status, match_score, match_reason)
             VALUES ($1, $2, 'applied', $3, $4)
             ON CONFLICT (volunteer_id, task_id) DO NOTHING
             RETURNING *",
            &[&volunteer_id, &task_id, &score, &reason],
            "insert_task_application",
        )
        .await?;

    match row {
        Some(row) => row_to_task_application(&row),
        None => Err(AssignmentStorageError::Conflict(
            "You have already applied for this task".to_string(),
        )),
    }
}

/// A volunteer's applications joined with their projects, newest first.
/// `limit` trims the profile view; the full listing passes `None`.
#[instrument(skip(pool))]
pub async fn list_for_volunteer(
    pool: &PgPool,
    volunteer_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<AssignmentWithProject>, AssignmentStorageError> {
    const BASE: &str = "SELECT a.id, a.project_id, a.status, a.match_score, a.match_reason,
                a.applied_at, p.title, p.description, p.project_type,
                p.start_date, p.end_date, p.status_project
           FROM hv.volunteer_assignments a
           JOIN hv.projects p ON p.id = a.project_id
          WHERE a.volunteer_id = $1
          ORDER BY a.applied_at DESC, a.id DESC";

    let client = pool.get().await?;
    let rows = match limit {
        Some(limit) => {
            let query = format!("{BASE} LIMIT $2");
            client
                .timed_query(&query, &[&volunteer_id, &limit], "list_for_volunteer")
                .await?
        }
        None => {
            client
                .timed_query(BASE, &[&volunteer_id], "list_for_volunteer")
                .await?
        }
    };
    rows.iter().map(row_to_assignment_with_project).collect()
}

#[instrument(skip(pool))]
pub async fn list_admin_applications(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<AdminApplicationPage, AssignmentStorageError> {
    let client = pool.get().await?;

    let fetch_limit = limit + 1;
    let rows = client
        .timed_query(
            "SELECT a.id, a.status, a.match_score, a.match_reason, a.applied_at, a.updated_at,
                    v.id AS volunteer_id, v.name AS volunteer_name,
                    v.email AS volunteer_email, v.status_volunteer,
                    p.id AS project_id, p.title AS project_title,
                    p.description AS project_description, p.project_type, p.status_project
               FROM hv.volunteer_assignments a
               JOIN hv.profiles v ON v.id = a.volunteer_id
               JOIN hv.projects p ON p.id = a.project_id
              ORDER BY a.applied_at DESC, a.id DESC
              LIMIT $1 OFFSET $2",
            &[&fetch_limit, &offset],
            "list_admin_applications",
        )
        .await?;

    let mut items: Vec<AdminApplication> = rows
        .iter()
        .map(row_to_admin_application)
        .collect::<Result<_, _>>()?;
    let has_more = (items.len() as i64) > limit;
    if has_more {
        items.pop();
    }

    Ok(AdminApplicationPage {
        items,
        limit,
        offset,
        has_more,
    })
}

/// Existing application status per volunteer for one project, keyed for the
/// ranked-candidate view.
#[instrument(skip(pool))]
pub async fn application_statuses_for_project(
    pool: &PgPool,
    project_id: i64,
) -> Result<HashMap<Uuid, AssignmentStatus>, AssignmentStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query(
            "SELECT volunteer_id, status FROM hv.volunteer_assignments
             WHERE project_id = $1",
            &[&project_id],
            "application_statuses_for_project",
        )
        .await?;

    let mut statuses = HashMap::with_capacity(rows.len());
    for row in &rows {
        let volunteer_id: Uuid = row.try_get("volunteer_id")?;
        let status = parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?;
        statuses.insert(volunteer_id, status);
    }
    Ok(statuses)
}

/// Store matchmaking results as `recommended` rows. Volunteers who already
/// have any application for the project keep it untouched; returns how many
/// rows were actually written.
#[instrument(skip(pool, ranked))]
pub async fn upsert_recommendations(
    pool: &PgPool,
    project_id: i64,
    ranked: &[RankedVolunteer],
) -> Result<u64, AssignmentStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let stmt = tx
        .prepare(
            "INSERT INTO hv.volunteer_assignments
                (volunteer_id, project_id, status, match_score, match_reason)
             VALUES ($1, $2, 'recommended', $3, $4)
             ON CONFLICT (volunteer_id, project_id) DO NOTHING",
        )
        .await?;

    let mut written = 0;
    for entry in ranked {
        let score = i32::try_from(entry.score).unwrap_or(i32::MAX);
        let reason = (!entry.reasons.is_empty()).then(|| entry.reasons.join("; "));
        written += tx
            .execute(&stmt, &[&entry.volunteer_id, &project_id, &score, &reason])
            .await?;
    }

    tx.commit().await?;
    Ok(written)
}

/// Outcome of a direct assignment batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectAssignment {
    pub newly_confirmed: u64,
    pub already_confirmed: u64,
}

/// Confirm a batch of volunteers onto a project in one transaction. The
/// project row is locked first, so the capacity math cannot move under the
/// batch; exactly the newly confirmed rows are reserved against capacity.
#[instrument(skip(pool, volunteer_ids))]
pub async fn assign_confirmed(
    pool: &PgPool,
    project_id: i64,
    volunteer_ids: &[Uuid],
) -> Result<DirectAssignment, AssignmentStorageError> {
    let ids = unique_ids(volunteer_ids);

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let Some(project) = tx
        .timed_query_opt(
            "SELECT max_volunteers, current_volunteers, status_project
             FROM hv.projects WHERE id = $1 FOR UPDATE",
            &[&project_id],
            "assign_confirmed_lock",
        )
        .await?
    else {
        return Err(AssignmentStorageError::NotFound(
            "Proyek tidak ditemukan".to_string(),
        ));
    };

    let status = parse_project_status(project.try_get::<_, String>("status_project")?.as_str())?;
    if status != ProjectStatus::OnGoing {
        return Err(AssignmentStorageError::Conflict(
            "Cannot assign volunteers to a completed project".to_string(),
        ));
    }

    // Closed and unknown volunteer ids are both unassignable.
    let open_count: i64 = tx
        .timed_query_one(
            "SELECT COUNT(*) FROM hv.profiles
             WHERE id = ANY($1) AND status_volunteer = 'open'",
            &[&ids],
            "assign_confirmed_open_count",
        )
        .await?
        .get(0);
    let blocked = ids.len() as i64 - open_count;
    if blocked > 0 {
        return Err(AssignmentStorageError::Conflict(format!(
            "{blocked} volunteer(s) have a closed status and cannot be assigned"
        )));
    }

    let already_confirmed: i64 = tx
        .timed_query_one(
            "SELECT COUNT(*) FROM hv.volunteer_assignments
             WHERE project_id = $1 AND volunteer_id = ANY($2) AND status = 'confirmed'",
            &[&project_id, &ids],
            "assign_confirmed_existing",
        )
        .await?
        .get(0);

    let needed = ids.len() as i64 - already_confirmed;
    let max: i32 = project.try_get("max_volunteers")?;
    let current: i32 = project.try_get("current_volunteers")?;
    let available = i64::from((max - current).max(0));
    if needed > available {
        return Err(AssignmentStorageError::Conflict(format!(
            "Hanya tersedia {available} slot untuk volunteer baru"
        )));
    }

    let stmt = tx
        .prepare(
            "INSERT INTO hv.volunteer_assignments
                (volunteer_id, project_id, status, match_score, match_reason)
             VALUES ($1, $2, 'confirmed', NULL, $3)
             ON CONFLICT (volunteer_id, project_id) DO UPDATE
                SET status = 'confirmed',
                    match_score = NULL,
                    match_reason = $3,
                    updated_at = NOW()
              WHERE hv.volunteer_assignments.status <> 'confirmed'
             RETURNING id",
        )
        .await?;

    let mut newly_confirmed: u64 = 0;
    for volunteer_id in &ids {
        let row = tx
            .query_opt(&stmt, &[volunteer_id, &project_id, &DIRECT_ASSIGNMENT_REASON])
            .await?;
        if row.is_some() {
            newly_confirmed += 1;
        }
    }

    if newly_confirmed > 0 {
        let count = i32::try_from(newly_confirmed).unwrap_or(i32::MAX);
        match reserve_project_slots(&tx, project_id, count).await? {
            SlotReservation::Reserved => {}
            SlotReservation::ProjectMissing => {
                return Err(AssignmentStorageError::NotFound(
                    "Proyek tidak ditemukan".to_string(),
                ));
            }
            SlotReservation::ProjectDone => {
                return Err(AssignmentStorageError::Conflict(
                    "Cannot assign volunteers to a completed project".to_string(),
                ));
            }
            SlotReservation::Full { available } => {
                return Err(AssignmentStorageError::Conflict(format!(
                    "Hanya tersedia {available} slot untuk volunteer baru"
                )));
            }
        }
    }

    tx.commit().await?;
    Ok(DirectAssignment {
        newly_confirmed,
        already_confirmed: already_confirmed.max(0) as u64,
    })
}

/// Admin decision on one application. Locks the row, applies the transition
/// function and performs its capacity side effect in the same transaction,
/// so a confirm on the last slot and a duplicate confirm cannot both land.
#[instrument(skip(pool))]
pub async fn update_status(
    pool: &PgPool,
    assignment_id: i64,
    next: AssignmentStatus,
) -> Result<Assignment, AssignmentStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let Some(row) = tx
        .timed_query_opt(
            "SELECT project_id, status FROM hv.volunteer_assignments
             WHERE id = $1 FOR UPDATE",
            &[&assignment_id],
            "update_status_lock",
        )
        .await?
    else {
        return Err(AssignmentStorageError::NotFound(
            "Aplikasi tidak ditemukan".to_string(),
        ));
    };

    let project_id: i64 = row.try_get("project_id")?;
    let current = parse_assignment_status(row.try_get::<_, String>("status")?.as_str())?;

    match current.transition_to(next) {
        None => {
            return Err(AssignmentStorageError::Conflict(format!(
                "Aplikasi sudah dalam status \"{}\"",
                next.as_str()
            )));
        }
        Some(TransitionEffect::Confirm) => {
            match reserve_project_slots(&tx, project_id, 1).await? {
                SlotReservation::Reserved => {}
                SlotReservation::ProjectMissing => {
                    return Err(AssignmentStorageError::NotFound(
                        "Proyek tidak ditemukan".to_string(),
                    ));
                }
                SlotReservation::ProjectDone => {
                    return Err(AssignmentStorageError::Conflict(
                        "Proyek sudah selesai, tidak dapat menerima pendaftaran baru".to_string(),
                    ));
                }
                SlotReservation::Full { .. } => {
                    return Err(AssignmentStorageError::Conflict(
                        "Proyek sudah penuh".to_string(),
                    ));
                }
            }
        }
        Some(TransitionEffect::Release) => {
            release_project_slot(&tx, project_id).await?;
        }
        Some(TransitionEffect::Plain) => {}
    }

    let row = tx
        .timed_query_one(
            "UPDATE hv.volunteer_assignments SET status = $2, updated_at = NOW()
             WHERE id = $1 RETURNING *",
            &[&assignment_id, &next.as_str()],
            "update_status",
        )
        .await?;
    let assignment = row_to_assignment(&row)?;
    tx.commit().await?;
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_status_parser_rejects_unknown_values() {
        assert!(parse_assignment_status("applied").is_ok());
        assert!(parse_assignment_status("recommended").is_ok());
        assert!(parse_assignment_status("confirmed").is_ok());
        assert!(parse_assignment_status("rejected").is_ok());
        assert!(matches!(
            parse_assignment_status("pending"),
            Err(AssignmentStorageError::Mapping(_))
        ));
    }

    #[test]
    fn unique_ids_drops_repeats() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let ids = unique_ids(&[a, b, a, a, b]);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }
}
