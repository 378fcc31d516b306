use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        description: "profiles, opportunities and application tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS hv.profiles (
    id UUID PRIMARY KEY,
    email TEXT,
    name TEXT,
    phone TEXT,
    gender TEXT,
    date_of_birth DATE,
    address TEXT,
    postal_code TEXT,
    country TEXT,
    nationalities TEXT[] NOT NULL DEFAULT '{}',
    languages TEXT[] NOT NULL DEFAULT '{}',
    skills JSONB,
    skill_tags TEXT[] NOT NULL DEFAULT '{}',
    groups JSONB,
    volunteer_opportunities JSONB,
    interest_tags TEXT[] NOT NULL DEFAULT '{}',
    years_experience TEXT
        CHECK (years_experience IS NULL
               OR years_experience IN ('< 6 months', '6 months - 1 year', '> 1 year')),
    preferred_duration TEXT
        CHECK (preferred_duration IS NULL
               OR preferred_duration IN ('1 week', '2 weeks', '1 month', '> 1 month')),
    longest_experience TEXT,
    availability TEXT,
    status_volunteer TEXT NOT NULL DEFAULT 'open'
        CHECK (status_volunteer IN ('open', 'closed')),
    role TEXT NOT NULL DEFAULT 'volunteer'
        CHECK (role IN ('admin', 'volunteer')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS hv.projects (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    project_type TEXT NOT NULL,
    details JSONB NOT NULL DEFAULT '{}',
    required_skills TEXT[] NOT NULL DEFAULT '{}',
    required_languages TEXT[] NOT NULL DEFAULT '{}',
    min_experience TEXT
        CHECK (min_experience IS NULL
               OR min_experience IN ('< 6 months', '6 months - 1 year', '> 1 year')),
    start_date DATE,
    end_date DATE,
    duration TEXT,
    max_volunteers INTEGER NOT NULL DEFAULT 1,
    current_volunteers INTEGER NOT NULL DEFAULT 0,
    status_project TEXT NOT NULL DEFAULT 'on_going'
        CHECK (status_project IN ('on_going', 'done')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS hv.tasks (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    required_skills TEXT[] NOT NULL DEFAULT '{}',
    event_date TIMESTAMPTZ,
    status TEXT NOT NULL DEFAULT 'open'
        CHECK (status IN ('open', 'closed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS hv.volunteer_assignments (
    id BIGSERIAL PRIMARY KEY,
    volunteer_id UUID NOT NULL REFERENCES hv.profiles(id) ON DELETE CASCADE,
    project_id BIGINT NOT NULL REFERENCES hv.projects(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'applied'
        CHECK (status IN ('applied', 'recommended', 'confirmed', 'rejected')),
    match_score INTEGER,
    match_reason TEXT,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_volunteer_project UNIQUE (volunteer_id, project_id)
);

CREATE TABLE IF NOT EXISTS hv.task_applications (
    id BIGSERIAL PRIMARY KEY,
    volunteer_id UUID NOT NULL REFERENCES hv.profiles(id) ON DELETE CASCADE,
    task_id BIGINT NOT NULL REFERENCES hv.tasks(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'applied'
        CHECK (status IN ('applied', 'recommended', 'confirmed', 'rejected')),
    match_score INTEGER,
    match_reason TEXT,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_volunteer_task UNIQUE (volunteer_id, task_id)
);
"#,
    },
    Migration {
        id: 2,
        description: "lookup indexes for listings and matchmaking",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_projects_status_start
    ON hv.projects(status_project, start_date);
CREATE INDEX IF NOT EXISTS idx_tasks_status_event
    ON hv.tasks(status, event_date);
CREATE INDEX IF NOT EXISTS idx_assignments_project
    ON hv.volunteer_assignments(project_id, status);
CREATE INDEX IF NOT EXISTS idx_assignments_volunteer
    ON hv.volunteer_assignments(volunteer_id, applied_at);
CREATE INDEX IF NOT EXISTS idx_task_applications_volunteer
    ON hv.task_applications(volunteer_id, applied_at);
CREATE INDEX IF NOT EXISTS idx_profiles_role_status
    ON hv.profiles(role, status_volunteer);
"#,
    },
    Migration {
        id: 3,
        description: "safety checks for fill counts + score ranges",
        sql: r#"
DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_fill_count_range'
    ) THEN
        ALTER TABLE hv.projects
            ADD CONSTRAINT chk_fill_count_range
            CHECK (current_volunteers >= 0 AND current_volunteers <= max_volunteers);
    END IF;
END $$;

DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_assignment_score_range'
    ) THEN
        ALTER TABLE hv.volunteer_assignments
            ADD CONSTRAINT chk_assignment_score_range
            CHECK (match_score IS NULL OR (match_score >= 0 AND match_score <= 100));
    END IF;
END $$;

DO $$
BEGIN
    IF NOT EXISTS (
        SELECT 1 FROM pg_constraint WHERE conname = 'chk_task_application_score_range'
    ) THEN
        ALTER TABLE hv.task_applications
            ADD CONSTRAINT chk_task_application_score_range
            CHECK (match_score IS NULL OR (match_score >= 0 AND match_score <= 100));
    END IF;
END $$;
"#,
    },
];

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS hv;
             CREATE TABLE IF NOT EXISTS hv.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in MIGRATIONS {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM hv.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(migration.sql).await?;
        tx.execute(
            "INSERT INTO hv.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_ids_are_unique_and_ordered() {
        let mut previous = 0;
        for migration in MIGRATIONS {
            assert!(migration.id > previous, "ids must strictly increase");
            previous = migration.id;
        }
    }
}
