use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tokio_postgres::types::{Json, ToSql};
use tracing::instrument;
use uuid::Uuid;

use crate::api::profile::{Profile, ProfileChanges};
use crate::db::PgPool;
use crate::db::util::{TimedClientExt, push_set};
use crate::matching::buckets::{DurationPreference, ExperienceLevel};
use crate::matching::skills;
use crate::{AvailabilityStatus, Role};

#[derive(Debug, thiserror::Error)]
pub enum ProfileStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to map profile row: {0}")]
    Mapping(String),
}

fn parse_availability(value: &str) -> Result<AvailabilityStatus, ProfileStorageError> {
    AvailabilityStatus::parse(value).ok_or_else(|| {
        ProfileStorageError::Mapping(format!("unknown status_volunteer: {value}"))
    })
}

fn parse_role(value: &str) -> Result<Role, ProfileStorageError> {
    Role::parse(value)
        .ok_or_else(|| ProfileStorageError::Mapping(format!("unknown role: {value}")))
}

fn row_to_profile(row: &Row) -> Result<Profile, ProfileStorageError> {
    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        gender: row.try_get("gender")?,
        date_of_birth: row.try_get("date_of_birth")?,
        address: row.try_get("address")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        nationalities: row.try_get("nationalities")?,
        languages: row.try_get("languages")?,
        skills: row.try_get("skills")?,
        skill_tags: row.try_get("skill_tags")?,
        groups: row.try_get("groups")?,
        volunteer_opportunities: row.try_get("volunteer_opportunities")?,
        interest_tags: row.try_get("interest_tags")?,
        // Bucket columns are CHECK-constrained, but rows predating the
        // constraint degrade to "no data" instead of failing the fetch.
        years_experience: row
            .try_get::<_, Option<String>>("years_experience")?
            .as_deref()
            .and_then(ExperienceLevel::parse),
        preferred_duration: row
            .try_get::<_, Option<String>>("preferred_duration")?
            .as_deref()
            .and_then(DurationPreference::parse),
        longest_experience: row.try_get("longest_experience")?,
        availability: row.try_get("availability")?,
        status_volunteer: parse_availability(
            row.try_get::<_, String>("status_volunteer")?.as_str(),
        )?,
        role: parse_role(row.try_get::<_, String>("role")?.as_str())?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Create the profile row backing an identity-provider account. Re-running
/// for an existing id is a no-op; returns whether a row was created.
#[instrument(skip(pool))]
pub async fn ensure_profile(
    pool: &PgPool,
    id: Uuid,
    email: &str,
    name: Option<&str>,
) -> Result<bool, ProfileStorageError> {
    let client = pool.get().await?;
    let created = client
        .timed_execute(
            "INSERT INTO hv.profiles (id, email, name) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
            &[&id, &email, &name],
            "ensure_profile",
        )
        .await?;
    Ok(created == 1)
}

#[instrument(skip(pool))]
pub async fn fetch_profile(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Profile>, ProfileStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT * FROM hv.profiles WHERE id = $1",
            &[&id],
            "fetch_profile",
        )
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

/// Apply a partial update. When any of the raw skill/interest sources change,
/// the row is locked and the derived tag columns are recomputed from the
/// merged state, so a patch touching only `groups` still folds the stored
/// `volunteer_opportunities` into `interest_tags`.
#[instrument(skip(pool, changes))]
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    changes: ProfileChanges,
) -> Result<Option<Profile>, ProfileStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let mut derived_skill_tags: Option<Vec<String>> = None;
    let mut derived_interest_tags: Option<Vec<String>> = None;

    if changes.touches_tags() {
        let Some(row) = tx
            .timed_query_opt(
                "SELECT groups, volunteer_opportunities FROM hv.profiles
                 WHERE id = $1 FOR UPDATE",
                &[&id],
                "update_profile_lock",
            )
            .await?
        else {
            return Ok(None);
        };

        let stored_groups: Option<Value> = row.try_get("groups")?;
        let stored_opportunities: Option<Value> = row.try_get("volunteer_opportunities")?;

        if let Some(skills_value) = &changes.skills {
            derived_skill_tags = Some(skills::flatten_skill_map(skills_value));
        }
        if changes.groups.is_some() || changes.volunteer_opportunities.is_some() {
            let groups = changes.groups.as_ref().or(stored_groups.as_ref());
            let opportunities = changes
                .volunteer_opportunities
                .as_ref()
                .or(stored_opportunities.as_ref());
            derived_interest_tags = Some(skills::interest_tags(groups, opportunities));
        }
    }

    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

    if let Some(name) = changes.name {
        push_set(&mut sets, &mut values, "name", Box::new(name));
    }
    if let Some(phone) = changes.phone {
        push_set(&mut sets, &mut values, "phone", Box::new(phone));
    }
    if let Some(gender) = changes.gender {
        push_set(&mut sets, &mut values, "gender", Box::new(gender));
    }
    if let Some(date_of_birth) = changes.date_of_birth {
        push_set(&mut sets, &mut values, "date_of_birth", Box::new(date_of_birth));
    }
    if let Some(address) = changes.address {
        push_set(&mut sets, &mut values, "address", Box::new(address));
    }
    if let Some(postal_code) = changes.postal_code {
        push_set(&mut sets, &mut values, "postal_code", Box::new(postal_code));
    }
    if let Some(country) = changes.country {
        push_set(&mut sets, &mut values, "country", Box::new(country));
    }
    if let Some(nationalities) = changes.nationalities {
        push_set(&mut sets, &mut values, "nationalities", Box::new(nationalities));
    }
    if let Some(languages) = changes.languages {
        push_set(&mut sets, &mut values, "languages", Box::new(languages));
    }
    if let Some(skills_value) = changes.skills {
        push_set(&mut sets, &mut values, "skills", Box::new(Json(skills_value)));
    }
    if let Some(groups) = changes.groups {
        push_set(&mut sets, &mut values, "groups", Box::new(Json(groups)));
    }
    if let Some(opportunities) = changes.volunteer_opportunities {
        push_set(
            &mut sets,
            &mut values,
            "volunteer_opportunities",
            Box::new(Json(opportunities)),
        );
    }
    if let Some(level) = changes.years_experience {
        push_set(
            &mut sets,
            &mut values,
            "years_experience",
            Box::new(level.map(|l| l.as_str())),
        );
    }
    if let Some(preference) = changes.preferred_duration {
        push_set(
            &mut sets,
            &mut values,
            "preferred_duration",
            Box::new(preference.map(|p| p.as_str())),
        );
    }
    if let Some(longest_experience) = changes.longest_experience {
        push_set(
            &mut sets,
            &mut values,
            "longest_experience",
            Box::new(longest_experience),
        );
    }
    if let Some(availability) = changes.availability {
        push_set(&mut sets, &mut values, "availability", Box::new(availability));
    }
    if let Some(status) = changes.status_volunteer {
        push_set(
            &mut sets,
            &mut values,
            "status_volunteer",
            Box::new(status.as_str()),
        );
    }
    if let Some(tags) = derived_skill_tags {
        push_set(&mut sets, &mut values, "skill_tags", Box::new(tags));
    }
    if let Some(tags) = derived_interest_tags {
        push_set(&mut sets, &mut values, "interest_tags", Box::new(tags));
    }

    sets.push("updated_at = NOW()".to_string());

    values.push(Box::new(id));
    let query = format!(
        "UPDATE hv.profiles SET {} WHERE id = ${} RETURNING *",
        sets.join(", "),
        values.len()
    );

    let params: Vec<&(dyn ToSql + Sync)> = values
        .iter()
        .map(|v| v.as_ref() as &(dyn ToSql + Sync))
        .collect();
    let row = tx.timed_query_opt(&query, &params, "update_profile").await?;
    let profile = row.as_ref().map(row_to_profile).transpose()?;
    tx.commit().await?;
    Ok(profile)
}

/// Flip open <-> closed under a row lock so two racing toggles land on
/// opposite states instead of the same one.
#[instrument(skip(pool))]
pub async fn toggle_availability(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Profile>, ProfileStorageError> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let Some(row) = tx
        .timed_query_opt(
            "SELECT status_volunteer FROM hv.profiles WHERE id = $1 FOR UPDATE",
            &[&id],
            "toggle_availability_lock",
        )
        .await?
    else {
        return Ok(None);
    };

    let current = parse_availability(row.try_get::<_, String>("status_volunteer")?.as_str())?;
    let next = current.toggled();

    let row = tx
        .timed_query_one(
            "UPDATE hv.profiles SET status_volunteer = $2, updated_at = NOW()
             WHERE id = $1 RETURNING *",
            &[&id, &next.as_str()],
            "toggle_availability",
        )
        .await?;
    let profile = row_to_profile(&row)?;
    tx.commit().await?;
    Ok(Some(profile))
}

#[instrument(skip(pool))]
pub async fn set_availability(
    pool: &PgPool,
    id: Uuid,
    status: AvailabilityStatus,
) -> Result<Option<Profile>, ProfileStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "UPDATE hv.profiles SET status_volunteer = $2, updated_at = NOW()
             WHERE id = $1 RETURNING *",
            &[&id, &status.as_str()],
            "set_availability",
        )
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

#[instrument(skip(pool))]
pub async fn set_role(
    pool: &PgPool,
    id: Uuid,
    role: Role,
) -> Result<Option<Profile>, ProfileStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "UPDATE hv.profiles SET role = $2, updated_at = NOW()
             WHERE id = $1 RETURNING *",
            &[&id, &role.as_str()],
            "set_role",
        )
        .await?;
    row.as_ref().map(row_to_profile).transpose()
}

/// Role lookup for the admin gate; single column, no row mapping.
#[instrument(skip(pool))]
pub async fn fetch_role(pool: &PgPool, id: Uuid) -> Result<Option<Role>, ProfileStorageError> {
    let client = pool.get().await?;
    let row = client
        .timed_query_opt(
            "SELECT role FROM hv.profiles WHERE id = $1",
            &[&id],
            "fetch_role",
        )
        .await?;
    match row {
        None => Ok(None),
        Some(row) => {
            let role: String = row.try_get("role")?;
            Ok(Some(parse_role(&role)?))
        }
    }
}

#[instrument(skip(pool))]
pub async fn list_profiles(pool: &PgPool) -> Result<Vec<Profile>, ProfileStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query(
            "SELECT * FROM hv.profiles ORDER BY updated_at DESC, id",
            &[],
            "list_profiles",
        )
        .await?;
    rows.iter().map(row_to_profile).collect()
}

/// Matchmaking candidate pool: every profile currently open for work,
/// oldest first so score ties rank long-standing volunteers ahead.
#[instrument(skip(pool))]
pub async fn list_open_volunteers(pool: &PgPool) -> Result<Vec<Profile>, ProfileStorageError> {
    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT * FROM hv.profiles WHERE status_volunteer = 'open'
             ORDER BY created_at, id",
            &[],
            "list_open_volunteers",
        )
        .await?;
    rows.iter().map(row_to_profile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_parser_rejects_unknown_values() {
        assert!(parse_availability("open").is_ok());
        assert!(parse_availability("closed").is_ok());

        let err = parse_availability("busy").unwrap_err();
        assert!(matches!(err, ProfileStorageError::Mapping(_)));
    }

    #[test]
    fn role_parser_rejects_unknown_values() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("volunteer").unwrap(), Role::Volunteer);
        assert!(parse_role("superuser").is_err());
    }
}
