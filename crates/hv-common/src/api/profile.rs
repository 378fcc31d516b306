use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::matching::buckets::{DurationPreference, ExperienceLevel};
use crate::{AvailabilityStatus, Role, Volunteer};

/// Profile row as the API returns it. `skill_tags` and `interest_tags` are
/// derived from the raw JSON columns on every write, never edited directly.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub nationalities: Vec<String>,
    pub languages: Vec<String>,
    pub skills: Option<Value>,
    pub skill_tags: Vec<String>,
    pub groups: Option<Value>,
    pub volunteer_opportunities: Option<Value>,
    pub interest_tags: Vec<String>,
    pub years_experience: Option<ExperienceLevel>,
    pub preferred_duration: Option<DurationPreference>,
    pub longest_experience: Option<String>,
    pub availability: Option<String>,
    pub status_volunteer: AvailabilityStatus,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Reduce to the matching engine's candidate view.
    pub fn as_volunteer(&self) -> Volunteer {
        Volunteer {
            id: self.id,
            name: self.name.clone(),
            skill_tags: self.skill_tags.clone(),
            languages: self.languages.clone(),
            years_experience: self.years_experience,
            preferred_duration: self.preferred_duration,
            interest_tags: self.interest_tags.clone(),
            availability: self.status_volunteer,
        }
    }
}

/// Partial profile update. Absent fields are untouched; the two bucket
/// fields and the volunteer status are the only ones that can fail
/// validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub nationalities: Option<Vec<String>>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub skills: Option<Value>,
    #[serde(default)]
    pub groups: Option<Value>,
    #[serde(default)]
    pub volunteer_opportunities: Option<Value>,
    #[serde(default)]
    pub years_experience: Option<String>,
    #[serde(default)]
    pub preferred_duration: Option<String>,
    #[serde(default)]
    pub longest_experience: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub status_volunteer: Option<String>,
}

/// Validated form of [`ProfileUpdate`]. Buckets are parsed here, once; an
/// unrecognized bucket string writes NULL rather than carrying legacy free
/// text forward.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub nationalities: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub skills: Option<Value>,
    pub groups: Option<Value>,
    pub volunteer_opportunities: Option<Value>,
    pub years_experience: Option<Option<ExperienceLevel>>,
    pub preferred_duration: Option<Option<DurationPreference>>,
    pub longest_experience: Option<String>,
    pub availability: Option<String>,
    pub status_volunteer: Option<AvailabilityStatus>,
}

impl ProfileUpdate {
    pub fn validate(self) -> Result<ProfileChanges, String> {
        let status_volunteer = match self.status_volunteer.as_deref() {
            None => None,
            Some(raw) => Some(AvailabilityStatus::parse(raw).ok_or_else(|| {
                r#"Status volunteer must be either "open" or "closed""#.to_string()
            })?),
        };

        Ok(ProfileChanges {
            name: self.name,
            phone: self.phone,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            address: self.address,
            postal_code: self.postal_code,
            country: self.country,
            nationalities: self.nationalities,
            languages: self.languages,
            skills: self.skills,
            groups: self.groups,
            volunteer_opportunities: self.volunteer_opportunities,
            years_experience: self
                .years_experience
                .map(|raw| ExperienceLevel::parse(&raw)),
            preferred_duration: self
                .preferred_duration
                .map(|raw| DurationPreference::parse(&raw)),
            longest_experience: self.longest_experience,
            availability: self.availability,
            status_volunteer,
        })
    }
}

impl ProfileChanges {
    /// True when the update touches a column the tag derivation reads.
    pub fn touches_tags(&self) -> bool {
        self.skills.is_some() || self.groups.is_some() || self.volunteer_opportunities.is_some()
    }
}

/// Admin request: change a user's role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdate {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub role: Option<String>,
}

impl RoleUpdate {
    pub fn validate(&self) -> Result<(Uuid, Role), String> {
        let (Some(user_id), Some(role)) = (self.user_id, self.role.as_deref()) else {
            return Err("User ID and role are required".to_string());
        };
        let role = Role::parse(role)
            .ok_or_else(|| r#"Role must be either "admin" or "volunteer""#.to_string())?;
        Ok((user_id, role))
    }
}

/// Admin request: force a volunteer's availability.
#[derive(Debug, Clone, Deserialize)]
pub struct VolunteerStatusUpdate {
    #[serde(default)]
    pub status_volunteer: Option<String>,
}

impl VolunteerStatusUpdate {
    pub fn validate(&self) -> Result<AvailabilityStatus, String> {
        self.status_volunteer
            .as_deref()
            .and_then(AvailabilityStatus::parse)
            .ok_or_else(|| r#"Status must be either "open" or "closed""#.to_string())
    }
}
