use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Profile row joined with the owning user's display name and avatar.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub avatar: String,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub github_username: Option<String>,
    /// Mapping of platform name to normalized URL.
    pub social: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExperienceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EducationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school: String,
    pub degree: String,
    pub field_of_study: String,
    pub from_date: NaiveDate,
    pub to_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
}

/// A profile bundled with its experience and education children,
/// returned as one document.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileAggregate {
    #[serde(flatten)]
    pub profile: ProfileRow,
    pub experience: Vec<ExperienceRow>,
    pub education: Vec<EducationRow>,
}
