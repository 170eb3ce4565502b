use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::extract::AuthUser;
use crate::auth::store as user_store;
use crate::errors::AppError;
use crate::models::profile::{EducationRow, ExperienceRow, ProfileAggregate, ProfileRow};
use crate::profile::normalize::{normalize_social, normalize_url, parse_skills};
use crate::profile::store::{self, ProfileFields};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertProfileRequest {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Free-text, comma-delimited list.
    #[serde(default)]
    pub skills: String,
    pub bio: Option<String>,
    #[serde(alias = "githubusername")]
    pub github_username: Option<String>,
    pub social: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct ExperienceRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub location: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EducationRequest {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default, alias = "fieldofstudy")]
    pub field_of_study: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

/// POST /api/profile
/// Creates the caller's profile or fully replaces the existing one.
pub async fn handle_upsert_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let fields = build_profile_fields(&req)?;
    let profile = store::upsert_profile(&state.db, caller.id, &fields).await?;
    Ok(Json(profile))
}

/// GET /api/profile/me
pub async fn handle_my_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ProfileAggregate>, AppError> {
    let aggregate = store::fetch_aggregate(&state.db, caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no profile for this user".to_string()))?;
    Ok(Json(aggregate))
}

/// GET /api/profile
/// Public directory of all profiles with their children.
pub async fn handle_list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileAggregate>>, AppError> {
    let aggregates = store::fetch_all_aggregates(&state.db).await?;
    Ok(Json(aggregates))
}

/// GET /api/profile/user/:user_id
pub async fn handle_profile_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileAggregate>, AppError> {
    let aggregate = store::fetch_aggregate(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    Ok(Json(aggregate))
}

/// DELETE /api/profile
/// Deletes the caller's account and, by ownership cascade, their profile,
/// experience/education rows, posts, comments and likes.
pub async fn handle_delete_account(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Value>, AppError> {
    user_store::delete_user(&state.db, caller.id).await?;
    tracing::info!(user_id = %caller.id, "deleted user account");
    Ok(Json(json!({ "msg": "User deleted" })))
}

/// PUT /api/profile/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<ExperienceRequest>,
) -> Result<Json<ExperienceRow>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if req.company.trim().is_empty() {
        return Err(AppError::Validation("Company is required".to_string()));
    }
    let from = req
        .from
        .ok_or_else(|| AppError::Validation("From date is required".to_string()))?;

    let row = store::add_experience(
        &state.db,
        caller.id,
        req.title.trim(),
        req.company.trim(),
        req.location.as_deref(),
        from,
        end_date(req.current, req.to),
        req.current,
        req.description.as_deref(),
    )
    .await?;
    Ok(Json(row))
}

/// DELETE /api/profile/experience/:id
pub async fn handle_delete_experience(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::delete_experience(&state.db, id, caller.id).await?;
    Ok(Json(json!({ "msg": "Experience removed" })))
}

/// PUT /api/profile/education
pub async fn handle_add_education(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<EducationRequest>,
) -> Result<Json<EducationRow>, AppError> {
    if req.school.trim().is_empty() {
        return Err(AppError::Validation("School is required".to_string()));
    }
    if req.degree.trim().is_empty() {
        return Err(AppError::Validation("Degree is required".to_string()));
    }
    if req.field_of_study.trim().is_empty() {
        return Err(AppError::Validation(
            "Field of study is required".to_string(),
        ));
    }
    let from = req
        .from
        .ok_or_else(|| AppError::Validation("From date is required".to_string()))?;

    let row = store::add_education(
        &state.db,
        caller.id,
        req.school.trim(),
        req.degree.trim(),
        req.field_of_study.trim(),
        from,
        end_date(req.current, req.to),
        req.current,
        req.description.as_deref(),
    )
    .await?;
    Ok(Json(row))
}

/// DELETE /api/profile/education/:id
pub async fn handle_delete_education(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::delete_education(&state.db, id, caller.id).await?;
    Ok(Json(json!({ "msg": "Education removed" })))
}

/// GET /api/profile/github/:username
/// Read-only pass-through to the GitHub repos API.
pub async fn handle_github_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, AppError> {
    let repos = state.github.recent_repos(&username).await?;
    Ok(Json(repos))
}

/// An entry that is marked current has no end date, whatever was supplied.
fn end_date(current: bool, to: Option<NaiveDate>) -> Option<NaiveDate> {
    if current {
        None
    } else {
        to
    }
}

/// Validates and normalizes the submitted fields. Omitted or blank optional
/// fields become NULL on write: resubmission is a full replace, not a merge.
fn build_profile_fields(req: &UpsertProfileRequest) -> Result<ProfileFields, AppError> {
    if req.status.trim().is_empty() {
        return Err(AppError::Validation("Status is required".to_string()));
    }
    let skills = parse_skills(&req.skills);
    if skills.is_empty() {
        return Err(AppError::Validation("Skills is required".to_string()));
    }

    let social = req.social.as_ref().map(normalize_social).and_then(|links| {
        if links.is_empty() {
            None
        } else {
            serde_json::to_value(links).ok()
        }
    });

    Ok(ProfileFields {
        company: non_blank(&req.company),
        website: req.website.as_deref().and_then(normalize_url),
        location: non_blank(&req.location),
        status: req.status.trim().to_string(),
        skills,
        bio: non_blank(&req.bio),
        github_username: non_blank(&req.github_username),
        social,
    })
}

fn non_blank(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_request() -> UpsertProfileRequest {
        UpsertProfileRequest {
            company: None,
            website: None,
            location: None,
            status: "Dev".to_string(),
            skills: "go, rust".to_string(),
            bio: None,
            github_username: None,
            social: None,
        }
    }

    #[test]
    fn skills_are_normalized_into_ordered_tokens() {
        let fields = build_profile_fields(&minimal_request()).unwrap();
        assert_eq!(fields.skills, vec!["go", "rust"]);
    }

    #[test]
    fn missing_status_is_a_validation_error() {
        let req = UpsertProfileRequest {
            status: "  ".to_string(),
            ..minimal_request()
        };
        assert!(matches!(
            build_profile_fields(&req),
            Err(AppError::Validation(msg)) if msg.contains("Status")
        ));
    }

    #[test]
    fn skills_with_no_tokens_is_a_validation_error() {
        let req = UpsertProfileRequest {
            skills: " , ,".to_string(),
            ..minimal_request()
        };
        assert!(matches!(
            build_profile_fields(&req),
            Err(AppError::Validation(msg)) if msg.contains("Skills")
        ));
    }

    #[test]
    fn omitted_optional_fields_are_written_as_null() {
        // Full-replace policy: a resubmission without these fields clears
        // any previously stored values.
        let fields = build_profile_fields(&minimal_request()).unwrap();
        assert_eq!(fields.company, None);
        assert_eq!(fields.website, None);
        assert_eq!(fields.bio, None);
        assert_eq!(fields.social, None);
    }

    #[test]
    fn website_is_canonicalized() {
        let req = UpsertProfileRequest {
            website: Some("ann.dev/".to_string()),
            ..minimal_request()
        };
        let fields = build_profile_fields(&req).unwrap();
        assert_eq!(fields.website.as_deref(), Some("https://ann.dev"));
    }

    #[test]
    fn social_links_are_normalized_and_blank_entries_dropped() {
        let mut social = BTreeMap::new();
        social.insert("twitter".to_string(), "twitter.com/ann".to_string());
        social.insert("facebook".to_string(), "".to_string());
        let req = UpsertProfileRequest {
            social: Some(social),
            ..minimal_request()
        };

        let fields = build_profile_fields(&req).unwrap();
        let social = fields.social.unwrap();
        assert_eq!(social["twitter"], "https://twitter.com/ann");
        assert!(social.get("facebook").is_none());
    }

    #[test]
    fn current_entry_discards_the_end_date() {
        let to = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(end_date(true, to), None);
        assert_eq!(end_date(false, to), to);
    }
}
