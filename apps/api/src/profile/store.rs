use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{EducationRow, ExperienceRow, ProfileAggregate, ProfileRow};

const PROFILE_COLUMNS: &str = "p.id, p.user_id, u.name, u.avatar, p.company, p.website, \
     p.location, p.status, p.skills, p.bio, p.github_username, p.social";

/// Normalized profile fields ready to be written.
#[derive(Debug)]
pub struct ProfileFields {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub status: String,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub github_username: Option<String>,
    pub social: Option<serde_json::Value>,
}

/// Atomically inserts or fully replaces the caller's profile in a single
/// conditional write. Two racing submissions from the same user can never
/// produce two rows: the unique constraint on `user_id` turns the loser's
/// insert into an update.
pub async fn upsert_profile(
    pool: &PgPool,
    user_id: Uuid,
    fields: &ProfileFields,
) -> Result<ProfileRow, AppError> {
    sqlx::query(
        "INSERT INTO profiles (user_id, company, website, location, status, skills, bio, github_username, social)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (user_id) DO UPDATE SET
             company = $2, website = $3, location = $4, status = $5,
             skills = $6, bio = $7, github_username = $8, social = $9",
    )
    .bind(user_id)
    .bind(&fields.company)
    .bind(&fields.website)
    .bind(&fields.location)
    .bind(&fields.status)
    .bind(&fields.skills)
    .bind(&fields.bio)
    .bind(&fields.github_username)
    .bind(&fields.social)
    .execute(pool)
    .await?;

    fetch_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("profile vanished after upsert")))
}

pub async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<ProfileRow>, AppError> {
    let profile = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p JOIN users u ON u.id = p.user_id WHERE p.user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

/// Profile joined with all of its experience and education children.
pub async fn fetch_aggregate(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ProfileAggregate>, AppError> {
    let Some(profile) = fetch_profile(pool, user_id).await? else {
        return Ok(None);
    };

    let experience = fetch_experiences(pool, user_id).await?;
    let education = fetch_educations(pool, user_id).await?;

    Ok(Some(ProfileAggregate {
        profile,
        experience,
        education,
    }))
}

/// Unscoped aggregate listing for the public directory. Children are
/// fetched in two bulk queries and grouped in memory per owning user.
pub async fn fetch_all_aggregates(pool: &PgPool) -> Result<Vec<ProfileAggregate>, AppError> {
    let profiles: Vec<ProfileRow> = sqlx::query_as(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p JOIN users u ON u.id = p.user_id ORDER BY u.registered_at"
    ))
    .fetch_all(pool)
    .await?;

    let experiences: Vec<ExperienceRow> = sqlx::query_as(
        "SELECT id, user_id, title, company, location, from_date, to_date, current, description
         FROM experiences ORDER BY from_date DESC",
    )
    .fetch_all(pool)
    .await?;

    let educations: Vec<EducationRow> = sqlx::query_as(
        "SELECT id, user_id, school, degree, field_of_study, from_date, to_date, current, description
         FROM educations ORDER BY from_date DESC",
    )
    .fetch_all(pool)
    .await?;

    let mut exp_by_user: HashMap<Uuid, Vec<ExperienceRow>> = HashMap::new();
    for row in experiences {
        exp_by_user.entry(row.user_id).or_default().push(row);
    }
    let mut edu_by_user: HashMap<Uuid, Vec<EducationRow>> = HashMap::new();
    for row in educations {
        edu_by_user.entry(row.user_id).or_default().push(row);
    }

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let experience = exp_by_user.remove(&profile.user_id).unwrap_or_default();
            let education = edu_by_user.remove(&profile.user_id).unwrap_or_default();
            ProfileAggregate {
                profile,
                experience,
                education,
            }
        })
        .collect())
}

async fn fetch_experiences(pool: &PgPool, user_id: Uuid) -> Result<Vec<ExperienceRow>, AppError> {
    let rows = sqlx::query_as(
        "SELECT id, user_id, title, company, location, from_date, to_date, current, description
         FROM experiences WHERE user_id = $1 ORDER BY from_date DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_educations(pool: &PgPool, user_id: Uuid) -> Result<Vec<EducationRow>, AppError> {
    let rows = sqlx::query_as(
        "SELECT id, user_id, school, degree, field_of_study, from_date, to_date, current, description
         FROM educations WHERE user_id = $1 ORDER BY from_date DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
pub async fn add_experience(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    company: &str,
    location: Option<&str>,
    from_date: NaiveDate,
    to_date: Option<NaiveDate>,
    current: bool,
    description: Option<&str>,
) -> Result<ExperienceRow, AppError> {
    let row = sqlx::query_as(
        "INSERT INTO experiences (user_id, title, company, location, from_date, to_date, current, description)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, user_id, title, company, location, from_date, to_date, current, description",
    )
    .bind(user_id)
    .bind(title)
    .bind(company)
    .bind(location)
    .bind(from_date)
    .bind(to_date)
    .bind(current)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

#[allow(clippy::too_many_arguments)]
pub async fn add_education(
    pool: &PgPool,
    user_id: Uuid,
    school: &str,
    degree: &str,
    field_of_study: &str,
    from_date: NaiveDate,
    to_date: Option<NaiveDate>,
    current: bool,
    description: Option<&str>,
) -> Result<EducationRow, AppError> {
    let row = sqlx::query_as(
        "INSERT INTO educations (user_id, school, degree, field_of_study, from_date, to_date, current, description)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING id, user_id, school, degree, field_of_study, from_date, to_date, current, description",
    )
    .bind(user_id)
    .bind(school)
    .bind(degree)
    .bind(field_of_study)
    .bind(from_date)
    .bind(to_date)
    .bind(current)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes an experience entry, scoped to the caller. A row that exists but
/// belongs to someone else is `Forbidden`, a missing row `NotFound`.
pub async fn delete_experience(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<(), AppError> {
    delete_owned_child(pool, "experiences", id, caller, "Experience not found").await
}

/// Same ownership rule as [`delete_experience`].
pub async fn delete_education(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<(), AppError> {
    delete_owned_child(pool, "educations", id, caller, "Education not found").await
}

async fn delete_owned_child(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    caller: Uuid,
    missing_msg: &str,
) -> Result<(), AppError> {
    let deleted = sqlx::query(&format!(
        "DELETE FROM {table} WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(caller)
    .execute(pool)
    .await?;

    if deleted.rows_affected() > 0 {
        return Ok(());
    }

    let exists: Option<(Uuid,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match exists {
        Some(_) => Err(AppError::Forbidden),
        None => Err(AppError::NotFound(missing_msg.to_string())),
    }
}

// Store-level tests run against a throwaway database created by
// `#[sqlx::test]` with the migrations applied. They are ignored by default
// so the unit suite stays runnable without a server; run them with
// DATABASE_URL set and `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{create_user, delete_user};
    use crate::posts::store as posts;

    async fn seed_user(pool: &PgPool, name: &str, email: &str) -> Uuid {
        create_user(pool, name, email, "hash", "avatar")
            .await
            .unwrap()
            .id
    }

    fn fields(status: &str, skills: &[&str], company: Option<&str>) -> ProfileFields {
        ProfileFields {
            company: company.map(str::to_string),
            website: None,
            location: None,
            status: status.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            bio: None,
            github_username: None,
            social: None,
        }
    }

    async fn count_rows(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
        let row: (i64,) = sqlx::query_as(sql).bind(id).fetch_one(pool).await.unwrap();
        row.0
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn resubmission_replaces_the_single_profile_row(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;

        upsert_profile(&pool, ann, &fields("Dev", &["go", "rust"], Some("Acme")))
            .await
            .unwrap();
        let replaced = upsert_profile(&pool, ann, &fields("Senior Dev", &["rust"], None))
            .await
            .unwrap();

        let rows = count_rows(&pool, "SELECT count(*) FROM profiles WHERE user_id = $1", ann).await;
        assert_eq!(rows, 1);
        assert_eq!(replaced.status, "Senior Dev");
        assert_eq!(replaced.skills, vec!["rust"]);
        // Full replace: the omitted company is cleared, not merged.
        assert_eq!(replaced.company, None);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn aggregate_bundles_profile_with_children(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        upsert_profile(&pool, ann, &fields("Dev", &["go", "rust"], None))
            .await
            .unwrap();
        let from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        add_experience(&pool, ann, "Engineer", "Acme", None, from, None, true, None)
            .await
            .unwrap();
        add_education(&pool, ann, "MIT", "BSc", "CS", from, None, false, None)
            .await
            .unwrap();

        let aggregate = fetch_aggregate(&pool, ann).await.unwrap().unwrap();
        assert_eq!(aggregate.profile.skills, vec!["go", "rust"]);
        assert_eq!(aggregate.experience.len(), 1);
        assert_eq!(aggregate.education.len(), 1);

        assert!(fetch_aggregate(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn deleting_a_user_cascades_every_owned_row(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        upsert_profile(&pool, ann, &fields("Dev", &["go"], None))
            .await
            .unwrap();
        add_experience(&pool, ann, "Engineer", "Acme", None, from, None, true, None)
            .await
            .unwrap();
        add_education(&pool, ann, "MIT", "BSc", "CS", from, None, false, None)
            .await
            .unwrap();

        // Ann's post draws a like and a comment from Bob; Ann likes and
        // comments on Bob's post in turn.
        let anns_post = posts::create_post(&pool, ann, "hello").await.unwrap().id;
        let bobs_post = posts::create_post(&pool, bob, "hi").await.unwrap().id;
        posts::like(&pool, anns_post, bob).await.unwrap();
        posts::add_comment(&pool, anns_post, bob, "welcome").await.unwrap();
        posts::like(&pool, bobs_post, ann).await.unwrap();
        posts::add_comment(&pool, bobs_post, ann, "thanks").await.unwrap();

        delete_user(&pool, ann).await.unwrap();

        for sql in [
            "SELECT count(*) FROM profiles WHERE user_id = $1",
            "SELECT count(*) FROM experiences WHERE user_id = $1",
            "SELECT count(*) FROM educations WHERE user_id = $1",
            "SELECT count(*) FROM posts WHERE user_id = $1",
            "SELECT count(*) FROM comments WHERE user_id = $1",
            "SELECT count(*) FROM likes WHERE user_id = $1",
        ] {
            assert_eq!(count_rows(&pool, sql, ann).await, 0, "{sql}");
        }
        // Likes and comments on Ann's post are gone with the post.
        assert_eq!(
            count_rows(&pool, "SELECT count(*) FROM likes WHERE post_id = $1", anns_post).await,
            0
        );
        assert_eq!(
            count_rows(&pool, "SELECT count(*) FROM comments WHERE post_id = $1", anns_post).await,
            0
        );
        // Bob's own post survives, minus Ann's interactions.
        let bobs = posts::get_post(&pool, bobs_post).await.unwrap();
        assert!(bobs.likes.is_empty());
        assert!(bobs.comments.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn child_rows_are_deleted_only_by_their_owner(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let from = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let exp = add_experience(&pool, ann, "Engineer", "Acme", None, from, None, true, None)
            .await
            .unwrap()
            .id;

        assert!(matches!(
            delete_experience(&pool, exp, bob).await,
            Err(AppError::Forbidden)
        ));
        assert_eq!(
            count_rows(&pool, "SELECT count(*) FROM experiences WHERE id = $1", exp).await,
            1
        );

        delete_experience(&pool, exp, ann).await.unwrap();
        assert!(matches!(
            delete_experience(&pool, exp, ann).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_education(&pool, Uuid::new_v4(), ann).await,
            Err(AppError::NotFound(_))
        ));
    }
}
