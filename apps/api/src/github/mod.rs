use std::time::Duration;

use serde_json::Value;

use crate::errors::AppError;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Stateless, read-only proxy to the GitHub repos API. Failures are mapped
/// to `ExternalUnavailable` rather than surfacing raw network faults.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!("devlink-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, token })
    }

    /// The user's five most recently created public repositories,
    /// passed through as the raw GitHub response body.
    pub async fn recent_repos(&self, username: &str) -> Result<Value, AppError> {
        let url = format!(
            "https://api.github.com/users/{username}/repos?per_page=5&sort=created:asc"
        );
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(
                "No GitHub profile found for that username".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(AppError::ExternalUnavailable(format!(
                "GitHub returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalUnavailable(e.to_string()))
    }
}
