//! GitHub API client
//!
//! Thin wrapper over the hosting REST API covering exactly what ticking
//! needs: the authenticated user, team-managed repositories, file contents
//! with their blob identifiers, forks, branch comparison, and the
//! authenticated content PUT. Constructed once and passed to every
//! component needing hosting access.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::patch::ContentUpdate;
use crate::{Error, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// The authenticated user
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
}

/// Repository owner
#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// A team the user belongs to
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: u64,
    pub name: String,
    pub repos_count: u64,
}

/// A repository or fork
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub default_branch: String,
}

/// A file fetched from a repository, with its blob identifier
#[derive(Debug, Deserialize)]
pub struct ContentFile {
    pub content: String,
    #[serde(default)]
    pub encoding: String,
    pub sha: String,
}

impl ContentFile {
    /// Decode the base64 body into text.
    pub fn decoded(&self) -> Result<String> {
        if !self.encoding.is_empty() && self.encoding != "base64" {
            return Err(Error::Api(format!(
                "unexpected content encoding: {}",
                self.encoding
            )));
        }
        // The API wraps base64 bodies in newlines.
        let compact: String = self.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| Error::Api(format!("undecodable file content: {e}")))?;
        String::from_utf8(bytes).map_err(|e| Error::Api(format!("non-UTF-8 file content: {e}")))
    }
}

/// Ahead/behind counts between two branch references
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Comparison {
    pub ahead_by: u64,
    pub behind_by: u64,
}

/// GitHub API client
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    credential: String,
    username: Option<String>,
}

impl GitHubClient {
    /// Create a client from a password or OAuth token, plus the username
    /// when authenticating with a password.
    pub fn new(credential: String, username: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feedstock-tick/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            credential,
            username,
        })
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, Some(&self.credential)),
            None => request.bearer_auth(&self.credential),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", GITHUB_API_BASE, path);
        let response = self
            .authorize(self.client.get(&url))
            .headers(Self::headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("GET {} returned {}", path, status)));
        }
        response.json().await.map_err(Error::Http)
    }

    /// Resolve the authenticated user. Doubles as the startup
    /// authentication check: a rejection here is fatal to the run.
    pub async fn authenticated_user(&self) -> Result<User> {
        let url = format!("{}/user", GITHUB_API_BASE);
        let response = self
            .authorize(self.client.get(&url))
            .headers(Self::headers())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("credential rejected ({})", status)));
        }
        if !status.is_success() {
            return Err(Error::Auth(format!("GET /user returned {}", status)));
        }
        response.json().await.map_err(Error::Http)
    }

    /// Teams the authenticated user belongs to.
    pub async fn user_teams(&self) -> Result<Vec<Team>> {
        self.get_json("/user/teams?per_page=100").await
    }

    /// Repositories managed by a team.
    pub async fn team_repos(&self, team_id: u64) -> Result<Vec<Repository>> {
        self.get_json(&format!("/teams/{}/repos?per_page=100", team_id))
            .await
    }

    /// Fetch a file's content and blob identifier at `path` in `repo`.
    pub async fn file_contents(&self, repo_full_name: &str, path: &str) -> Result<ContentFile> {
        self.get_json(&format!("/repos/{}/contents/{}", repo_full_name, path))
            .await
    }

    /// Existing forks of a repository.
    pub async fn list_forks(&self, repo_full_name: &str) -> Result<Vec<Repository>> {
        self.get_json(&format!("/repos/{}/forks?per_page=100", repo_full_name))
            .await
    }

    /// Fork a repository into the authenticated user's account.
    pub async fn create_fork(&self, repo_full_name: &str) -> Result<Repository> {
        let url = format!("{}/repos/{}/forks", GITHUB_API_BASE, repo_full_name);
        let response = self
            .authorize(self.client.post(&url))
            .headers(Self::headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ForkSyncFailed(format!(
                "fork of {} returned {}",
                repo_full_name, status
            )));
        }
        response.json().await.map_err(Error::Http)
    }

    /// Delete a repository (used only on stale forks owned by the user).
    pub async fn delete_repo(&self, repo_full_name: &str) -> Result<()> {
        let url = format!("{}/repos/{}", GITHUB_API_BASE, repo_full_name);
        let response = self
            .authorize(self.client.delete(&url))
            .headers(Self::headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ForkSyncFailed(format!(
                "delete of {} returned {}",
                repo_full_name, status
            )));
        }
        Ok(())
    }

    /// Compare two branch references of `repo` (`base...head`); the counts
    /// describe `head` relative to `base`.
    pub async fn compare(
        &self,
        repo_full_name: &str,
        base: &str,
        head: &str,
    ) -> Result<Comparison> {
        self.get_json(&format!(
            "/repos/{}/compare/{}...{}",
            repo_full_name, base, head
        ))
        .await
    }

    /// Commit new file content against the blob identifier carried by the
    /// payload. A stale identifier makes the remote reject the write,
    /// which surfaces as [`Error::PushRejected`] — the caller records the
    /// update as failed and never retries.
    pub async fn put_contents(
        &self,
        repo_full_name: &str,
        path: &str,
        update: &ContentUpdate,
    ) -> Result<()> {
        let url = format!("{}/repos/{}/contents/{}", GITHUB_API_BASE, repo_full_name, path);
        let response = self
            .authorize(self.client.put(&url))
            .headers(Self::headers())
            .json(update)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::PushRejected(format!(
                "PUT {}/{} returned {}: {}",
                repo_full_name, path, status, body
            )));
        }
        Ok(())
    }
}
