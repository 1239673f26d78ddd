//! GitLab REST v4 adapter.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use roster_storage::UserId;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::{
    AccessLevel, BatchResult, ExpiresAt, FailedItem, Page, ProjectMember, ProjectRef,
    ProjectSummary, RemoteDirectory, RemoteError,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// GitLab caps `per_page` at 100.
pub const MAX_PER_PAGE: u32 = 100;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const TOTAL_HEADER: &str = "x-total";

/// Connection settings for a GitLab instance.
#[derive(Clone)]
pub struct GitLabConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl GitLabConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for GitLabConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ApiNamespace {
    full_path: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiProject {
    id: u64,
    name: String,
    path_with_namespace: String,
    description: Option<String>,
    last_activity_at: String,
    namespace: Option<ApiNamespace>,
}

impl From<ApiProject> for ProjectSummary {
    fn from(p: ApiProject) -> Self {
        let namespace = p
            .namespace
            .and_then(|n| n.full_path.or(n.name))
            .unwrap_or_else(|| {
                p.path_with_namespace
                    .rsplit_once('/')
                    .map(|(ns, _)| ns.to_string())
                    .unwrap_or_else(|| p.path_with_namespace.clone())
            });

        ProjectSummary {
            id: p.id,
            name: p.name,
            namespace,
            path_with_namespace: p.path_with_namespace,
            description: p.description,
            last_activity_at: p.last_activity_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    id: u64,
    username: String,
    name: String,
    avatar_url: Option<String>,
    access_level: i64,
    created_at: Option<String>,
    expires_at: Option<String>,
}

impl From<ApiMember> for ProjectMember {
    fn from(m: ApiMember) -> Self {
        ProjectMember {
            id: UserId(m.id),
            username: m.username,
            name: m.name,
            avatar_url: m.avatar_url,
            access_level: m.access_level,
            created_at: m.created_at,
            expires_at: m.expires_at,
        }
    }
}

/// [`RemoteDirectory`] over the GitLab REST API.
pub struct GitLabClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GitLabClient {
    pub fn new(config: GitLabConfig) -> Result<Self, RemoteError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RemoteError::Client("base URL is empty".into()));
        }
        if config.token.trim().is_empty() {
            return Err(RemoteError::Client("token is empty".into()));
        }

        let http = Client::builder()
            .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: config.token.trim().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    /// Fetch every member of a project, 100 per page, until a short page.
    #[instrument(skip(self))]
    pub async fn list_all_members(
        &self,
        project: &ProjectRef,
    ) -> Result<Vec<ProjectMember>, RemoteError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.list_members(project, page, MAX_PER_PAGE).await?;
            let count = batch.items.len();
            all.extend(batch.items);
            if count < MAX_PER_PAGE as usize {
                break;
            }
            page += 1;
        }

        debug!(count = all.len(), "fetched all project members");
        Ok(all)
    }

    /// Remove one user. A user who is not a member (404) counts as removed.
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        project: &ProjectRef,
        user_id: UserId,
    ) -> Result<(), RemoteError> {
        let url = self.api_url(&format!(
            "/projects/{}/members/{}",
            project.encoded(),
            user_id
        ));

        let resp = self
            .http
            .delete(url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("user is not a member; nothing to remove");
                Ok(())
            }
            _ => Err(api_error(resp).await),
        }
    }
}

async fn api_error(resp: Response) -> RemoteError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    RemoteError::Api { status, body }
}

fn total_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// GitLab omits `X-Total` on very large collections; estimate from what we saw.
fn estimated_total(page: u32, per_page: u32, seen: usize) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page) + seen as u64
}

fn clamp_paging(page: u32, per_page: u32) -> (u32, u32) {
    (page.max(1), per_page.clamp(1, MAX_PER_PAGE))
}

#[async_trait]
impl RemoteDirectory for GitLabClient {
    #[instrument(skip(self))]
    async fn search_projects(
        &self,
        keyword: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProjectSummary>, RemoteError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Page::empty());
        }
        let (page, per_page) = clamp_paging(page, per_page);

        let resp = self
            .http
            .get(self.api_url("/projects"))
            .header(TOKEN_HEADER, &self.token)
            .query(&[
                ("search", keyword),
                ("simple", "true"),
                ("order_by", "last_activity_at"),
                ("sort", "desc"),
            ])
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let total = total_from_headers(resp.headers());
        let projects: Vec<ApiProject> = resp.json().await?;
        let total = total.unwrap_or_else(|| estimated_total(page, per_page, projects.len()));

        debug!(count = projects.len(), total, "project search complete");
        Ok(Page {
            items: projects.into_iter().map(ProjectSummary::from).collect(),
            total,
        })
    }

    #[instrument(skip(self))]
    async fn list_members(
        &self,
        project: &ProjectRef,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProjectMember>, RemoteError> {
        if project.is_unresolved() {
            return Err(RemoteError::InvalidProject(project.to_string()));
        }
        let (page, per_page) = clamp_paging(page, per_page);
        let url = self.api_url(&format!("/projects/{}/members/all", project.encoded()));

        let resp = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let total = total_from_headers(resp.headers());
        let members: Vec<ApiMember> = resp.json().await?;
        let total = total.unwrap_or_else(|| estimated_total(page, per_page, members.len()));

        Ok(Page {
            items: members.into_iter().map(ProjectMember::from).collect(),
            total,
        })
    }

    #[instrument(skip(self))]
    async fn add_member(
        &self,
        project: &ProjectRef,
        user_id: UserId,
        access_level: AccessLevel,
        expires_at: Option<ExpiresAt>,
    ) -> Result<(), RemoteError> {
        if project.is_unresolved() {
            return Err(RemoteError::InvalidProject(project.to_string()));
        }
        let url = self.api_url(&format!("/projects/{}/members", project.encoded()));

        let mut params: Vec<(&str, String)> = vec![
            ("user_id", user_id.to_string()),
            ("access_level", access_level.value().to_string()),
        ];
        if let Some(expires_at) = expires_at {
            params.push(("expires_at", expires_at.to_string()));
        }

        let resp = self
            .http
            .post(url)
            .header(TOKEN_HEADER, &self.token)
            .form(&params)
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(RemoteError::AlreadyMember),
            _ => Err(api_error(resp).await),
        }
    }

    /// GitLab has no bulk endpoint: one DELETE per user, partitioned here.
    /// A transport failure on any user aborts the whole call.
    #[instrument(skip(self, user_ids), fields(count = user_ids.len()))]
    async fn remove_members(
        &self,
        project: &ProjectRef,
        user_ids: &BTreeSet<UserId>,
    ) -> Result<BatchResult, RemoteError> {
        if project.is_unresolved() {
            return Err(RemoteError::InvalidProject(project.to_string()));
        }

        let mut result = BatchResult::default();
        for &user_id in user_ids {
            match self.remove_member(project, user_id).await {
                Ok(()) => {
                    result.success_user_ids.insert(user_id);
                }
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => {
                    warn!(%user_id, error = %e, "member removal rejected");
                    result.failed.push(FailedItem {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            removed = result.success_count(),
            failed = result.failed_count(),
            "bulk member removal complete"
        );
        Ok(result)
    }
}
