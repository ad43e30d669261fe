use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::web_browser::AGENT;
use super::{ToolHandler, ToolOutput};
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

const GITHUB_API: &str = "https://api.github.com";
const MAX_PAGES: usize = 30;

lazy_static! {
    static ref GITHUB_URL: Regex =
        Regex::new(r"https://github\.com/([^/]+)/([^/]+)/(pull|commit)/([a-fA-F0-9]+)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Pull,
    Commit,
}

impl TargetKind {
    fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Pull => "pull",
            TargetKind::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTarget {
    pub owner: String,
    pub repo: String,
    pub kind: TargetKind,
    pub identifier: String,
}

/// Parse a pull request or commit URL
pub fn parse_github_url(url: &str) -> Option<ReviewTarget> {
    let captures = GITHUB_URL.captures(url)?;
    Some(ReviewTarget {
        owner: captures[1].to_string(),
        repo: captures[2].to_string(),
        kind: if &captures[3] == "pull" {
            TargetKind::Pull
        } else {
            TargetKind::Commit
        },
        identifier: captures[4].to_string(),
    })
}

#[derive(Error, Debug)]
enum GitHubError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded. Resets at {0}")]
    RateLimited(String),

    #[error("GitHub API error: {0}")]
    Api(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    body: Option<String>,
    user: User,
    mergeable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PullRequestFile {
    filename: String,
    status: String,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewComment {
    user: User,
    body: String,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    sha: String,
    commit: CommitInfo,
    #[serde(default)]
    files: Vec<CommitFile>,
    stats: CommitStats,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    author: CommitAuthor,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: String,
    email: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct CommitFile {
    filename: String,
    status: String,
    additions: u64,
    deletions: u64,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitStats {
    additions: u64,
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct CombinedStatus {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Reviews pull requests and commits through the GitHub REST API.
pub struct GitHubReview {
    tool: Tool,
    client: Client,
    token: Option<String>,
    api_base: String,
}

impl GitHubReview {
    pub fn new(token: Option<String>) -> Self {
        Self {
            tool: Tool::new(
                "github_review",
                "Useful for reviewing GitHub Pull Requests or Commits and providing detailed analysis",
                json!({
                    "type": "object",
                    "properties": {
                        "url": {"type": "string", "description": "GitHub Pull Request or Commit URL to review"}
                    },
                    "required": ["url"]
                }),
            ),
            client: Client::new(),
            token: token.filter(|t| !t.is_empty()),
            api_base: GITHUB_API.to_string(),
        }
    }

    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn request(&self, url: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, AGENT)
            .bearer_auth(token)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.api_base, path);
        let response = self.request(&url, token).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v == "0")
        {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|at| at.to_rfc2822())
                .unwrap_or_else(|| "an unknown time".to_string());
            return Err(GitHubError::RateLimited(reset));
        }

        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            if status == StatusCode::NOT_FOUND {
                return Err(GitHubError::NotFound(message));
            }
            return Err(GitHubError::Api(message));
        }

        Ok(response.json().await?)
    }

    /// Collect a paginated listing. Stops at the first failed or empty page.
    async fn get_all<T: DeserializeOwned>(&self, path: &str, token: &str) -> Vec<T> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}{}?page={}&per_page=100", self.api_base, path, page);
            let batch: Vec<T> = match self.request(&url, token).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json().await {
                        Ok(batch) => batch,
                        Err(_) => break,
                    }
                }
                _ => break,
            };
            if batch.is_empty() {
                break;
            }
            items.extend(batch);
        }
        items
    }

    async fn review_pull(&self, target: &ReviewTarget, token: &str) -> Result<String, GitHubError> {
        let base = format!("/repos/{}/{}", target.owner, target.repo);
        let pr: PullRequest = self
            .get(&format!("{}/pulls/{}", base, target.identifier), token)
            .await?;

        let files_path = format!("{}/pulls/{}/files", base, target.identifier);
        let comments_path = format!("{}/pulls/{}/comments", base, target.identifier);
        let (files, comments) = tokio::join!(
            self.get_all::<PullRequestFile>(&files_path, token),
            self.get_all::<ReviewComment>(&comments_path, token),
        );

        let labels: Vec<Label> = self
            .get(&format!("{}/issues/{}/labels", base, target.identifier), token)
            .await?;
        let labels = labels
            .into_iter()
            .map(|label| label.name)
            .collect::<Vec<_>>()
            .join(", ");
        let merge_status = if pr.mergeable == Some(true) {
            "Mergeable"
        } else {
            "Has conflicts"
        };

        Ok(format!(
            "{}\n\nMerge Status: {}\nLabels: {}",
            format_pull_request(&pr, &files, &comments),
            merge_status,
            labels
        ))
    }

    async fn review_commit(&self, target: &ReviewTarget, token: &str) -> Result<String, GitHubError> {
        let base = format!("/repos/{}/{}/commits/{}", target.owner, target.repo, target.identifier);
        let commit: CommitDetail = self.get(&base, token).await?;
        let status: CombinedStatus = self.get(&format!("{}/status", base), token).await?;
        Ok(format!(
            "{}\n\nCI Status: {}",
            format_commit(&commit),
            status.state
        ))
    }
}

#[async_trait]
impl ToolHandler for GitHubReview {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let url = params.get("url").and_then(Value::as_str).unwrap_or_default();
        info!(url, "reviewing github url");

        let Some(token) = self.token.as_deref() else {
            return Err(ToolError::Execution(
                "GitHub token is required. Please set GITHUB_TOKEN in your environment variables."
                    .to_string(),
            ));
        };
        let target = parse_github_url(url).ok_or_else(|| {
            ToolError::Execution("Invalid GitHub URL. Must be a Pull Request or Commit URL.".to_string())
        })?;

        let result = match target.kind {
            TargetKind::Pull => self.review_pull(&target, token).await,
            TargetKind::Commit => self.review_commit(&target, token).await,
        };

        let kind = target.kind.as_str();
        let text = match result {
            Ok(review) => review,
            Err(GitHubError::NotFound(_)) => format!(
                "The specified {} could not be found. Please verify the URL and ensure you have access to the repository.",
                kind
            ),
            Err(e) => {
                warn!(error = %e, "github review failed");
                format!("Error reviewing GitHub {}: {}", kind, e)
            }
        };
        Ok(ToolOutput::Text(text))
    }
}

fn patch_block(patch: Option<&str>) -> String {
    match patch {
        Some(patch) => format!("```diff\n{}\n```", patch),
        None => "*Binary file or changes too large*".to_string(),
    }
}

fn format_pull_request(pr: &PullRequest, files: &[PullRequestFile], comments: &[ReviewComment]) -> String {
    let mut out = String::from("\n## Pull Request Details\n\n");
    let description = pr
        .body
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .unwrap_or("No description provided");
    let _ = writeln!(out, "Title: {}", pr.title);
    let _ = writeln!(out, "Author: {}", pr.user.login);
    let _ = writeln!(out, "Description: {}", description);

    out.push_str("\n## Files Changed\n\n");
    let files = files
        .iter()
        .map(|file| {
            format!(
                "\n### {}\nStatus: {}\n\n{}\n",
                file.filename,
                file.status,
                patch_block(file.patch.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&files);

    out.push_str("\n\n## Review Comments\n\n");
    if comments.is_empty() {
        out.push_str("*No review comments yet*");
    } else {
        let comments = comments
            .iter()
            .map(|comment| format!("\n**{}**: {}\n", comment.user.login, comment.body))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&comments);
    }
    out.push('\n');
    out
}

fn format_commit(commit: &CommitDetail) -> String {
    let author = &commit.commit.author;
    let mut out = String::from("\n## Commit Details\n\n");
    let _ = writeln!(out, "- **SHA**: `{}`", commit.sha);
    let _ = writeln!(out, "- **Author**: {} ({})", author.name, author.email);
    let _ = writeln!(out, "- **Date**: {}", author.date);
    let _ = writeln!(out, "- **Message**: {}", commit.commit.message);

    out.push_str("\n## Changes Overview\n");
    let _ = writeln!(out, "- Total files changed: {}", commit.files.len());
    let _ = writeln!(out, "- Additions: +{}", commit.stats.additions);
    let _ = writeln!(out, "- Deletions: -{}", commit.stats.deletions);

    out.push_str("\n## Detailed Changes\n");
    let files = commit
        .files
        .iter()
        .map(|file| {
            format!(
                "\n### {}\n- Status: {}\n- Changes: +{} -{}\n\n{}\n",
                file.filename,
                file.status,
                file.additions,
                file.deletions,
                patch_block(file.patch.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&files);
    out.push('\n');
    out
}
