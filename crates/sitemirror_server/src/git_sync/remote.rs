//! Strategy B: build a commit through the hosting provider's git data API.

use reqwest::{RequestBuilder, header};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use sitemirror_core::SnapshotArtifact;
use tracing::debug;

use super::SyncError;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Everything one API publish needs.
pub struct PublishRequest<'a> {
    /// `owner/repo`
    pub repository: &'a str,
    pub branch: &'a str,
    /// Directory inside the repository the artifacts land in.
    pub path_prefix: &'a str,
    pub message: &'a str,
    pub token: &'a str,
    pub artifacts: &'a [SnapshotArtifact],
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Deserialize)]
struct CommitResponse {
    tree: ShaResponse,
}

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Serialize)]
struct CreateBlob<'a> {
    content: &'a str,
    encoding: &'static str,
}

#[derive(Serialize)]
struct TreeEntry {
    path: String,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: String,
}

#[derive(Serialize)]
struct CreateTree<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntry>,
}

#[derive(Serialize)]
struct CreateCommit<'a> {
    message: &'a str,
    tree: &'a str,
    parents: [&'a str; 1],
}

#[derive(Serialize)]
struct UpdateRef<'a> {
    sha: &'a str,
    force: bool,
}

/// Client for the git data endpoints (refs, commits, blobs, trees).
pub struct RemoteApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Commit every artifact on top of the branch head and move the branch.
    ///
    /// Returns the new commit SHA. The ref update is not forced, so a branch
    /// that moved in the meantime fails with the API's status.
    pub async fn publish(&self, request: &PublishRequest<'_>) -> Result<String, SyncError> {
        let repo = format!("{}/repos/{}", self.base_url, request.repository);

        let head: RefResponse = self
            .send(
                "get ref",
                request.token,
                self.client
                    .get(format!("{}/git/ref/heads/{}", repo, request.branch)),
            )
            .await?;
        let base_commit = head.object.sha;

        let commit: CommitResponse = self
            .send(
                "get commit",
                request.token,
                self.client
                    .get(format!("{}/git/commits/{}", repo, base_commit)),
            )
            .await?;
        let base_tree = commit.tree.sha;

        let mut entries = Vec::with_capacity(request.artifacts.len());
        for artifact in request.artifacts {
            let blob: ShaResponse = self
                .send(
                    "create blob",
                    request.token,
                    self.client
                        .post(format!("{}/git/blobs", repo))
                        .json(&CreateBlob {
                            content: &artifact.content,
                            encoding: "utf-8",
                        }),
                )
                .await?;
            entries.push(TreeEntry {
                path: artifact_path(request.path_prefix, &artifact.name),
                mode: "100644",
                kind: "blob",
                sha: blob.sha,
            });
        }

        let tree: ShaResponse = self
            .send(
                "create tree",
                request.token,
                self.client.post(format!("{}/git/trees", repo)).json(&CreateTree {
                    base_tree: &base_tree,
                    tree: entries,
                }),
            )
            .await?;

        let created: ShaResponse = self
            .send(
                "create commit",
                request.token,
                self.client
                    .post(format!("{}/git/commits", repo))
                    .json(&CreateCommit {
                        message: request.message,
                        tree: &tree.sha,
                        parents: [base_commit.as_str()],
                    }),
            )
            .await?;

        let _: IgnoredAny = self
            .send(
                "update ref",
                request.token,
                self.client
                    .patch(format!("{}/git/refs/heads/{}", repo, request.branch))
                    .json(&UpdateRef {
                        sha: &created.sha,
                        force: false,
                    }),
            )
            .await?;

        debug!(
            "Moved {}:{} from {} to {}",
            request.repository, request.branch, base_commit, created.sha
        );
        Ok(created.sha)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        step: &'static str,
        token: &str,
        request: RequestBuilder,
    ) -> Result<T, SyncError> {
        let resp = request
            .bearer_auth(token)
            .header(header::ACCEPT, ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION)
            .header(
                header::USER_AGENT,
                concat!("sitemirror/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                step,
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

fn artifact_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path("content-snapshot", "meta.json"),
            "content-snapshot/meta.json"
        );
        assert_eq!(artifact_path("/data/", "meta.json"), "data/meta.json");
        assert_eq!(artifact_path("", "meta.json"), "meta.json");
    }
}
