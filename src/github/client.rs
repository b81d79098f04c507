use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::error::{classify, GitHubError, GraphQlError, ResponseMeta};
use super::{ProjectApi, ProjectItems, RepoRef, Session};
use crate::model::raw::{RawIssueDetails, RawItemRecord, StatusOption};
use crate::project::ProjectRef;

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

const ITEMS_QUERY: &str = r#"query($id: ID!, $after: String) {
  node(id: $id) {
    ... on ProjectV2 {
      id title
      items(first: 100, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValues(first: 20) {
            nodes {
              __typename
              ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldTextValue { text field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldNumberValue { number field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldDateValue { date field { ... on ProjectV2FieldCommon { name } } }
              ... on ProjectV2ItemFieldIterationValue { title field { ... on ProjectV2FieldCommon { name } } }
            }
          }
          content {
            __typename
            ... on Issue {
              title number url state
              assignees(first: 10) { nodes { login } }
              labels(first: 10) { nodes { name color } }
              repository { name }
              issueType { name }
            }
            ... on PullRequest {
              title number url state merged
              assignees(first: 10) { nodes { login } }
              labels(first: 10) { nodes { name color } }
              repository { name }
            }
            ... on DraftIssue {
              title
              assignees(first: 10) { nodes { login } }
            }
          }
        }
      }
    }
  }
}"#;

const STATUS_QUERY: &str = r#"query($id: ID!) {
  node(id: $id) {
    ... on ProjectV2 {
      field(name: "Status") {
        ... on ProjectV2SingleSelectField { id options { id name } }
      }
    }
  }
}"#;

const ISSUE_QUERY: &str = r#"query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) { id number title body }
  }
}"#;

const UPDATE_BODY_MUTATION: &str = r#"mutation($id: ID!, $body: String!) {
  updateIssue(input: { id: $id, body: $body }) { issue { id } }
}"#;

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
    /// REST-style error body, e.g. `{"message": "Bad credentials"}`.
    message: Option<String>,
}

#[derive(Deserialize)]
struct NodeData<T> {
    node: Option<T>,
}

#[derive(Deserialize)]
struct ProjectItemsNode {
    id: String,
    title: String,
    items: ItemsPage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsPage {
    page_info: PageInfo,
    #[serde(default, deserialize_with = "crate::model::raw::lenient_records")]
    nodes: Vec<RawItemRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
struct StatusNode {
    field: Option<StatusFieldNode>,
}

#[derive(Deserialize)]
struct StatusFieldNode {
    options: Option<Vec<StatusOption>>,
}

#[derive(Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryIssue>,
}

#[derive(Deserialize)]
struct RepositoryIssue {
    issue: Option<RawIssueDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    update_issue: Option<Value>,
}

/// Falls back to `fallback` for failures that don't need the caller's attention.
fn degrade<T>(result: Result<T, GitHubError>, fallback: T, what: &str) -> Result<T, GitHubError> {
    match result {
        Err(e) if e.is_degradable() => {
            warn!(error = %e, "{what} failed, continuing with empty result");
            Ok(fallback)
        }
        other => other,
    }
}

pub struct GitHubClient {
    api_url: String,
    session: Option<Session>,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, session: Option<Session>) -> Self {
        Self {
            api_url: api_url.into(),
            session,
            client: reqwest::Client::new(),
        }
    }

    fn session(&self) -> Result<&Session, GitHubError> {
        self.session.as_ref().ok_or(GitHubError::NotAuthenticated)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, GitHubError> {
        let session = self.session()?;
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(session.token())
            .header("User-Agent", concat!("ghp/", env!("CARGO_PKG_VERSION")))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| GitHubError::Unknown(format!("GitHub API request failed: {e}")))?;

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let meta = ResponseMeta {
            status: resp.status().as_u16(),
            oauth_scopes: header("x-oauth-scopes"),
            sso: header("x-github-sso"),
        };

        let text = resp
            .text()
            .await
            .map_err(|e| GitHubError::Unknown(format!("Failed to read GitHub response: {e}")))?;

        let gql: GqlResponse<T> = match serde_json::from_str(&text) {
            Ok(gql) => gql,
            Err(_) if !(200..300).contains(&meta.status) => return Err(classify(&[], &meta)),
            Err(e) => {
                return Err(GitHubError::Unknown(format!(
                    "Failed to parse GitHub response: {e}"
                )))
            }
        };

        let mut errors = gql.errors;
        if let Some(message) = gql.message {
            errors.push(GraphQlError {
                message,
                kind: None,
            });
        }
        if !errors.is_empty() || !(200..300).contains(&meta.status) {
            return Err(classify(&errors, &meta));
        }

        gql.data
            .ok_or_else(|| GitHubError::Unknown("No data in GitHub response".into()))
    }

    async fn fetch_all_items(&self, project_id: &str) -> Result<ProjectItems, GitHubError> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: NodeData<ProjectItemsNode> = self
                .execute(ITEMS_QUERY, json!({ "id": project_id, "after": after }))
                .await?;
            let node = data
                .node
                .ok_or_else(|| GitHubError::Unknown(format!("Project {project_id} not found")))?;

            items.extend(node.items.nodes);
            debug!(project = project_id, fetched = items.len(), "fetched project items page");

            match (node.items.page_info.has_next_page, node.items.page_info.end_cursor) {
                (true, Some(cursor)) => after = Some(cursor),
                _ => {
                    return Ok(ProjectItems {
                        project: ProjectRef {
                            id: node.id,
                            title: node.title,
                        },
                        items,
                    })
                }
            }
        }
    }

    async fn write_body(&self, repo: &RepoRef, number: u64, body: &str) -> Result<bool, GitHubError> {
        let Some(issue) = self.get_issue_details(repo, number).await? else {
            return Ok(false);
        };
        let data: UpdateData = self
            .execute(UPDATE_BODY_MUTATION, json!({ "id": issue.id, "body": body }))
            .await?;
        Ok(data.update_issue.is_some())
    }
}

#[async_trait]
impl ProjectApi for GitHubClient {
    async fn get_project_items(&self, project_id: &str) -> Result<ProjectItems, GitHubError> {
        let fallback = ProjectItems {
            project: ProjectRef {
                id: project_id.to_string(),
                title: String::new(),
            },
            items: Vec::new(),
        };
        degrade(self.fetch_all_items(project_id).await, fallback, "fetching project items")
    }

    async fn get_status_field(
        &self,
        project_id: &str,
    ) -> Result<Option<Vec<StatusOption>>, GitHubError> {
        let result = self
            .execute::<NodeData<StatusNode>>(STATUS_QUERY, json!({ "id": project_id }))
            .await
            .map(|data| data.node.and_then(|n| n.field).and_then(|f| f.options));
        degrade(result, None, "fetching status field")
    }

    async fn get_issue_details(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<RawIssueDetails>, GitHubError> {
        let result = self
            .execute::<RepositoryData>(
                ISSUE_QUERY,
                json!({ "owner": repo.owner, "name": repo.name, "number": number }),
            )
            .await
            .map(|data| data.repository.and_then(|r| r.issue));
        degrade(result, None, "fetching issue details")
    }

    async fn update_issue_body(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<bool, GitHubError> {
        let updated = degrade(self.write_body(repo, number, body).await, false, "updating issue body")?;
        if updated {
            info!(repo = %repo, number, "updated issue body");
        }
        Ok(updated)
    }
}
