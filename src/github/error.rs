use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

static SCOPE_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid scope list regex"));

static SSO_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"url=(\S+)").expect("valid sso url regex"));

/// Failure talking to GitHub, reduced to the cases callers act on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitHubError {
    /// No session was established before a remote call.
    #[error("not authenticated: set GITHUB_TOKEN or run `gh auth login`")]
    NotAuthenticated,

    #[error("token is missing required scopes: {}{}", .required.join(", "), granted_suffix(.granted))]
    InsufficientScope {
        required: Vec<String>,
        granted: Vec<String>,
    },

    #[error("organization requires SSO authorization for this token{}", sso_suffix(.url))]
    SsoRequired { url: Option<String> },

    #[error("token expired or revoked")]
    TokenExpired,

    #[error("GitHub request failed: {0}")]
    Unknown(String),
}

fn granted_suffix(granted: &[String]) -> String {
    if granted.is_empty() {
        String::new()
    } else {
        format!(" (token has: {})", granted.join(", "))
    }
}

fn sso_suffix(url: &Option<String>) -> String {
    url.as_deref().map(|u| format!(": {u}")).unwrap_or_default()
}

impl GitHubError {
    /// Whether a read may fall back to an empty result instead of failing.
    pub fn is_degradable(&self) -> bool {
        matches!(self, GitHubError::Unknown(_))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Transport details that help classify a failed response.
#[derive(Debug, Clone, Default)]
pub struct ResponseMeta {
    pub status: u16,
    /// `X-OAuth-Scopes`
    pub oauth_scopes: Option<String>,
    /// `X-GitHub-SSO`
    pub sso: Option<String>,
}

fn split_scopes(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn scopes_from_message(message: &str) -> (Vec<String>, Vec<String>) {
    let mut lists = SCOPE_LIST_RE
        .captures_iter(message)
        .map(|caps| split_scopes(&caps[1]));
    let required = lists.next().unwrap_or_default();
    let granted = lists.next().unwrap_or_default();
    (required, granted)
}

fn sso_url(header: &str) -> Option<String> {
    SSO_URL_RE.captures(header).map(|caps| caps[1].to_string())
}

/// Maps GraphQL error entries plus response metadata onto [`GitHubError`].
pub fn classify(errors: &[GraphQlError], meta: &ResponseMeta) -> GitHubError {
    if meta.status == 401 || errors.iter().any(|e| e.message.contains("Bad credentials")) {
        return GitHubError::TokenExpired;
    }

    if let Some(err) = errors
        .iter()
        .find(|e| e.kind.as_deref() == Some("INSUFFICIENT_SCOPES"))
    {
        let (required, from_message) = scopes_from_message(&err.message);
        let granted = meta
            .oauth_scopes
            .as_deref()
            .map(split_scopes)
            .unwrap_or(from_message);
        return GitHubError::InsufficientScope { required, granted };
    }

    let saml = errors.iter().any(|e| {
        e.kind.as_deref() == Some("FORBIDDEN")
            && (e.message.contains("SAML") || e.message.contains("SSO"))
    });
    if meta.sso.is_some() || saml {
        return GitHubError::SsoRequired {
            url: meta.sso.as_deref().and_then(sso_url),
        };
    }

    let message = errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", meta.status));
    GitHubError::Unknown(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn err(kind: Option<&str>, message: &str) -> GraphQlError {
        GraphQlError {
            message: message.to_string(),
            kind: kind.map(String::from),
        }
    }

    fn ok_meta() -> ResponseMeta {
        ResponseMeta {
            status: 200,
            ..Default::default()
        }
    }

    #[test]
    fn insufficient_scopes_lists_required_and_granted() {
        let e = err(
            Some("INSUFFICIENT_SCOPES"),
            "Your token has not been granted the required scopes to execute this query. \
             The 'items' field requires one of the following scopes: ['read:project'], \
             but your token has only been granted the: ['repo', 'read:org'] scopes.",
        );
        assert_eq!(
            classify(&[e], &ok_meta()),
            GitHubError::InsufficientScope {
                required: vec!["read:project".into()],
                granted: vec!["repo".into(), "read:org".into()],
            }
        );
    }

    #[test]
    fn granted_scopes_prefer_header() {
        let e = err(Some("INSUFFICIENT_SCOPES"), "requires ['project']");
        let meta = ResponseMeta {
            oauth_scopes: Some("repo, gist".into()),
            ..ok_meta()
        };
        match classify(&[e], &meta) {
            GitHubError::InsufficientScope { required, granted } => {
                assert_eq!(required, vec!["project"]);
                assert_eq!(granted, vec!["repo", "gist"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn sso_header_carries_url() {
        let meta = ResponseMeta {
            sso: Some("required; url=https://github.com/orgs/acme/sso?authorization_request=abc".into()),
            ..ok_meta()
        };
        assert_eq!(
            classify(&[err(Some("FORBIDDEN"), "Resource protected by organization SAML enforcement.")], &meta),
            GitHubError::SsoRequired {
                url: Some("https://github.com/orgs/acme/sso?authorization_request=abc".into())
            }
        );
    }

    #[test]
    fn saml_message_without_header() {
        let e = err(Some("FORBIDDEN"), "Resource protected by organization SAML enforcement.");
        assert_eq!(classify(&[e], &ok_meta()), GitHubError::SsoRequired { url: None });
    }

    #[test]
    fn unauthorized_is_token_expired() {
        let meta = ResponseMeta {
            status: 401,
            ..Default::default()
        };
        assert_eq!(classify(&[], &meta), GitHubError::TokenExpired);
        assert_eq!(
            classify(&[err(None, "Bad credentials")], &ok_meta()),
            GitHubError::TokenExpired
        );
    }

    #[test]
    fn everything_else_is_unknown() {
        let e = err(Some("NOT_FOUND"), "Could not resolve to a node");
        let classified = classify(&[e], &ok_meta());
        assert_eq!(classified, GitHubError::Unknown("Could not resolve to a node".into()));
        assert!(classified.is_degradable());
        assert!(!GitHubError::TokenExpired.is_degradable());
    }

    #[test]
    fn display_mentions_scopes() {
        let e = GitHubError::InsufficientScope {
            required: vec!["project".into(), "repo".into()],
            granted: vec![],
        };
        assert_eq!(e.to_string(), "token is missing required scopes: project, repo");

        let e = GitHubError::InsufficientScope {
            required: vec!["project".into()],
            granted: vec!["repo".into()],
        };
        assert_eq!(
            e.to_string(),
            "token is missing required scopes: project (token has: repo)"
        );
    }
}
