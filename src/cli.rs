use anyhow::{bail, Context, Result};

use crate::body::{editable_template, IssueMetadata};
use crate::config::AppConfig;
use crate::git::GitCheckout;
use crate::github::{session, workflow, GitHubClient, RepoRef};
use crate::model::item::{FieldMap, ItemKind, NormalizedItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Items { project: String, json: bool },
    Branch { repo: RepoRef, number: u64 },
    Link { repo: RepoRef, number: u64, branch: String },
    Unlink { repo: RepoRef, number: u64 },
    Start { repo: RepoRef, number: u64 },
    Template { overrides: IssueMetadata },
    Meta { repo: RepoRef, number: u64, overrides: IssueMetadata },
    Help,
}

/// Parses `key=value,key=value`. Only the first `=` splits, so values may
/// contain `=`. Pairs without `=` are skipped.
pub fn parse_fields_option(value: &str) -> FieldMap {
    value
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn parse_list_option(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_repo(value: Option<&String>) -> Result<RepoRef> {
    let value = value.context("Missing repository (owner/repo)")?;
    Ok(value.parse()?)
}

fn parse_number(value: Option<&String>) -> Result<u64> {
    let value = value.context("Missing issue number")?;
    value
        .trim_start_matches('#')
        .parse()
        .with_context(|| format!("Invalid issue number '{value}'"))
}

/// `--labels`, `--assignees`, `--type` and `--fields` flags.
fn parse_metadata_flags(args: &[String]) -> Result<IssueMetadata> {
    let mut meta = IssueMetadata::default();
    let mut i = 0;

    while i < args.len() {
        let flag = args[i].as_str();
        let Some(value) = args.get(i + 1) else {
            bail!("Missing value for {flag}");
        };
        match flag {
            "-l" | "--labels" => meta.labels = parse_list_option(value),
            "-a" | "--assignees" => meta.assignees = parse_list_option(value),
            "-t" | "--type" => meta.issue_type = Some(value.trim().to_string()),
            "-f" | "--fields" => {
                for (k, v) in parse_fields_option(value).iter() {
                    meta.fields.insert(k, v);
                }
            }
            other => bail!("Unknown option '{other}'"),
        }
        i += 2;
    }

    Ok(meta)
}

pub fn parse_args(args: &[String]) -> Result<Command> {
    let Some(name) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    let command = match name.as_str() {
        "items" => {
            let json = rest.iter().any(|a| a == "--json");
            let project = rest
                .iter()
                .find(|a| !a.starts_with("--"))
                .context("Usage: ghp items <project> [--json]")?;
            Command::Items {
                project: project.clone(),
                json,
            }
        }
        "branch" => Command::Branch {
            repo: parse_repo(rest.first())?,
            number: parse_number(rest.get(1))?,
        },
        "link" => Command::Link {
            repo: parse_repo(rest.first())?,
            number: parse_number(rest.get(1))?,
            branch: rest
                .get(2)
                .filter(|b| !b.trim().is_empty())
                .context("Missing branch name")?
                .trim()
                .to_string(),
        },
        "unlink" => Command::Unlink {
            repo: parse_repo(rest.first())?,
            number: parse_number(rest.get(1))?,
        },
        "start" => Command::Start {
            repo: parse_repo(rest.first())?,
            number: parse_number(rest.get(1))?,
        },
        "template" => Command::Template {
            overrides: parse_metadata_flags(rest)?,
        },
        "meta" => Command::Meta {
            repo: parse_repo(rest.first())?,
            number: parse_number(rest.get(1))?,
            overrides: parse_metadata_flags(rest.get(2..).unwrap_or_default())?,
        },
        "help" | "-h" | "--help" => Command::Help,
        other => bail!("Unknown command '{other}'. Run `ghp help` for usage."),
    };

    Ok(command)
}

pub fn format_item_line(item: &NormalizedItem) -> String {
    let mut line = format!("[{}]", item.status.as_deref().unwrap_or("No status"));
    if let Some(number) = item.number {
        line.push_str(&format!(" #{number}"));
    }
    if item.kind != ItemKind::Issue {
        line.push_str(&format!(" <{}>", item.kind));
    }
    line.push_str(&format!(" {}", item.title));
    if let Some(state) = item.state {
        line.push_str(&format!(" ({state})"));
    }
    if let Some(repo) = &item.repository {
        line.push_str(&format!(" {repo}"));
    }
    for login in &item.assignees {
        line.push_str(&format!(" @{login}"));
    }
    line
}

pub async fn run(command: Command, config: &AppConfig) -> Result<()> {
    if let Command::Help = command {
        print_help();
        return Ok(());
    }
    if let Command::Template { overrides } = &command {
        print!("{}", editable_template(Some(overrides), ""));
        return Ok(());
    }

    let session = session::establish(config).await;
    let client = GitHubClient::new(config.api_url.clone(), session);

    match command {
        Command::Items { project, json } => {
            let project_id = config.resolve_project(&project);
            let (project, items) = workflow::load_board(&client, project_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("{} ({} items)", project.title, items.len());
                for item in &items {
                    println!("  {}", format_item_line(item));
                }
            }
        }
        Command::Branch { repo, number } => {
            if let Some(branch) = workflow::linked_branch(&client, &repo, number).await? {
                println!("{branch}");
            }
        }
        Command::Link { repo, number, branch } => {
            workflow::link_branch(&client, &repo, number, &branch).await?;
            println!("Linked {repo}#{number} to {branch}");
        }
        Command::Unlink { repo, number } => {
            if workflow::unlink_branch(&client, &repo, number).await? {
                println!("Unlinked {repo}#{number}");
            } else {
                println!("{repo}#{number} has no linked branch");
            }
        }
        Command::Start { repo, number } => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let git = GitCheckout::new(cwd);
            let branch = workflow::start_work(
                &client,
                &git,
                &repo,
                number,
                config.branch_prefix.as_deref(),
            )
            .await?;
            println!("On branch {branch} for {repo}#{number}");
        }
        Command::Meta {
            repo,
            number,
            overrides,
        } => {
            let merged = workflow::apply_metadata(
                &client,
                &repo,
                number,
                &overrides,
                config.empty_override,
            )
            .await?;
            print!("{}", editable_template(Some(&merged), ""));
        }
        Command::Template { .. } | Command::Help => {}
    }

    Ok(())
}

pub fn print_help() {
    println!("ghp - GitHub Projects helper\n");
    println!("USAGE:");
    println!("  ghp items <project> [--json]          List project items ordered by status");
    println!("  ghp branch <owner/repo> <number>      Print the branch linked to an issue");
    println!("  ghp link <owner/repo> <number> <br>   Link a branch to an issue");
    println!("  ghp unlink <owner/repo> <number>      Remove the branch link");
    println!("  ghp start <owner/repo> <number>       Check out a branch for an issue and link it");
    println!("  ghp template [options]                Print an issue template with frontmatter");
    println!("  ghp meta <owner/repo> <number> [opts] Merge options into the issue's frontmatter");
    println!();
    println!("METADATA OPTIONS:");
    println!("  -l, --labels <a,b>       Labels");
    println!("  -a, --assignees <x,y>    Assignees");
    println!("  -t, --type <name>        Issue type");
    println!("  -f, --fields <k=v,...>   Project field values");
    println!();
    println!("Token: config file, GITHUB_TOKEN, GH_TOKEN, or `gh auth token`.");
    println!("Logging: GHP_LOG=debug");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_field_pairs() {
        let fields = parse_fields_option("priority=High,size=xs");
        let pairs: Vec<_> = fields.iter().collect();
        assert_eq!(pairs, vec![("priority", "High"), ("size", "xs")]);
    }

    #[test]
    fn field_value_keeps_extra_equals() {
        let fields = parse_fields_option("priority=High=VeryHigh");
        let pairs: Vec<_> = fields.iter().collect();
        assert_eq!(pairs, vec![("priority", "High=VeryHigh")]);
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let fields = parse_fields_option("garbage,size=M,,=orphan");
        let pairs: Vec<_> = fields.iter().collect();
        assert_eq!(pairs, vec![("size", "M")]);
    }

    #[test]
    fn no_args_is_help() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn parses_link_command() {
        let cmd = parse_args(&args(&["link", "acme/web", "#12", "feature/x"])).unwrap();
        assert_eq!(
            cmd,
            Command::Link {
                repo: "acme/web".parse().unwrap(),
                number: 12,
                branch: "feature/x".into(),
            }
        );
    }

    #[test]
    fn parses_items_with_json_flag() {
        let cmd = parse_args(&args(&["items", "--json", "board"])).unwrap();
        assert_eq!(
            cmd,
            Command::Items {
                project: "board".into(),
                json: true
            }
        );
    }

    #[test]
    fn parses_meta_flags() {
        let cmd = parse_args(&args(&[
            "meta", "acme/web", "3", "--labels", "bug, ui", "-t", "Bug", "--fields", "Priority=High",
        ]))
        .unwrap();
        let Command::Meta { overrides, .. } = cmd else {
            panic!("expected meta command");
        };
        assert_eq!(overrides.labels, vec!["bug", "ui"]);
        assert_eq!(overrides.issue_type.as_deref(), Some("Bug"));
        assert_eq!(overrides.fields.get("Priority"), Some("High"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(&args(&["link", "acme", "1", "b"])).is_err());
        assert!(parse_args(&args(&["link", "acme/web", "abc", "b"])).is_err());
        assert!(parse_args(&args(&["link", "acme/web", "1"])).is_err());
        assert!(parse_args(&args(&["template", "--labels"])).is_err());
        assert!(parse_args(&args(&["template", "--bogus", "x"])).is_err());
        let err = parse_args(&args(&["frobnicate"])).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn item_line_shows_key_details() {
        let item = NormalizedItem {
            id: "PVTI_1".into(),
            title: "Fix login".into(),
            number: Some(12),
            kind: ItemKind::Issue,
            issue_type: None,
            status: Some("Todo".into()),
            status_index: 0,
            state: Some(crate::model::item::ItemState::Open),
            assignees: vec!["alice".into()],
            labels: vec![],
            repository: Some("web".into()),
            url: None,
            project_id: "PVT_1".into(),
            project_title: "Roadmap".into(),
            fields: FieldMap::new(),
        };
        assert_eq!(format_item_line(&item), "[Todo] #12 Fix login (open) web @alice");
    }
}
