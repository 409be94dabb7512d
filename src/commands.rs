//! Command-line subcommands and their handlers.

use chrono::{DateTime, Duration, Local, Utc};
use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};

use crate::backlog::cached_client::CachedBacklogClient;
use crate::backlog::types::{Comment, User};
use crate::cache::{CacheLayer, KindStats, ResourceKind, TtlPolicy};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Browse projects
  #[command(subcommand, alias = "p")]
  Project(ProjectCommand),
  /// Browse issues
  #[command(subcommand, alias = "i")]
  Issue(IssueCommand),
  /// Show comments of an issue or pull request
  #[command(subcommand, alias = "c")]
  Comment(CommentCommand),
  /// Browse pull requests
  #[command(subcommand, name = "pr", alias = "pullrequest")]
  PullRequest(PullRequestCommand),
  /// Browse Git repositories
  #[command(subcommand, alias = "r")]
  Repository(RepositoryCommand),
  /// Browse wiki pages
  #[command(subcommand, alias = "w")]
  Wiki(WikiCommand),
  /// Show the authenticated user
  Myself,
  /// List issue priorities
  #[command(subcommand)]
  Priority(ListCommand),
  /// List issue statuses
  #[command(subcommand)]
  Status(ListCommand),
  /// List issue types of a project
  #[command(subcommand)]
  IssueType(IssueTypeCommand),
  /// Inspect or clear the local cache
  #[command(subcommand)]
  Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
  List,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
  /// List issues of every project
  List,
  /// Show one issue
  Show { issue_key: String },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
  /// `<ISSUE-KEY>` or `<PROJECT> <REPOSITORY> <NUMBER>`
  Show {
    #[arg(num_args = 1..=3, required = true)]
    target: Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum PullRequestCommand {
  List { project_key: String, repository: String },
}

#[derive(Subcommand, Debug)]
pub enum RepositoryCommand {
  /// List repositories of every project
  List,
}

#[derive(Subcommand, Debug)]
pub enum WikiCommand {
  /// List wiki pages of every project
  List,
  /// Show one wiki page
  Show { wiki_id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
  List,
}

#[derive(Subcommand, Debug)]
pub enum IssueTypeCommand {
  List { project_key: String },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Show record counts and freshness per resource kind
  Status,
  /// Remove cached data for one kind, or everything
  Clear { kind: Option<ResourceKind> },
}

/// Run a command that talks to the API through the cache.
pub async fn run(command: Command, client: &CachedBacklogClient, config: &Config) -> Result<()> {
  match command {
    Command::Project(ProjectCommand::List) => list_projects(client).await,
    Command::Issue(IssueCommand::List) => list_issues(client).await,
    Command::Issue(IssueCommand::Show { issue_key }) => {
      show_issue(client, config, &issue_key).await
    }
    Command::Comment(CommentCommand::Show { target }) => show_comments(client, &target).await,
    Command::PullRequest(PullRequestCommand::List {
      project_key,
      repository,
    }) => list_pull_requests(client, &project_key, &repository).await,
    Command::Repository(RepositoryCommand::List) => list_repositories(client).await,
    Command::Wiki(WikiCommand::List) => list_wikis(client).await,
    Command::Wiki(WikiCommand::Show { wiki_id }) => show_wiki(client, config, wiki_id).await,
    Command::Myself => {
      let me = client.myself().await?;
      println!("{} ({})", me.name, me.user_id.as_deref().unwrap_or("-"));
      if let Some(mail) = &me.mail_address {
        println!("{}", mail);
      }
      Ok(())
    }
    Command::Priority(ListCommand::List) => {
      for priority in client.priorities().await? {
        println!("{}. {}", priority.id, priority.name);
      }
      Ok(())
    }
    Command::Status(ListCommand::List) => {
      for status in client.statuses().await? {
        println!("{}. {}", status.id, status.name);
      }
      Ok(())
    }
    Command::IssueType(IssueTypeCommand::List { project_key }) => {
      let project = client.project_by_key(&project_key).await?;
      for issue_type in client.issue_types(project.id).await? {
        println!("{}. {}", issue_type.id, issue_type.name);
      }
      Ok(())
    }
    Command::Cache(command) => run_cache(command, config),
  }
}

/// Run a cache maintenance command. Needs no API access.
pub fn run_cache(command: CacheCommand, config: &Config) -> Result<()> {
  let cache = CacheLayer::new(config.cache_paths()?, config.ttl_policy()?);
  let store = cache.store();

  match command {
    CacheCommand::Status => {
      println!("{}", store.paths().root().display());
      for kind in ResourceKind::ALL {
        println!("{}", format_stats(&store.stats(kind)?, cache.policy()));
      }
    }
    CacheCommand::Clear { kind: Some(kind) } => {
      store.clear(kind)?;
      println!("Cleared {}", kind);
    }
    CacheCommand::Clear { kind: None } => {
      store.clear_all()?;
      println!("Cleared {}", store.paths().root().display());
    }
  }

  Ok(())
}

async fn list_projects(client: &CachedBacklogClient) -> Result<()> {
  for (i, project) in client.projects().await?.iter().enumerate() {
    println!("{}. [{}] {}", i + 1, project.project_key, project.name);
  }
  Ok(())
}

async fn list_issues(client: &CachedBacklogClient) -> Result<()> {
  for project in client.projects().await? {
    let issues = client.issues(project.id).await?;

    println!("- [{}] {}", project.project_key, project.name);
    for issue in issues {
      println!(
        "  - [{}] ({}) {} (by {})",
        issue.issue_key,
        issue.status.as_ref().map_or("-", |s| s.name.as_str()),
        issue.summary,
        user_name(issue.created_user.as_ref()),
      );
    }
  }
  Ok(())
}

async fn show_issue(client: &CachedBacklogClient, config: &Config, issue_key: &str) -> Result<()> {
  let issue = client.issue_by_key(issue_key).await?;
  let project = client.project(issue.project_id).await?;
  let parent = match issue.parent_issue_id.filter(|id| *id != 0) {
    Some(parent_id) => Some(client.issue(parent_id).await?),
    None => None,
  };

  println!("---");
  println!("summary: {}", issue.summary);
  println!("project: {}", project.project_key);
  if let Some(parent) = parent {
    println!("parent: {}", parent.issue_key);
  }
  println!(
    "type: {}",
    issue.issue_type.as_ref().map_or("", |t| t.name.as_str())
  );
  println!(
    "status: {}",
    issue.status.as_ref().map_or("", |s| s.name.as_str())
  );
  println!(
    "priority: {}",
    issue.priority.as_ref().map_or("", |p| p.name.as_str())
  );
  println!("assignee: {}", user_name(issue.assignee.as_ref()));
  println!("created: {}", user_name(issue.created_user.as_ref()));
  println!("start: {}", format_date(issue.start_date));
  println!("due: {}", format_date(issue.due_date));
  println!("estimated: {}", format_hours(issue.estimated_hours));
  println!("actual: {}", format_hours(issue.actual_hours));
  println!("url: {}", config.web_url(&format!("view/{}", issue.issue_key))?);
  println!("---");
  println!("{}", issue.description.as_deref().unwrap_or_default());

  Ok(())
}

async fn show_comments(client: &CachedBacklogClient, target: &[String]) -> Result<()> {
  let comments = match target {
    [issue_key] => {
      let issue = client.issue_by_key(issue_key).await?;
      client.issue_comments(issue.id).await?
    }
    [project_key, repository, number] => {
      let number: u64 = number
        .parse()
        .map_err(|_| eyre!("Invalid pull request number: {}", number))?;
      let project = client.project_by_key(project_key).await?;
      let repository = client.repository(project.id, repository).await?;
      let pr = client
        .pull_request(project.id, repository.id, number)
        .await?;
      println!("#{} {}", pr.number, pr.summary);
      client
        .pull_request_comments(project.id, repository.id, pr.number)
        .await?
    }
    _ => {
      return Err(eyre!(
        "Specify an issue key, or a project, repository and pull request number"
      ))
    }
  };

  for comment in &comments {
    print_comment(comment);
  }
  Ok(())
}

async fn list_pull_requests(
  client: &CachedBacklogClient,
  project_key: &str,
  repository: &str,
) -> Result<()> {
  let project = client.project_by_key(project_key).await?;
  let repository = client.repository(project.id, repository).await?;

  for pr in client.pull_requests(project.id, repository.id).await? {
    println!(
      "{}. {} (created at {} by {})",
      pr.number,
      pr.summary,
      format_date(pr.created),
      user_name(pr.created_user.as_ref()),
    );
  }
  Ok(())
}

async fn list_repositories(client: &CachedBacklogClient) -> Result<()> {
  for project in client.projects().await? {
    let repositories = client.repositories(project.id).await?;

    println!("- [{}] {}", project.project_key, project.name);
    for repository in repositories {
      println!("  - {}", repository.name);
    }
  }
  Ok(())
}

async fn list_wikis(client: &CachedBacklogClient) -> Result<()> {
  for project in client.projects().await? {
    let wikis = client.wikis(project.id).await?;

    println!("- [{}] {}", project.project_key, project.name);
    for wiki in wikis {
      println!(
        "  - {} updated {} ({})",
        wiki.name,
        format_date(wiki.updated),
        wiki.id
      );
    }
  }
  Ok(())
}

async fn show_wiki(client: &CachedBacklogClient, config: &Config, wiki_id: u64) -> Result<()> {
  let wiki = client.wiki(wiki_id).await?;
  let project = client.project(wiki.project_id).await?;

  let mut url = url::Url::parse(&config.web_url("wiki")?)?;
  url
    .path_segments_mut()
    .map_err(|_| eyre!("Invalid wiki URL"))?
    .push(&project.project_key)
    .push(&wiki.name);

  println!("---");
  println!("project: {}", project.project_key);
  println!("name: {}", wiki.name);
  println!("created: {}", format_date(wiki.created));
  println!("updated: {}", format_date(wiki.updated));
  println!("url: {}", url);
  println!("---");
  println!("{}", wiki.content.as_deref().unwrap_or_default());

  Ok(())
}

fn print_comment(comment: &Comment) {
  let author = user_name(comment.created_user.as_ref());
  let content = comment.content.as_deref().unwrap_or_default();

  if comment.change_log.is_empty() {
    println!("{}: {}", author, content);
    return;
  }

  println!("{} changed the issue", author);
  if !content.is_empty() {
    println!("{}", content);
  }
  for change in &comment.change_log {
    println!(
      "   {} {} -> {}",
      change.field,
      change.original_value.as_deref().unwrap_or_default(),
      change.new_value.as_deref().unwrap_or_default()
    );
  }
}

fn user_name(user: Option<&User>) -> &str {
  user.map_or("-", |u| u.name.as_str())
}

fn format_date(at: Option<DateTime<Utc>>) -> String {
  at.map(|at| at.with_timezone(&Local).format("%Y-%m-%d").to_string())
    .unwrap_or_default()
}

fn format_hours(hours: Option<f64>) -> String {
  hours.map(|h| h.to_string()).unwrap_or_default()
}

fn format_ttl(ttl: Duration) -> String {
  let secs = ttl.num_seconds();
  match secs {
    s if s > 0 && s % 86_400 == 0 => format!("{}d", s / 86_400),
    s if s > 0 && s % 3_600 == 0 => format!("{}h", s / 3_600),
    s if s > 0 && s % 60 == 0 => format!("{}m", s / 60),
    s => format!("{}s", s),
  }
}

fn format_stats(stats: &KindStats, policy: &TtlPolicy) -> String {
  let fetched = stats.last_fetched_at.map_or_else(
    || "never".to_string(),
    |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
  );
  format!(
    "{:<22} {:>6} records {:>10} bytes  ttl {:>5}  fetched {}",
    stats.kind.label(),
    stats.records,
    stats.total_bytes,
    format_ttl(policy.ttl(stats.kind)),
    fetched
  )
}
