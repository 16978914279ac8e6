//! Commit history access through the host `git` binary.
//!
//! History is read-only input: the commit log touching a file, and the
//! file's text at each of those commits. Failures never abort a run; the
//! caller downgrades them to `History::Unavailable`.

use std::path::Path;
use std::process::{Command, Output};

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("git is not available: {0}")]
    GitMissing(#[source] std::io::Error),

    #[error("{0} is not inside a git work tree")]
    NotARepository(String),

    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("unparseable git log line: {0}")]
    BadLogLine(String),
}

/// One commit touching a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    /// Author date.
    pub date: NaiveDate,
    pub subject: String,
}

impl CommitInfo {
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSource {
    Commit(CommitInfo),
    WorkingTree,
}

/// A file's text at one point in history. `text` is `None` where the file
/// did not exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub source: RevisionSource,
    pub date: NaiveDate,
    pub text: Option<String>,
}

impl Revision {
    pub fn commit(&self) -> Option<&CommitInfo> {
        match &self.source {
            RevisionSource::Commit(c) => Some(c),
            RevisionSource::WorkingTree => None,
        }
    }

    /// Short hash, or `working-tree`.
    pub fn label(&self) -> String {
        match &self.source {
            RevisionSource::Commit(c) => c.short_hash().to_string(),
            RevisionSource::WorkingTree => "working-tree".to_string(),
        }
    }
}

/// Revisions of one file, oldest first, ending with the working tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHistory {
    pub path: String,
    pub revisions: Vec<Revision>,
}

impl FileHistory {
    pub fn commits(&self) -> impl Iterator<Item = &CommitInfo> {
        self.revisions.iter().filter_map(Revision::commit)
    }

    pub fn is_tracked(&self) -> bool {
        self.commits().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum History {
    Available(Vec<FileHistory>),
    Unavailable(String),
}

impl History {
    pub fn file(&self, path: &str) -> Option<&FileHistory> {
        match self {
            History::Available(files) => files.iter().find(|f| f.path == path),
            History::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, History::Available(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            History::Unavailable(reason) => Some(reason),
            History::Available(_) => None,
        }
    }
}

fn git(root: &Path, args: &[&str]) -> Result<Output, HistoryError> {
    Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(HistoryError::GitMissing)
}

/// Confirm `root` is inside a git work tree.
pub fn probe(root: &Path) -> Result<(), HistoryError> {
    let out = git(root, &["rev-parse", "--is-inside-work-tree"])?;
    if out.status.success() && String::from_utf8_lossy(&out.stdout).trim() == "true" {
        Ok(())
    } else {
        Err(HistoryError::NotARepository(root.display().to_string()))
    }
}

/// Commits touching `rel`, oldest first.
pub fn commit_log(root: &Path, rel: &str) -> Result<Vec<CommitInfo>, HistoryError> {
    let args = ["log", "--format=%H%x1f%aI%x1f%s", "--", rel];
    let out = git(root, &args)?;
    if !out.status.success() {
        return Err(HistoryError::CommandFailed {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }

    let mut commits = String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_log_line)
        .collect::<Result<Vec<_>, _>>()?;
    commits.reverse();
    Ok(commits)
}

fn parse_log_line(line: &str) -> Result<CommitInfo, HistoryError> {
    let mut parts = line.splitn(3, '\u{1f}');
    let (Some(hash), Some(date), subject) = (parts.next(), parts.next(), parts.next()) else {
        return Err(HistoryError::BadLogLine(line.to_string()));
    };
    let date = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|_| HistoryError::BadLogLine(line.to_string()))?
        .date_naive();
    Ok(CommitInfo {
        hash: hash.trim().to_string(),
        date,
        subject: subject.unwrap_or_default().trim().to_string(),
    })
}

/// Text of `rel` at `hash`, or `None` if the file did not exist there.
pub fn show(root: &Path, hash: &str, rel: &str) -> Result<Option<String>, HistoryError> {
    let spec = format!("{hash}:./{rel}");
    let out = git(root, &["show", &spec])?;
    if !out.status.success() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&out.stdout).into_owned()))
}

/// Materialize every committed revision of `rel`, then the working tree.
pub fn file_history(
    root: &Path,
    rel: &str,
    working_text: Option<&str>,
    today: NaiveDate,
) -> Result<FileHistory, HistoryError> {
    let commits = commit_log(root, rel)?;
    debug!(path = rel, commits = commits.len(), "materializing file history");

    let mut revisions = Vec::with_capacity(commits.len() + 1);
    for commit in commits {
        let text = show(root, &commit.hash, rel)?;
        revisions.push(Revision {
            date: commit.date,
            source: RevisionSource::Commit(commit),
            text,
        });
    }
    revisions.push(Revision {
        source: RevisionSource::WorkingTree,
        date: today,
        text: working_text.map(str::to_string),
    });

    Ok(FileHistory {
        path: rel.to_string(),
        revisions,
    })
}
