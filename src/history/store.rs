//! Discovery and loading of session logs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::aggregate::aggregate;
use super::record::{parse_line, LogLine, LogRecord};
use crate::config::{EngineConfig, SessionId};
use crate::protocol::{Message, Role};
use crate::{Error, Result};

/// Log file extension.
const LOG_EXTENSION: &str = "jsonl";

/// Stem prefix of sub-agent transcripts, which are not conversations.
const AGENT_PREFIX: &str = "agent-";

/// Longest title derived from message text, in characters.
const TITLE_MAX_CHARS: usize = 80;

/// Sessions aggregating to fewer messages are not listed.
const MIN_LISTED_MESSAGES: usize = 2;

/// Summary of one stored session, for a session picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub title: String,
    /// Epoch milliseconds of the latest activity.
    pub last_timestamp: i64,
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Reads the session logs the external CLI writes under `projects/`.
///
/// The store never writes. All I/O is synchronous and stateless, so one
/// store can serve concurrent lookups.
#[derive(Debug, Clone)]
pub struct SessionStore {
    projects_root: PathBuf,
}

impl SessionStore {
    /// Create a store over a `projects/` directory.
    pub fn new(projects_root: impl Into<PathBuf>) -> Self {
        Self {
            projects_root: projects_root.into(),
        }
    }

    /// Create a store over the config's `claude_home/projects`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.projects_dir())
    }

    pub fn projects_root(&self) -> &Path {
        &self.projects_root
    }

    /// Directory holding the logs of one project.
    pub fn project_dir(&self, project: &Path) -> PathBuf {
        self.projects_root.join(project_namespace(project))
    }

    /// Path of one session's log.
    pub fn session_path(&self, project: &Path, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self
            .project_dir(project)
            .join(format!("{session_id}.{LOG_EXTENSION}")))
    }

    /// List the project's sessions, most recent first.
    ///
    /// Unreadable files are skipped; a missing project directory lists
    /// nothing.
    pub fn list_sessions(&self, project: &Path) -> Vec<SessionInfo> {
        let dir = self.project_dir(project);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "no session directory");
                return Vec::new();
            }
        };

        let mut sessions: Vec<SessionInfo> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| is_session_log(path))
            .filter_map(|path| match summarize(&path) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping session log");
                    None
                }
            })
            .collect();

        sessions.sort_by(|a, b| {
            b.last_timestamp
                .cmp(&a.last_timestamp)
                .then_with(|| a.session_id.as_str().cmp(b.session_id.as_str()))
        });
        sessions
    }

    /// Load a session's messages, or nothing if it cannot be read.
    pub fn load_session(&self, project: &Path, session_id: &str) -> Vec<Message> {
        self.read_session(project, session_id)
            .unwrap_or_else(|e| {
                tracing::warn!(session_id, error = %e, "failed to load session");
                Vec::new()
            })
    }

    /// Load a session's messages.
    pub fn read_session(&self, project: &Path, session_id: &str) -> Result<Vec<Message>> {
        let path = self.session_path(project, session_id)?;
        Ok(aggregate(read_log(&path)?.records))
    }
}

/// The directory name the external CLI uses for a project.
///
/// Every character of the canonical path that is not an ASCII letter or
/// digit becomes `-`, so `/home/me/my_app` maps to `-home-me-my-app`.
pub fn project_namespace(project: &Path) -> String {
    let canonical = fs::canonicalize(project).unwrap_or_else(|_| project.to_path_buf());
    canonical
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn validate_session_id(session_id: &str) -> Result<()> {
    let invalid = session_id.is_empty()
        || session_id.contains(['/', '\\', '\0'])
        || session_id.contains("..");
    if invalid {
        return Err(Error::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

fn is_session_log(path: &Path) -> bool {
    let is_log = path.extension().is_some_and(|ext| ext == LOG_EXTENSION);
    let is_agent = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map_or(true, |stem| stem.starts_with(AGENT_PREFIX));
    is_log && !is_agent && path.is_file()
}

struct ParsedLog {
    records: Vec<LogRecord>,
    summary: Option<String>,
    slug: Option<String>,
}

fn read_log(path: &Path) -> Result<ParsedLog> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let mut log = ParsedLog {
        records: Vec::new(),
        summary: None,
        slug: None,
    };
    for line in content.lines() {
        match parse_line(line) {
            LogLine::Record(record) => {
                if record.slug.is_some() {
                    log.slug.clone_from(&record.slug);
                }
                if !record.blocks.is_empty() {
                    log.records.push(record);
                }
            }
            LogLine::Summary(summary) => log.summary = Some(summary),
            LogLine::Skip => {}
        }
    }
    Ok(log)
}

fn summarize(path: &Path) -> Result<Option<SessionInfo>> {
    let Some(session_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return Ok(None);
    };

    let log = read_log(path)?;
    let last_record = log.records.iter().map(|record| record.timestamp).max();
    let messages = aggregate(log.records);
    if messages.len() < MIN_LISTED_MESSAGES {
        return Ok(None);
    }

    let last_timestamp = match last_record {
        Some(timestamp) if timestamp > 0 => timestamp,
        _ => modified_millis(path)?,
    };
    let title = log
        .summary
        .or_else(|| title_from_messages(&messages))
        .unwrap_or_else(|| session_id.to_string());

    Ok(Some(SessionInfo {
        session_id: SessionId::new(session_id),
        title,
        last_timestamp,
        message_count: messages.len(),
        slug: log.slug,
    }))
}

fn modified_millis(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis())
}

/// First non-empty line of the first user message's text.
fn title_from_messages(messages: &[Message]) -> Option<String> {
    let first_user = messages.iter().find(|message| message.role() == Role::User)?;
    let text = first_user.text();
    let line = text.lines().map(str::trim).find(|line| !line.is_empty())?;

    if line.chars().count() <= TITLE_MAX_CHARS {
        return Some(line.to_string());
    }
    let mut title: String = line.chars().take(TITLE_MAX_CHARS - 1).collect();
    title.push('…');
    Some(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_replaces_non_alphanumerics() {
        let missing = Path::new("/no/such/dir/my_app.v2");
        assert_eq!(project_namespace(missing), "-no-such-dir-my-app-v2");
    }

    #[test]
    fn namespace_uses_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir(&nested).unwrap();
        let through_dots = nested.join("..").join("a");
        assert_eq!(project_namespace(&through_dots), project_namespace(&nested));
    }

    #[test]
    fn session_ids_cannot_escape() {
        let store = SessionStore::new("/tmp/projects");
        let project = Path::new("/work/app");
        for bad in ["", "../secret", "a/b", "a\\b", ".."] {
            assert!(
                matches!(store.session_path(project, bad), Err(Error::InvalidSessionId(_))),
                "accepted {bad:?}"
            );
        }
        let path = store.session_path(project, "1f0c-42").unwrap();
        assert_eq!(path.file_name().unwrap(), "1f0c-42.jsonl");
    }

    #[test]
    fn log_filter() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s1.jsonl", "agent-x.jsonl", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert!(is_session_log(&dir.path().join("s1.jsonl")));
        assert!(!is_session_log(&dir.path().join("agent-x.jsonl")));
        assert!(!is_session_log(&dir.path().join("notes.txt")));
        assert!(!is_session_log(&dir.path().join("missing.jsonl")));
    }

    #[test]
    fn titles_are_truncated() {
        let long = "x".repeat(200);
        let messages = vec![Message::user(format!("\n  {long}\nsecond line"))];
        let title = title_from_messages(&messages).unwrap();
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert!(title.ends_with('…'));

        let messages = vec![Message::assistant("only the assistant spoke")];
        assert_eq!(title_from_messages(&messages), None);
    }

    #[test]
    fn session_info_serializes_camel_case() {
        let info = SessionInfo {
            session_id: SessionId::new("s1"),
            title: "Fix bug".into(),
            last_timestamp: 5,
            message_count: 2,
            slug: None,
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sessionId": "s1",
                "title": "Fix bug",
                "lastTimestamp": 5,
                "messageCount": 2,
            })
        );
    }
}
