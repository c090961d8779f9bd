//! Session listing and loading against on-disk log fixtures.

mod common;

use std::fs;
use std::path::Path;

use claude_relay::context::{append_context, ViewingLocation};
use claude_relay::history::project_namespace;
use claude_relay::{ContentBlock, EngineConfig, Error, Role, SessionId, SessionStore};

use common::SessionLog;

struct Fixture {
    home: tempfile::TempDir,
    project: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
            project: tempfile::tempdir().unwrap(),
        }
    }

    fn projects_root(&self) -> std::path::PathBuf {
        self.home.path().join("projects")
    }

    fn project(&self) -> &Path {
        self.project.path()
    }

    fn store(&self) -> SessionStore {
        SessionStore::new(self.projects_root())
    }

    fn write(&self, log: SessionLog, file_name: &str) {
        log.write(&self.projects_root(), self.project(), file_name);
    }
}

#[test]
fn fix_bug_example_loads_two_messages() {
    let fixture = Fixture::new();
    fixture.write(
        SessionLog::new()
            .raw(r#"{"type":"user","message":{"content":[{"type":"text","text":"fix bug"}]}}"#)
            .raw(r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Sure"}]}}"#)
            .raw(r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"x","content":"ok"}]}}"#),
        "s1.jsonl",
    );

    let messages = fixture.store().load_session(fixture.project(), "s1");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].content(), &[ContentBlock::text_block("fix bug")]);
    assert_eq!(messages[1].role(), Role::Assistant);
    assert_eq!(
        messages[1].content(),
        &[
            ContentBlock::text_block("Sure"),
            ContentBlock::tool_result("x", "ok", false),
        ]
    );
}

#[test]
fn listing_filters_and_sorts() {
    let fixture = Fixture::new();
    fixture.write(
        SessionLog::new()
            .user("older question", "2025-03-01T10:00:00Z")
            .assistant("older answer", "2025-03-01T10:00:05Z")
            .summary("Investigating the flaky test"),
        "older.jsonl",
    );
    fixture.write(
        SessionLog::new()
            .user("newer question\nwith details", "2025-03-02T09:00:00Z")
            .assistant("newer answer", "2025-03-02T09:00:30.500Z"),
        "newer.jsonl",
    );
    // A single message is not a conversation.
    fixture.write(
        SessionLog::new().user("abandoned", "2025-03-03T00:00:00Z"),
        "lonely.jsonl",
    );
    fixture.write(
        SessionLog::new()
            .user("sub-agent task", "2025-03-04T00:00:00Z")
            .assistant("sub-agent result", "2025-03-04T00:00:01Z"),
        "agent-1234.jsonl",
    );
    fixture.write(
        SessionLog::new()
            .user("not a log", "2025-03-04T00:00:00Z")
            .assistant("really", "2025-03-04T00:00:01Z"),
        "notes.txt",
    );

    let sessions = fixture.store().list_sessions(fixture.project());
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "older"]);

    let newer = &sessions[0];
    assert_eq!(newer.title, "newer question");
    assert_eq!(newer.message_count, 2);
    assert_eq!(newer.last_timestamp, 1_740_906_030_500);

    let older = &sessions[1];
    assert_eq!(older.title, "Investigating the flaky test");
    assert_eq!(older.session_id, SessionId::new("older"));
}

#[test]
fn tool_result_lines_do_not_count_as_messages() {
    let fixture = Fixture::new();
    fixture.write(
        SessionLog::new()
            .tool_result("orphan", "ok", "2025-03-01T10:00:00Z")
            .user("only me", "2025-03-01T10:00:01Z"),
        "orphan.jsonl",
    );
    assert!(fixture.store().list_sessions(fixture.project()).is_empty());
    assert_eq!(fixture.store().load_session(fixture.project(), "orphan").len(), 1);
}

#[test]
fn broken_lines_are_skipped() {
    let fixture = Fixture::new();
    fixture.write(
        SessionLog::new()
            .raw("{ truncated")
            .raw(r#"{"type":"file-history-snapshot","snapshot":{}}"#)
            .user("hi", "2025-03-01T10:00:00Z")
            .raw("")
            .assistant("hello", "2025-03-01T10:00:01Z")
            .raw(r#"{"type":"assistant","message":{"content":[{"type":"mystery"}]}}"#),
        "messy.jsonl",
    );

    let messages = fixture.store().load_session(fixture.project(), "messy");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), "hello");
}

#[test]
fn ui_context_is_stripped_on_load() {
    let fixture = Fixture::new();
    let sent = append_context(
        "what does this do?",
        Some(ViewingLocation {
            path: "src/engine.rs",
            line: 120,
        }),
        &["/tmp/a.png", "/tmp/b.png"],
    );
    fixture.write(
        SessionLog::new()
            .user(&sent, "2025-03-01T10:00:00Z")
            .assistant("It spawns the worker.", "2025-03-01T10:00:01Z"),
        "ctx.jsonl",
    );

    let messages = fixture.store().load_session(fixture.project(), "ctx");
    assert_eq!(messages[0].text(), "what does this do?");

    let sessions = fixture.store().list_sessions(fixture.project());
    assert_eq!(sessions[0].title, "what does this do?");
}

#[test]
fn missing_timestamps_fall_back_to_mtime() {
    let fixture = Fixture::new();
    fixture.write(
        SessionLog::new()
            .raw(r#"{"type":"user","message":{"content":"bare string"}}"#)
            .raw(r#"{"type":"assistant","message":{"content":"reply"}}"#),
        "untimed.jsonl",
    );

    let sessions = fixture.store().list_sessions(fixture.project());
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].last_timestamp > 0);
    assert_eq!(sessions[0].title, "bare string");
}

#[test]
fn missing_and_invalid_sessions() {
    let fixture = Fixture::new();
    let store = fixture.store();

    assert!(store.list_sessions(fixture.project()).is_empty());
    assert!(store.load_session(fixture.project(), "nope").is_empty());
    assert!(matches!(store.read_session(fixture.project(), "nope"), Err(Error::Io(_))));
    assert!(matches!(
        store.read_session(fixture.project(), "../../etc/passwd"),
        Err(Error::InvalidSessionId(_))
    ));
}

#[test]
fn store_from_config_uses_claude_home() {
    let fixture = Fixture::new();
    let config = EngineConfig::builder()
        .project_dir(fixture.project())
        .claude_home(fixture.home.path())
        .build()
        .unwrap();
    let store = SessionStore::from_config(&config);

    assert_eq!(store.projects_root(), fixture.projects_root());
    assert_eq!(
        store.project_dir(fixture.project()),
        fixture.projects_root().join(project_namespace(fixture.project()))
    );
    let namespace = project_namespace(fixture.project());
    assert!(namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    assert!(fs::canonicalize(fixture.project()).is_ok());
}
