//! Editor context the UI attaches to user messages.
//!
//! Before sending, the UI may append an annotation naming the file the user
//! is looking at and a list of attached screenshots. The worker logs the
//! message with those suffixes included, so history loading strips them
//! again. [`append_context`] and [`strip_context`] are exact inverses.

use std::sync::LazyLock;

use regex::Regex;

static VIEWING_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\n\[Currently viewing: .+:\d+\]\z").expect("valid regex")
});

static SCREENSHOTS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n\n\[Attached screenshots:(?:\n- [^\n]*)+\]\z").expect("valid regex")
});

/// The file and line the user had open when sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewingLocation<'a> {
    pub path: &'a str,
    pub line: u32,
}

/// Append the viewing annotation and screenshot list to `text`.
pub fn append_context(
    text: &str,
    viewing: Option<ViewingLocation<'_>>,
    screenshots: &[&str],
) -> String {
    let mut out = text.to_string();
    if let Some(location) = viewing {
        out.push_str(&format!(
            "\n\n[Currently viewing: {}:{}]",
            location.path, location.line
        ));
    }
    append_screenshots(&out, screenshots)
}

/// Append only the screenshot list. No-op for an empty list.
pub fn append_screenshots(text: &str, screenshots: &[&str]) -> String {
    if screenshots.is_empty() {
        return text.to_string();
    }
    let mut out = String::from(text);
    out.push_str("\n\n[Attached screenshots:");
    for path in screenshots {
        out.push_str("\n- ");
        out.push_str(path);
    }
    out.push(']');
    out
}

/// Remove UI-injected suffixes from a user message.
///
/// Each pattern is removed at most once, in either order. Text without
/// either suffix is returned unchanged.
pub fn strip_context(text: &str) -> String {
    let mut out = text;
    let mut viewing_done = false;
    let mut screenshots_done = false;

    loop {
        if !screenshots_done {
            if let Some(m) = SCREENSHOTS_SUFFIX.find(out) {
                out = &out[..m.start()];
                screenshots_done = true;
                continue;
            }
        }
        if !viewing_done {
            if let Some(m) = VIEWING_SUFFIX.find(out) {
                out = &out[..m.start()];
                viewing_done = true;
                continue;
            }
        }
        break;
    }

    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWING: ViewingLocation<'static> = ViewingLocation {
        path: "src/main.rs",
        line: 42,
    };

    #[test]
    fn plain_text_is_untouched() {
        for text in [
            "fix bug",
            "",
            "multi\nline\n\ntext",
            "mentions [Currently viewing: x] mid-text and more",
            "[Attached screenshots:] not a list",
        ] {
            assert_eq!(strip_context(text), text);
        }
    }

    #[test]
    fn strips_viewing_annotation() {
        let text = append_context("fix bug", Some(VIEWING), &[]);
        assert_eq!(text, "fix bug\n\n[Currently viewing: src/main.rs:42]");
        assert_eq!(strip_context(&text), "fix bug");
    }

    #[test]
    fn strips_screenshot_list() {
        let text = append_context("look", None, &["/tmp/a.png", "/tmp/b c.png"]);
        assert_eq!(
            text,
            "look\n\n[Attached screenshots:\n- /tmp/a.png\n- /tmp/b c.png]"
        );
        assert_eq!(strip_context(&text), "look");
    }

    #[test]
    fn strips_both_in_either_order() {
        let forward = append_context("why", Some(VIEWING), &["/tmp/a.png"]);
        assert_eq!(strip_context(&forward), "why");

        let reversed = format!(
            "{}\n\n[Currently viewing: lib.rs:1]",
            append_screenshots("why", &["/tmp/a.png"])
        );
        assert_eq!(strip_context(&reversed), "why");
    }

    #[test]
    fn strip_is_idempotent() {
        let text = append_context("again", Some(VIEWING), &["/a.png"]);
        let once = strip_context(&text);
        assert_eq!(strip_context(&once), once);
    }

    #[test]
    fn bracketed_paths_are_stripped() {
        let text = append_context(
            "fix",
            Some(ViewingLocation {
                path: "app/[id]/page.tsx",
                line: 3,
            }),
            &["/tmp/shot[1].png", "/tmp/[draft].png"],
        );
        assert_eq!(strip_context(&text), "fix");
    }

    #[test]
    fn user_trailing_newlines_survive() {
        let text = append_context("code:\n", Some(VIEWING), &["/a.png"]);
        assert_eq!(strip_context(&text), "code:\n");

        let text = append_context("list:\n\n", None, &["/a.png"]);
        assert_eq!(strip_context(&text), "list:\n\n");
    }

    #[test]
    fn annotation_only_message_becomes_empty() {
        let text = append_context("", Some(VIEWING), &[]);
        assert_eq!(strip_context(&text), "");
    }
}
