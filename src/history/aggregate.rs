//! Collapsing log records into conversation turns.
//!
//! The log holds one line per API call, so a single assistant turn may span
//! several `assistant` lines, and tool results come back as `user` lines the
//! person never typed. Aggregation merges consecutive same-role records and
//! folds those tool-result lines into the assistant turn they answer.

use crate::context::strip_context;
use crate::protocol::{is_tool_result_only, ContentBlock, Message, Role};

use super::record::LogRecord;

struct Run {
    role: Role,
    blocks: Vec<ContentBlock>,
    timestamp: i64,
}

impl Run {
    fn start(record: LogRecord) -> Self {
        Self {
            role: record.role,
            blocks: record.blocks,
            timestamp: record.timestamp,
        }
    }

    fn into_message(self) -> Message {
        Message::new(self.role, self.blocks, self.timestamp)
    }
}

/// Aggregate records, in log order, into UI messages.
///
/// Records without blocks contribute nothing. Already-aggregated input
/// (one record per turn) comes back unchanged.
pub fn aggregate(records: impl IntoIterator<Item = LogRecord>) -> Vec<Message> {
    let mut flushed: Vec<Run> = Vec::new();
    let mut current: Option<Run> = None;

    for mut record in records {
        if record.blocks.is_empty() {
            continue;
        }

        if record.role == Role::User && is_tool_result_only(&record.blocks) {
            match current.as_mut() {
                Some(run) if run.role == Role::Assistant => run.blocks.append(&mut record.blocks),
                _ => match flushed.last_mut() {
                    Some(last) if last.role == Role::Assistant => {
                        last.blocks.append(&mut record.blocks)
                    }
                    _ => tracing::trace!("discarding orphan tool result record"),
                },
            }
            continue;
        }

        if record.role == Role::User {
            strip_user_context(&mut record.blocks);
        }

        match current.as_mut() {
            Some(run) if run.role == record.role => run.blocks.append(&mut record.blocks),
            _ => flushed.extend(current.replace(Run::start(record))),
        }
    }

    flushed.extend(current);
    flushed.into_iter().map(Run::into_message).collect()
}

fn strip_user_context(blocks: &mut [ContentBlock]) {
    for block in blocks {
        if let ContentBlock::Text(text) = block {
            text.text = strip_context(&text.text);
        }
    }
}
