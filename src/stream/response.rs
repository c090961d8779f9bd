//! The event stream of one turn.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::protocol::{Message, MessageBuilder, StreamEvent, Usage};

/// Events of one turn, from `StreamStart` to `StreamEnd`.
///
/// Yields [`StreamEvent`]s in the order the worker produced them and ends
/// after `StreamEnd`. Event production happens on a background task, so the
/// stream can be polled from anywhere.
///
/// # Cancellation
///
/// Dropping a `TurnStream` (or calling [`cancel`](TurnStream::cancel)) stops
/// the turn: the worker is killed and reaped in the background. After
/// `cancel` the stream still delivers `StreamEnd` and nothing after it.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use claude_relay::{Message, StreamEvent, StreamingEngine, TurnRequest};
///
/// # async fn demo(engine: StreamingEngine) {
/// let mut turn = engine.send_message(TurnRequest::new(vec![Message::user("Hello")]));
/// while let Some(event) = turn.next().await {
///     match event {
///         StreamEvent::TextDelta { text } => print!("{text}"),
///         StreamEvent::Error { message } => eprintln!("error: {message}"),
///         StreamEvent::StreamEnd => break,
///         _ => {}
///     }
/// }
/// # }
/// ```
pub struct TurnStream {
    rx: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    finished: bool,
}

impl TurnStream {
    pub(crate) fn new(rx: mpsc::Receiver<StreamEvent>, cancel: CancellationToken) -> Self {
        Self {
            rx,
            cancel,
            finished: false,
        }
    }

    /// Stop the turn. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drain the turn, assembling the assistant reply.
    pub async fn collect_turn(mut self) -> CollectedTurn {
        let mut builder = MessageBuilder::assistant();
        let mut turn = CollectedTurn::default();

        while let Some(event) = self.next().await {
            builder.apply(&event);
            match &event {
                StreamEvent::Usage(usage) => turn.usage.accumulate(usage),
                StreamEvent::Error { message } => turn.errors.push(message.clone()),
                _ => {}
            }
            turn.events.push(event);
        }

        turn.message = builder.finish();
        turn
    }
}

impl Stream for TurnStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_stream_end() {
                    this.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        // The turn task notices, kills the worker and releases the engine.
        self.cancel.cancel();
    }
}

/// A turn drained by [`TurnStream::collect_turn`].
#[derive(Debug, Clone)]
pub struct CollectedTurn {
    /// The assistant reply assembled from deltas, snapshots and tool events.
    pub message: Message,
    /// Usage summed over every `Usage` event.
    pub usage: Usage,
    /// Messages of all `Error` events, in order.
    pub errors: Vec<String>,
    /// Every event, including `StreamStart` and `StreamEnd`.
    pub events: Vec<StreamEvent>,
}

impl Default for CollectedTurn {
    fn default() -> Self {
        Self {
            message: MessageBuilder::assistant().finish(),
            usage: Usage::default(),
            errors: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl CollectedTurn {
    /// Check if the turn produced no `Error` events.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// The reply's text.
    pub fn text(&self) -> String {
        self.message.text()
    }

    /// Whether the turn was closed by `StreamEnd`.
    pub fn is_complete(&self) -> bool {
        self.events.last().is_some_and(StreamEvent::is_stream_end)
    }
}
