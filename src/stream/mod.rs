//! Streaming turn handling.
//!
//! # Overview
//!
//! Each turn runs on its own background task that owns the worker's pipes.
//! The task drives the exchange and feeds a channel that the consumer sees
//! as a [`TurnStream`]:
//!
//! - [`TurnStream`] - the async stream of [`StreamEvent`](crate::StreamEvent)s
//! - [`CollectedTurn`] - a whole turn drained into one reply
//!
//! # Cancellation
//!
//! Dropping a [`TurnStream`] will:
//! 1. Cancel the turn's token
//! 2. Kill and reap the worker on the background task
//!
//! Cancellation is observed between lines and while waiting on a
//! permission decision.

pub(crate) mod driver;
mod response;

pub use response::{CollectedTurn, TurnStream};
