//! Per-call state for the client-streaming and bidirectional drivers.
//!
//! A [`StreamingSession`] is owned by the one task driving a call and moves
//! through `Open -> HalfClosed -> Settled`. It never goes back to `Open`, and
//! once settled further settlement attempts are ignored, so a late stream
//! end after a timeout cannot overwrite the `Timeout` outcome.

use core::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

/// How a call ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "camelCase")]
pub enum Outcome {
    /// The remote side completed the call.
    Success,
    /// The call ended with an error, described by the string.
    Failure(String),
    /// No completion arrived before the deadline.
    Timeout,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    HalfClosed,
    Settled(Outcome),
}

/// Result of a streaming call: its outcome plus whatever was gathered.
///
/// `value` is meaningful for every outcome. A timed-out or failed chat still
/// carries the lines received before the call ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Settled<T> {
    pub outcome: Outcome,
    pub value: T,
}

pub struct StreamingSession<O, I> {
    outbound: std::vec::IntoIter<O>,
    inbound: Vec<I>,
    state: SessionState,
    deadline: Option<Instant>,
    timeout: Duration,
}

impl<O, I> StreamingSession<O, I> {
    /// Opens a session that will send `outbound` in order. `timeout` is how
    /// long the session waits for completion once half-closed.
    pub fn new(outbound: Vec<O>, timeout: Duration) -> Self {
        Self {
            outbound: outbound.into_iter(),
            inbound: Vec::new(),
            state: SessionState::Open,
            deadline: None,
            timeout,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, SessionState::Settled(_))
    }

    /// Items not yet handed out by [`next_outbound`](Self::next_outbound).
    pub fn remaining(&self) -> usize {
        self.outbound.len()
    }

    /// Next item to send. Always `None` once the session is no longer open.
    pub fn next_outbound(&mut self) -> Option<O> {
        if self.is_open() {
            self.outbound.next()
        } else {
            None
        }
    }

    /// Records an inbound message. Messages arriving after settlement are
    /// dropped.
    pub fn push_inbound(&mut self, item: I) {
        if !self.is_settled() {
            self.inbound.push(item);
        }
    }

    pub fn received(&self) -> usize {
        self.inbound.len()
    }

    /// Stops sending and arms the completion deadline.
    ///
    /// Only the first call arms the deadline. Returns the deadline, or `None`
    /// if the session settled before it was half-closed.
    pub fn half_close(&mut self) -> Option<Instant> {
        if self.is_open() {
            self.state = SessionState::HalfClosed;
            self.deadline = Some(Instant::now() + self.timeout);
        }
        self.deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Moves to `Settled(outcome)`. Returns `false`, leaving the session
    /// unchanged, if it had already settled.
    pub fn settle(&mut self, outcome: Outcome) -> bool {
        if self.is_settled() {
            return false;
        }
        self.state = SessionState::Settled(outcome);
        true
    }

    /// Consumes the session. An unsettled session reports a failure.
    pub fn finish(self) -> Settled<Vec<I>> {
        let outcome = match self.state {
            SessionState::Settled(outcome) => outcome,
            SessionState::Open | SessionState::HalfClosed => {
                Outcome::Failure("session ended before settling".to_string())
            }
        };
        Settled {
            outcome,
            value: self.inbound,
        }
    }
}
