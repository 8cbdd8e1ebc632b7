// One conversation: transcript, submission guard, and change notifications.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::constants::FALLBACK_REPLY;
use crate::conversation::{Conversation, Turn};
use crate::error::GatewayError;
use crate::gateway::{ChatModel, ModelGateway};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    AwaitingReply,
}

/// Why a submission was ignored. The transcript is untouched in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rejection {
    Empty,
    Busy,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Empty => write!(f, "empty message"),
            Rejection::Busy => write!(f, "a reply is already pending"),
        }
    }
}

/// Emitted after every change a view needs to redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnAppended { index: usize, turn: Turn },
    LoadingChanged(bool),
}

/// A submitted user turn waiting for its reply.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Transcript as it stood before the user turn was appended.
    pub history: Vec<Turn>,
    pub text: String,
}

pub struct Session<M> {
    conversation: Conversation,
    state: SubmissionState,
    gateway: Arc<ModelGateway<M>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<M: ChatModel> Session<M> {
    /// The gateway must already be initialized; see [`ModelGateway::initialize`].
    pub fn new(gateway: Arc<ModelGateway<M>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            conversation: Conversation::new(),
            state: SubmissionState::Idle,
            gateway,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn turns(&self) -> &[Turn] {
        self.conversation.all()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn gateway(&self) -> Arc<ModelGateway<M>> {
        Arc::clone(&self.gateway)
    }

    /// Records the user turn and enters `AwaitingReply`.
    pub fn begin(&mut self, text: &str) -> Result<Exchange, Rejection> {
        if self.state == SubmissionState::AwaitingReply {
            return Err(Rejection::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::Empty);
        }

        let history = self.conversation.all().to_vec();
        self.push(Turn::user(text));
        self.state = SubmissionState::AwaitingReply;
        self.notify(SessionEvent::LoadingChanged(true));

        Ok(Exchange {
            history,
            text: text.to_string(),
        })
    }

    /// Records the assistant turn for the pending exchange and returns to
    /// `Idle`. Failures become the fallback reply. Returns `None`, leaving the
    /// transcript untouched, when no exchange is pending.
    pub fn finish(&mut self, result: Result<String, GatewayError>) -> Option<Turn> {
        if self.state != SubmissionState::AwaitingReply {
            warn!("finish called with no pending exchange; reply dropped");
            return None;
        }
        Some(self.record_reply(result))
    }

    /// Submits `text` and waits for the reply.
    pub async fn submit(&mut self, text: &str) -> Result<Turn, Rejection> {
        let exchange = self.begin(text)?;
        let result = self.gateway.send(&exchange.history, &exchange.text).await;
        Ok(self.record_reply(result))
    }

    fn record_reply(&mut self, result: Result<String, GatewayError>) -> Turn {
        let turn = match result {
            Ok(reply) => Turn::assistant(reply),
            Err(e) => {
                warn!(error = %e, "Model exchange failed, recording fallback reply");
                Turn::assistant(FALLBACK_REPLY)
            }
        };
        self.push(turn.clone());
        self.state = SubmissionState::Idle;
        self.notify(SessionEvent::LoadingChanged(false));
        turn
    }

    fn push(&mut self, turn: Turn) {
        let index = self.conversation.append(turn.clone());
        info!(index, role = ?turn.role(), "Turn appended");
        self.notify(SessionEvent::TurnAppended { index, turn });
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine; nothing is rendering yet.
        let _ = self.events.send(event);
    }
}
