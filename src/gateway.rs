//! Mediates every request to the remote model.
//!
//! The gateway keeps no conversation state of its own. Each call carries the
//! full prior transcript owned by the session, so the model always sees exactly
//! what the user sees.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::conversation::Turn;
use crate::error::{ConfigurationError, GatewayError};

/// One request to the model: instruction, prior turns, and the new user text.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub instruction: &'a str,
    pub history: &'a [Turn],
    pub text: &'a str,
}

/// A backend able to produce a complete textual reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, request: &ChatRequest<'_>) -> Result<String, GatewayError>;
}

pub struct ModelGateway<M> {
    model: M,
    instruction: OnceLock<String>,
}

impl<M: ChatModel> ModelGateway<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            instruction: OnceLock::new(),
        }
    }

    /// Binds the system instruction. Repeating the call with the same text is
    /// a no-op; a different text is rejected.
    pub fn initialize(&self, instruction: impl Into<String>) -> Result<(), ConfigurationError> {
        let instruction = instruction.into();
        let bound = self.instruction.get_or_init(|| instruction.clone());
        if *bound == instruction {
            Ok(())
        } else {
            Err(ConfigurationError::AlreadyInitialized)
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.instruction.get().is_some()
    }

    /// Forwards `text` as the next user turn after `history` and waits for the
    /// complete reply.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn send(&self, history: &[Turn], text: &str) -> Result<String, GatewayError> {
        let instruction = self
            .instruction
            .get()
            .ok_or(ConfigurationError::NotInitialized)?;

        let request = ChatRequest {
            instruction,
            history,
            text,
        };
        let reply = self.model.generate(&request).await?;
        if reply.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        debug!(chars = reply.len(), "Received model reply");
        Ok(reply)
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}
