//! GeoMCP Assistent: a chat front end for Norwegian geo- and planning case
//! data, answered by a hosted Gemini model under a fixed system instruction.

pub mod chat;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod session;
pub mod web_server;

pub use config::Settings;
pub use conversation::{Conversation, Role, Turn};
pub use error::{ConfigurationError, GatewayError};
pub use gateway::{ChatModel, ChatRequest, ModelGateway};
pub use gemini::GeminiClient;
pub use session::{Rejection, Session, SessionEvent, SubmissionState};
