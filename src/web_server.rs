use std::{fmt::Display, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    serve, Router,
};
use futures::{
    future::{BoxFuture, OptionFuture},
    sink::{Sink, SinkExt},
    stream::{Stream, StreamExt},
};
use minijinja::{path_loader, Environment};
use minijinja_autoreload::AutoReloader;
use serde::{Deserialize, Serialize};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::constants;
use crate::conversation::Role;
use crate::error::GatewayError;
use crate::gateway::{ChatModel, ModelGateway};
use crate::session::{Rejection, Session, SessionEvent};

/// Messages a page sends over the WebSocket.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Submit { text: String },
}

/// Messages pushed to the page.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ready,
    Turn { index: usize, role: Role, text: String },
    Loading { active: bool },
    Rejected { reason: String },
    Error { message: String },
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::TurnAppended { index, turn } => ServerMessage::Turn {
                index,
                role: turn.role(),
                text: turn.text().to_string(),
            },
            SessionEvent::LoadingChanged(active) => ServerMessage::Loading { active },
        }
    }
}

impl From<Rejection> for ServerMessage {
    fn from(rejection: Rejection) -> Self {
        let reason = match rejection {
            Rejection::Empty => "empty",
            Rejection::Busy => "busy",
        };
        ServerMessage::Rejected {
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WebServerOptions {
    pub port: u16,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
}

// Shared application state
pub struct AppState<M> {
    templates: Arc<AutoReloader>,
    gateway: Arc<ModelGateway<M>>,
}

impl<M> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            templates: Arc::clone(&self.templates),
            gateway: Arc::clone(&self.gateway),
        }
    }
}

impl<M: ChatModel + 'static> AppState<M> {
    pub fn new(templates_dir: PathBuf, gateway: Arc<ModelGateway<M>>) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir)),
            gateway,
        }
    }
}

// Minijinja Environment setup
fn create_minijinja_env(templates_dir: PathBuf) -> AutoReloader {
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(&templates_dir));
        notifier.watch_path(&templates_dir, true);
        Ok(env)
    })
}

async fn index_handler<M>(
    State(state): State<AppState<M>>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    state
        .templates
        .acquire_env()
        .and_then(|env| {
            env.get_template("index.html").and_then(|tmpl| {
                tmpl.render(minijinja::context! {
                    title => constants::APP_TITLE,
                    subtitle => constants::APP_SUBTITLE,
                    welcome_heading => constants::WELCOME_HEADING,
                    welcome_text => constants::WELCOME_TEXT,
                    disclaimer => constants::DISCLAIMER,
                    placeholder => constants::INPUT_PLACEHOLDER,
                    loading_text => constants::LOADING_TEXT,
                })
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
        })
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn ws_handler<M: ChatModel + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<M>>,
) -> impl IntoResponse {
    info!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway))
}

async fn handle_socket<M: ChatModel + 'static>(socket: WebSocket, gateway: Arc<ModelGateway<M>>) {
    info!("New WebSocket connection established");
    let (sender, receiver) = socket.split();
    drive_connection(receiver, sender, gateway).await;
    info!("WebSocket connection closed");
}

async fn send_message<K>(outgoing: &mut K, msg: &ServerMessage) -> bool
where
    K: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => outgoing.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Runs one page's session until the client goes away.
///
/// A fresh [`Session`] is created per connection, so a page reload starts a
/// new transcript. At most one reply is pending at a time; submissions that
/// arrive meanwhile are answered with `rejected: busy`.
pub async fn drive_connection<M, S, K, E>(mut incoming: S, mut outgoing: K, gateway: Arc<ModelGateway<M>>)
where
    M: ChatModel + 'static,
    S: Stream<Item = Result<Message, E>> + Unpin,
    K: Sink<Message> + Unpin,
    E: Display,
{
    let mut session = Session::new(gateway);
    let mut events = session.subscribe();
    let mut pending: Option<BoxFuture<'static, Result<String, GatewayError>>> = None;

    if !send_message(&mut outgoing, &ServerMessage::Ready).await {
        warn!("Failed to send ready message to new WebSocket client");
        return;
    }

    loop {
        tokio::select! {
            biased;

            // Session changed; render it on the page
            Ok(event) = events.recv() => {
                if !send_message(&mut outgoing, &ServerMessage::from(event)).await {
                    warn!("WebSocket client disconnected or send error. Closing connection.");
                    break;
                }
            }

            // The pending reply resolved
            Some(result) = OptionFuture::from(pending.as_mut()) => {
                pending = None;
                session.finish(result);
            }

            // Message received from the client
            msg = incoming.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let submitted = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Submit { text }) => text,
                            Err(e) => {
                                warn!("Unrecognized client message: {}", e);
                                let reply = ServerMessage::Error { message: "unrecognized message".to_string() };
                                if !send_message(&mut outgoing, &reply).await {
                                    break;
                                }
                                continue;
                            }
                        };
                        match session.begin(&submitted) {
                            Ok(exchange) => {
                                let gateway = session.gateway();
                                pending = Some(Box::pin(async move {
                                    gateway.send(&exchange.history, &exchange.text).await
                                }));
                            }
                            Err(rejection) => {
                                debug!(%rejection, "Submission rejected");
                                if !send_message(&mut outgoing, &ServerMessage::from(rejection)).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the WebSocket");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and ping/pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}

pub fn router<M: ChatModel + 'static>(state: AppState<M>, static_dir: PathBuf) -> Router {
    // Serve static files from the configured directory
    let static_files_service =
        ServeDir::new(static_dir).not_found_service(tower::service_fn(|_req: axum::extract::Request| async {
            let mut response = hyper::Response::new(Body::from("Not Found"));
            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
            Ok::<_, std::convert::Infallible>(response)
        }));

    Router::new()
        .route("/", get(index_handler::<M>))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler::<M>))
        .nest_service("/static", static_files_service)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<M: ChatModel + 'static>(
    options: WebServerOptions,
    gateway: Arc<ModelGateway<M>>,
) -> Result<()> {
    let state = AppState::new(options.templates_dir.clone(), gateway);
    let app = router(state, options.static_dir.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
