// Line-oriented terminal chat. Same session semantics as the web page.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::info;

use crate::constants;
use crate::conversation::{Role, Turn};
use crate::gateway::{ChatModel, ModelGateway};
use crate::session::{Session, SessionEvent};

const EXIT_COMMAND: &str = "/exit";

fn render_turn(turn: &Turn) -> String {
    let label = match turn.role() {
        Role::User => "Du",
        Role::Assistant => "Assistent",
    };
    format!("{}: {}\n\n", label, turn.text())
}

async fn drain_events<W>(events: &mut broadcast::Receiver<SessionEvent>, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(event) = events.try_recv() {
        match event {
            // The user just typed their own line; only echo replies.
            SessionEvent::TurnAppended { turn, .. } if turn.role() == Role::Assistant => {
                output.write_all(render_turn(&turn).as_bytes()).await?;
            }
            SessionEvent::LoadingChanged(true) => {
                output
                    .write_all(format!("{}\n", constants::LOADING_TEXT).as_bytes())
                    .await?;
            }
            _ => {}
        }
        output.flush().await?;
    }
    Ok(())
}

/// Reads prompts line by line until EOF or `/exit`, printing each reply.
pub async fn run_chat<M, R, W>(gateway: Arc<ModelGateway<M>>, input: R, mut output: W) -> Result<()>
where
    M: ChatModel,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Starting terminal chat session...");
    let mut session = Session::new(gateway);
    let mut events = session.subscribe();

    let banner = format!(
        "{} - {}\n{}\nMerk: {}\n\n",
        constants::APP_TITLE,
        constants::APP_SUBTITLE,
        constants::WELCOME_TEXT,
        constants::DISCLAIMER
    );
    output.write_all(banner.as_bytes()).await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim() == EXIT_COMMAND {
            break;
        }
        // Blank lines are rejected by the session and simply ignored here.
        let Ok(exchange) = session.begin(&line) else {
            continue;
        };
        // Loading line goes out before the request is in flight.
        drain_events(&mut events, &mut output).await?;

        let result = session.gateway().send(&exchange.history, &exchange.text).await;
        session.finish(result);
        drain_events(&mut events, &mut output).await?;
    }

    info!(turns = session.turns().len(), "Chat session finished");
    Ok(())
}
