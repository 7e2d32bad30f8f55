use anyhow::{Context, Result};
use clap::Parser;
use deep_talk_client::{
    create_router, AppState, ChatSession, Config, SessionConfig, WebSocketConnector,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TranscriptPrinter;

/// Terminal client for a real-time voice/text assistant
#[derive(Debug, Parser)]
#[command(name = "deep-talk", version)]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/deep-talk")]
    config: String,

    /// Assistant endpoint, overriding the config file
    #[arg(long)]
    url: Option<String>,

    /// Serve the HTTP control API instead of the terminal chat
    #[arg(long)]
    serve: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(url) = args.url {
        cfg.server.url = url;
    }

    info!("Deep Talk client v{}", env!("CARGO_PKG_VERSION"));
    info!("Assistant endpoint: {}", cfg.server.url);

    let session = ChatSession::spawn(
        SessionConfig::from(&cfg),
        Arc::new(WebSocketConnector::new()),
    );
    session.connect().await?;

    let result = if args.serve {
        serve(&cfg, session.clone()).await
    } else {
        chat(session.clone()).await
    };

    let stats = session.shutdown().await?;
    info!(
        "Session ended after {:.1}s: {} messages, {} frames ({} dropped)",
        stats.duration_secs, stats.messages_count, stats.frames_received, stats.frames_dropped
    );

    result
}

async fn serve(cfg: &Config, session: ChatSession) -> Result<()> {
    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTTP API on {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, create_router(AppState::new(session)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

const HELP: &str = "Type a message and press Enter. Commands: /listen /stop /connect /disconnect /quit";

async fn chat(session: ChatSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut log_rx = session.subscribe_messages();
    let mut state_rx = session.subscribe_state();
    let mut printer = TranscriptPrinter::default();
    let mut stdout = tokio::io::stdout();

    println!("{}", HELP);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let result = match line.trim() {
                    "" => continue,
                    "/quit" => break,
                    "/help" => {
                        println!("{}", HELP);
                        continue;
                    }
                    "/listen" => session.start_listening().await,
                    "/stop" => session.stop_listening().await,
                    "/connect" => session.connect().await,
                    "/disconnect" => session.disconnect().await,
                    _ => session.send_text(line.clone()).await,
                };
                if let Err(e) = result {
                    warn!("{}", e);
                }
            }
            changed = log_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let out = {
                    let log = log_rx.borrow_and_update();
                    printer.render(&log)
                };
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                println!("* {}", state);
            }
        }
    }

    Ok(())
}
