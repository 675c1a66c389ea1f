//! Application entry point: an interactive emotion-aware chat on stdin.
//!
//! # Startup sequence
//!
//! 1. Parse command-line flags and initialise logging.
//! 2. Load [`AppConfig`] (defaults on first run) and validate it.
//! 3. Build collaborators: chat client, responder, Whisper recogniser and
//!    the optional audio emotion model.
//! 4. Spawn the [`SessionRunner`] on the tokio runtime.
//! 5. Read commands from stdin until EOF or `/quit`.
//!
//! # Commands
//!
//! ```text
//! /persona <id>   open or switch to a persona's chat
//! /audio <path>   send a WAV recording
//! /stats          show conversation statistics
//! /reset          drop everything
//! /leave          leave the current chat
//! /quit           exit
//! anything else   a typed message
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use emotion_chat::{
    config::{AppConfig, AppPaths},
    emotion::{EmotionModel, HttpEmotionModel},
    llm::{ApiChatClient, ChatClient, LlmResponder},
    pipeline::{new_shared_status, AudioInput, SessionEvent, SessionRunner, SessionUpdate},
    session::{Collaborators, ConversationSession},
    stt::{SpeechRecognizer, TranscribeParams, UnavailableRecognizer, WhisperRecognizer},
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "emotion-chat", version, about = "Emotion-aware persona chat")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persona to open on startup.
    #[arg(long)]
    persona: Option<String>,

    /// Whisper GGML model file, overriding `stt.model`.
    #[arg(long)]
    model: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

fn build_collaborators(config: &AppConfig, model_override: Option<PathBuf>) -> Collaborators {
    let chat: Arc<dyn ChatClient> = Arc::new(ApiChatClient::from_config(&config.llm));
    let responder = Arc::new(LlmResponder::new(Arc::clone(&chat), &config.llm));

    let model_path =
        model_override.unwrap_or_else(|| AppPaths::new().model_file(&config.stt.model));
    let params = TranscribeParams {
        use_gpu: config.stt.use_gpu,
        ..TranscribeParams::default()
    };

    // Launch without a model; audio turns then fail with a notice.
    let recognizer: Arc<dyn SpeechRecognizer> = match WhisperRecognizer::load(&model_path, params) {
        Ok(recognizer) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(recognizer)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Audio input is disabled.",
                model_path.display()
            );
            Arc::new(UnavailableRecognizer::new(e.to_string()))
        }
    };

    let emotion_model = config.emotion.classifier_url.as_ref().map(|url| {
        log::info!("Audio emotion model: {url}");
        let model = HttpEmotionModel::new(url.clone(), config.llm.timeout_secs);
        Arc::new(model) as Arc<dyn EmotionModel>
    });

    Collaborators {
        chat,
        responder,
        recognizer,
        emotion_model,
    }
}

// ---------------------------------------------------------------------------
// REPL
// ---------------------------------------------------------------------------

/// Turn one input line into an event; `None` for empty lines and `/quit`.
fn parse_line(line: &str) -> Option<Result<SessionEvent, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Ok(SessionEvent::Text(line.to_string())));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let event = match (name, arg) {
        ("quit" | "exit", _) => return None,
        ("persona", id) if !id.is_empty() => SessionEvent::SelectPersona(id.into()),
        ("audio", path) if !path.is_empty() => {
            SessionEvent::Audio(AudioInput::File(PathBuf::from(path)))
        }
        ("stats", _) => SessionEvent::Stats,
        ("reset", _) => SessionEvent::Reset,
        ("leave", _) => SessionEvent::Leave,
        ("persona" | "audio", _) => return Some(Err(format!("usage: /{name} <argument>"))),
        _ => return Some(Err(format!("unknown command /{name}"))),
    };
    Some(Ok(event))
}

fn print_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Persona {
            persona,
            greeting,
            fresh,
        } => {
            if *fresh {
                println!("── chatting with {persona} ──");
            }
            if let Some(greeting) = greeting {
                println!("{persona}: {greeting}");
            }
        }
        SessionUpdate::Turn(turn) => {
            if let Some(language) = &turn.language {
                println!("you ({language}): {}", turn.user_text);
            }
            println!("[{}] {}", turn.emotion.label, turn.reply);
        }
        SessionUpdate::Duplicate => println!("(already answered)"),
        SessionUpdate::Ignored => {}
        SessionUpdate::Stats(stats) => println!(
            "turns: {}  positive: {}  negative: {}  negative ratio: {:.0}%",
            stats.total,
            stats.positive,
            stats.negative,
            stats.negative_ratio() * 100.0
        ),
        SessionUpdate::Reset => println!("(session reset)"),
        SessionUpdate::Left => println!("(left the conversation)"),
        SessionUpdate::Notice(msg) => println!("! {msg}"),
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("emotion-chat starting up");

    // 2. Configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };
    config.validate().context("invalid configuration")?;

    // 3. Session
    let status = new_shared_status();
    let session = ConversationSession::new(&config, build_collaborators(&config, cli.model))
        .with_status(Arc::clone(&status));

    // 4. Runner
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let (update_tx, mut update_rx) = mpsc::channel::<SessionUpdate>(16);
    let runner = tokio::spawn(SessionRunner::new(session, status).run(event_rx, update_tx));

    let persona = cli
        .persona
        .unwrap_or_else(|| config.session.default_persona.clone());
    event_tx
        .send(SessionEvent::SelectPersona(persona.as_str().into()))
        .await?;
    if let Some(update) = update_rx.recv().await {
        print_update(&update);
    }

    // 5. Input loop; one update per event keeps output in order.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match parse_line(&line) {
            Some(Ok(event)) => event,
            Some(Err(usage)) => {
                println!("! {usage}");
                continue;
            }
            None if line.trim().is_empty() => continue,
            None => break,
        };
        if event_tx.send(event).await.is_err() {
            break;
        }
        match update_rx.recv().await {
            Some(update) => print_update(&update),
            None => break,
        }
    }

    drop(event_tx);
    runner.await.context("session runner panicked")?;
    log::info!("emotion-chat shutting down");
    Ok(())
}
