//! Interactive chat against the demo dataset.
//!
//! Usage:
//!   tally-chat [--role hq|state:<code>|store:<number>] [--config <file.toml>] [question...]
//!
//! With a question, answers it once and exits. Without one, reads questions
//! from stdin until EOF. `insights` on its own line prints recommendations.
//! Set `OPENAI_API_KEY` or `ANTHROPIC_API_KEY` to use a generative backend;
//! otherwise every answer comes from the fallback composer.

use std::io::BufRead;
use std::sync::Arc;
use tally_assistant::{demo::demo_provider, Assistant, MemorySink, TranscriptForwarder};
use tally_context::KeywordKnowledgeBase;
use tally_core::{AssistantConfig, Role, SystemClock, TallyResult};
use tally_llm::{providers::backend_from_env, GenerativeBackend};
use tracing_subscriber::EnvFilter;

struct Args {
    role: Role,
    config_path: Option<String>,
    question: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut role = Role::Hq;
    let mut config_path = None;
    let mut words = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--role" => {
                let value = args.next().ok_or("--role needs a value")?;
                role = value.parse().map_err(|e| format!("{}", e))?;
            }
            "--config" => {
                config_path = Some(args.next().ok_or("--config needs a path")?);
            }
            _ => words.push(arg),
        }
    }

    Ok(Args {
        role,
        config_path,
        question: (!words.is_empty()).then(|| words.join(" ")),
    })
}

fn load_config(path: Option<&str>) -> TallyResult<AssistantConfig> {
    match path {
        Some(path) => AssistantConfig::from_path(path),
        None => AssistantConfig::from_env(),
    }
}

async fn answer(assistant: &Assistant, session_id: &mut String, line: &str, role: &Role) {
    if line.eq_ignore_ascii_case("insights") {
        for insight in assistant.insights(role) {
            println!("[{:?}/{:?}] {}: {}", insight.priority, insight.kind, insight.title, insight.detail);
        }
        return;
    }
    let reply = assistant.chat(session_id, line, role).await;
    *session_id = reply.session_id.clone();
    println!("{}", reply.answer);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let config = match load_config(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let capacity = config.transcript_queue_capacity;
    let assistant = match Assistant::new(config, Arc::new(demo_provider()), Arc::new(SystemClock)) {
        Ok(assistant) => assistant,
        Err(e) => {
            eprintln!("Failed to start assistant: {}", e);
            std::process::exit(1);
        }
    };

    let (forwarder, transcript) = TranscriptForwarder::spawn(Arc::new(MemorySink::new()), capacity);
    let mut assistant = assistant
        .with_knowledge(Arc::new(KeywordKnowledgeBase::builtin()))
        .with_transcript(forwarder);
    if let Some(backend) = backend_from_env() {
        tracing::info!(backend = backend.backend_name(), "Using generative backend");
        assistant = assistant.with_backend(backend);
    }

    let mut session_id = String::new();
    match args.question {
        Some(question) => answer(&assistant, &mut session_id, &question, &args.role).await,
        None => {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        eprintln!("Failed to read input: {}", e);
                        break;
                    }
                };
                let line = line.trim();
                if !line.is_empty() {
                    answer(&assistant, &mut session_id, line, &args.role).await;
                }
            }
        }
    }

    drop(assistant);
    if let Ok(report) = transcript.await {
        tracing::info!(delivered = report.delivered, failed = report.failed, "Transcript flushed");
    }
}
