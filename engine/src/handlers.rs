//! Command handlers
//!
//! Each handler runs one CLI command against a loaded [`Config`]. Errors are
//! scrubbed of key material before they leave this module.

use anyhow::Result;
use sdk::errors::{CodifyError, CodifyErrorExt};
use sdk::types::{Backend, FeedbackStyle};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::display::TerminalSurface;
use crate::chat::orchestrator::CONFIGURATION_PROMPT;
use crate::chat::{
    ChatOrchestrator, DisplaySurface, EventLog, FeedbackInput, FeedbackOutcome, SessionContext,
    SubmitOutcome,
};
use crate::config::Config;
use crate::llm::gemini::GeminiProvider;
use crate::llm::mistral::MistralProvider;
use crate::llm::LLMProvider;
use crate::secrets::{SecretCache, SecretManager, ALL_KEYS, LANGSMITH_API_KEY, SERVICE_NAME};
use crate::ui_server::{self, AppState};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn secret_cache() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(SecretManager::new(SERVICE_NAME))))
}

/// Convert to an anyhow error with key material removed
fn scrubbed(error: CodifyError) -> anyhow::Error {
    let manager = SecretManager::new(SERVICE_NAME);
    anyhow::anyhow!(manager.scrub(&format!("{} ({})", error, error.user_hint())))
}

/// Serve the chat page until Ctrl-C
pub async fn handle_serve(config: &Config, bind: Option<SocketAddr>) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => config.bind_addr().map_err(scrubbed)?,
    };

    let orchestrator = Arc::new(ChatOrchestrator::from_config(config, secret_cache()));
    let state = AppState::new(orchestrator, SessionContext::new(config));

    println!("Codify is running at http://{}", addr);
    ui_server::serve(state, addr).await.map_err(scrubbed)
}

/// Ask a single question
///
/// Text output streams the answer as it arrives. JSON output waits for the
/// whole interaction and prints one object.
pub async fn handle_ask(
    config: &Config,
    prompt: &str,
    backend: Option<Backend>,
    format: OutputFormat,
) -> Result<()> {
    let orchestrator = ChatOrchestrator::from_config(config, secret_cache());
    let mut session = SessionContext::new(config);
    let backend = backend.unwrap_or(session.backend);

    match format {
        OutputFormat::Text => {
            let mut surface = TerminalSurface::stdout();
            orchestrator
                .submit(&mut session, prompt, backend, &mut surface)
                .await
                .map_err(scrubbed)?;
        }
        OutputFormat::Json => {
            let mut surface = EventLog::new();
            let outcome = orchestrator
                .submit(&mut session, prompt, backend, &mut surface)
                .await
                .map_err(scrubbed)?;

            let value = match outcome {
                SubmitOutcome::Completed { response, run } => json!({
                    "status": "completed",
                    "backend": backend,
                    "response": response,
                    "run_id": run.as_ref().map(|r| r.run_id),
                    "trace_url": run.and_then(|r| r.trace_url),
                }),
                SubmitOutcome::Rejected(message) => json!({
                    "status": "rejected",
                    "message": message,
                }),
                SubmitOutcome::ConfigurationRequired => json!({
                    "status": "configuration_required",
                    "message": CONFIGURATION_PROMPT,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

const CHAT_HELP: &str = "\
Commands:
  /clear                      Clear message history
  /backend <mistral|gemini>   Switch model backend
  /style [thumbs|faces]       Switch rating scale
  /feedback <score> [comment] Rate the last answer
  /trace                      Show the last trace link
  /quit                       Leave the chat";

/// Interactive terminal chat
pub async fn handle_chat(config: &Config, backend: Option<Backend>) -> Result<()> {
    let orchestrator = ChatOrchestrator::from_config(config, secret_cache());
    let mut session = SessionContext::new(config);
    if let Some(backend) = backend {
        session.backend = backend;
    }

    let mut surface = TerminalSurface::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Codify - Your Coding Partner ({})", session.backend);
    println!("Type /help for commands.");

    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            let (name, rest) = command
                .split_once(char::is_whitespace)
                .map(|(n, r)| (n, r.trim()))
                .unwrap_or((command, ""));

            match name {
                "quit" | "exit" => break,
                "help" => println!("{}", CHAT_HELP),
                "clear" => {
                    orchestrator.clear_history(&mut session);
                    println!("Message history cleared.");
                }
                "backend" => match rest.parse::<Backend>() {
                    Ok(backend) => {
                        session.backend = backend;
                        println!("Using {}.", backend);
                    }
                    Err(e) => surface.warning(&e.to_string()),
                },
                "style" => {
                    let style = if rest.is_empty() {
                        Ok(session.feedback_style.toggled())
                    } else {
                        rest.parse::<FeedbackStyle>()
                    };
                    match style {
                        Ok(style) => {
                            session.feedback_style = style;
                            println!(
                                "Rating with {}: {}",
                                style,
                                crate::chat::feedback::options(style).join(" ")
                            );
                        }
                        Err(e) => surface.warning(&e.to_string()),
                    }
                }
                "feedback" => rate_last_answer(&orchestrator, &mut session, rest, &mut surface).await,
                "trace" => match session.trace_url() {
                    Some(url) => println!("{}", url),
                    None => println!("No trace yet."),
                },
                other => surface.warning(&format!("Unknown command '/{}'", other)),
            }
            continue;
        }

        let backend = session.backend;
        match orchestrator
            .submit(&mut session, line, backend, &mut surface)
            .await
        {
            Ok(SubmitOutcome::Completed { run: Some(_), .. }) => {
                println!(
                    "Rate with /feedback {}",
                    crate::chat::feedback::options(session.feedback_style).join("|")
                );
            }
            Ok(_) => {}
            Err(e) => eprintln!("Error: {}", scrubbed(e)),
        }
    }

    Ok(())
}

async fn rate_last_answer(
    orchestrator: &ChatOrchestrator,
    session: &mut SessionContext,
    args: &str,
    surface: &mut dyn DisplaySurface,
) {
    let (score, comment) = args
        .split_once(char::is_whitespace)
        .map(|(s, c)| (s, c.trim()))
        .unwrap_or((args, ""));

    let Some(run_id) = session.run.as_ref().map(|r| r.run_id) else {
        surface.warning(&CodifyError::NoActiveRun.to_string());
        return;
    };

    let mut input = FeedbackInput::new(score);
    if !comment.is_empty() {
        input = input.with_text(comment);
    }

    match orchestrator
        .submit_feedback(session, run_id, input, surface)
        .await
    {
        Ok(FeedbackOutcome::Recorded(_)) => println!("Thanks for the feedback!"),
        Ok(FeedbackOutcome::Rejected(_)) => {}
        Err(e) => eprintln!("Error: {}", scrubbed(e)),
    }
}

/// Store API keys and pick the default backend
pub async fn handle_setup(config: &Config, config_path: &Path) -> Result<()> {
    use std::io::{self, Write};

    println!("=== Codify Setup ===");
    println!();

    print!("Default backend (mistral, gemini) [{}]: ", config.llm.default_backend);
    io::stdout().flush()?;
    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;
    let backend = match choice.trim() {
        "" => config.llm.default_backend,
        other => other.parse::<Backend>().map_err(scrubbed)?,
    };

    let manager = SecretManager::new(SERVICE_NAME);

    println!();
    println!("Configure API keys (press Enter to keep the current value):");

    for key in ALL_KEYS {
        if manager.has_secret(key) {
            println!("  {} is already configured.", key);
        }
        if let Some(value) = manager.prompt_for_secret(key).map_err(scrubbed)? {
            manager.set_secret(key, &value).map_err(scrubbed)?;
            println!("    Stored in keychain.");
        }
    }

    let mut updated = config.clone();
    updated.llm.default_backend = backend;
    std::fs::write(config_path, updated.to_toml().map_err(scrubbed)?)?;

    println!();
    println!("Configuration saved to {}", config_path.display());
    println!("Run 'codify serve' to open the chat page.");

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml().map_err(scrubbed)?),
    }
    Ok(())
}

/// Print where the configuration is read from
pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json!({ "path": path })),
        OutputFormat::Text => println!("{}", path.display()),
    }
    Ok(())
}

/// Check configuration, keys and the listen address
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid"));

    let secrets = secret_cache();

    if secrets.manager().has_secret(LANGSMITH_API_KEY) {
        checks.push(("LangSmith API key", "Configured"));
    } else {
        checks.push(("LangSmith API key", "Not configured"));
        if config.langsmith.use_demo_key {
            issues.push(format!(
                "No LangSmith key stored. Run 'codify setup' or set {}.",
                SecretManager::env_var_name(LANGSMITH_API_KEY)
            ));
        }
    }

    let providers: [(Backend, Box<dyn LLMProvider>); 2] = [
        (
            Backend::Mistral,
            Box::new(MistralProvider::new(
                config.llm.mistral.clone(),
                Arc::clone(&secrets),
            )),
        ),
        (
            Backend::Gemini,
            Box::new(GeminiProvider::new(
                config.llm.gemini.clone(),
                Arc::clone(&secrets),
            )),
        ),
    ];

    let mut any_backend = false;
    for (backend, provider) in &providers {
        let label = match backend {
            Backend::Mistral => "Mistral API key",
            Backend::Gemini => "Gemini API key",
        };
        if provider.check_health().await {
            any_backend = true;
            checks.push((label, "Configured"));
        } else {
            checks.push((label, "Not configured"));
            if *backend == config.llm.default_backend {
                issues.push(format!(
                    "The default backend '{}' has no API key. Run 'codify setup'.",
                    backend
                ));
            }
        }
    }
    if !any_backend {
        issues.push("No model backend available. Configure at least one API key.".to_string());
    }

    match config.bind_addr() {
        Ok(_) => checks.push(("Listen address", "Valid")),
        Err(e) => {
            checks.push(("Listen address", "Invalid"));
            issues.push(e.to_string());
        }
    }

    match format {
        OutputFormat::Json => {
            let checks: serde_json::Map<String, serde_json::Value> = checks
                .iter()
                .map(|(name, status)| (name.to_string(), json!(status)))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "healthy": issues.is_empty(),
                    "checks": checks,
                    "issues": issues,
                }))?
            );
        }
        OutputFormat::Text => {
            println!("Codify Doctor");
            println!();
            for (name, status) in &checks {
                println!("  {:<20} {}", name, status);
            }
            println!();
            if issues.is_empty() {
                println!("All checks passed.");
            } else {
                println!("Issues found:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
    }

    Ok(())
}
