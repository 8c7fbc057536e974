//! `chatloom chat` — Interactive or single-message chat mode.

use chatloom_agent::{SessionOptions, UseCase, UseCaseSelector};
use chatloom_config::{AppConfig, McpConfig};
use chatloom_core::message::{Conversation, ConversationId};
use chatloom_core::model::Model;
use chatloom_providers::OpenAiCompatModel;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub async fn run(
    usecase: &str,
    message: Option<String>,
    mcp_config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    let Some(api_key) = config.api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GROQ_API_KEY='gsk_...'      (recommended)");
        eprintln!("    export OPENAI_API_KEY='sk-...'     (for OpenAI direct)");
        eprintln!("    export CHATLOOM_API_KEY='...'      (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  Get a Groq key at: https://console.groq.com/keys");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    let usecase = UseCase::from_str(usecase).map_err(|e| {
        format!(
            "{e}. Supported use cases: {}",
            UseCase::all()
                .iter()
                .map(|u| u.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    let model = build_model(&config.default_provider, api_key)?;
    let memory = chatloom_memory::store_from_config(&config.memory);
    let sink = chatloom_telemetry::sink_from_config(&config.telemetry);

    let selector = UseCaseSelector::new(
        model,
        config.default_model.clone(),
        memory,
        sink,
        config.validation.clone(),
        config.memory.clone(),
    );

    let session_id = ConversationId::new();
    let mut options = SessionOptions::new(session_id.to_string());
    options.max_cycles = config.max_tool_cycles;
    options.tool_timeout_secs = config.tool_timeout_secs;

    // Tool-backed use cases draw their tools from config entries, or from
    // the server catalog when none are configured.
    if usecase != UseCase::BasicChat {
        options = match usecase {
            UseCase::McpChat => options.with_mcp(load_catalog(mcp_config.as_deref())?),
            UseCase::NewsChat => {
                let descriptors = tool_descriptors(&config, mcp_config.as_deref())?
                    .into_iter()
                    .filter(|d| d.name.contains("news") || d.name.contains("search"))
                    .collect();
                options.with_descriptors(descriptors)
            }
            _ => options.with_descriptors(tool_descriptors(&config, mcp_config.as_deref())?),
        };
    }

    let machine = selector.build(usecase, options)?;

    if let Some(msg) = message {
        // Single message mode
        let mut conversation = Conversation::new();

        eprint!("  Thinking...");
        let report = machine.run_turn(&mut conversation, &msg).await?;
        eprint!("\r              \r");
        for warning in &report.warnings {
            eprintln!("  [warning] {warning}");
        }
        println!("{}", report.reply);
    } else {
        interactive(machine, usecase, &config).await?;
    }

    Ok(())
}

fn build_model(
    provider: &str,
    api_key: String,
) -> Result<Arc<dyn Model>, Box<dyn std::error::Error>> {
    match provider {
        "groq" => Ok(Arc::new(OpenAiCompatModel::groq(api_key))),
        "openai" => Ok(Arc::new(OpenAiCompatModel::openai(api_key))),
        "openrouter" => Ok(Arc::new(OpenAiCompatModel::openrouter(api_key))),
        other => Err(format!(
            "Unknown provider '{other}'. Supported: groq, openai, openrouter"
        )
        .into()),
    }
}

fn load_catalog(override_path: Option<&Path>) -> Result<McpConfig, Box<dyn std::error::Error>> {
    let catalog = match override_path {
        Some(path) => McpConfig::load_file(path)?,
        None => McpConfig::load_merged(&McpConfig::user_path(), &McpConfig::workspace_path())?,
    };
    Ok(catalog)
}

fn tool_descriptors(
    config: &AppConfig,
    override_path: Option<&Path>,
) -> Result<Vec<chatloom_core::ToolDescriptor>, Box<dyn std::error::Error>> {
    if !config.tools.is_empty() {
        return Ok(config.tools.iter().map(|t| t.to_descriptor()).collect());
    }
    Ok(load_catalog(override_path)?.to_descriptors())
}

async fn interactive(
    machine: chatloom_agent::StateMachine,
    usecase: UseCase,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::{BufRead, Write};

    // Stream intermediate messages (tool requests and results) as the
    // turn progresses; the final reply is printed from the report.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<chatloom_core::Message>();
    let machine = machine.with_events(tx);
    tokio::spawn(async move {
        use chatloom_core::message::Role;
        while let Some(message) = rx.recv().await {
            match message.role {
                Role::Assistant if message.wants_tools() => {
                    for call in &message.tool_calls {
                        eprintln!("  [calling {} with \"{}\"]", call.name, call.query);
                    }
                }
                Role::Tool => {
                    let preview: String = message.content.chars().take(120).collect();
                    eprintln!("  [tool result] {preview}");
                }
                _ => {}
            }
        }
    });

    println!();
    println!("  Chatloom — Interactive Mode");
    println!();
    println!("  Use case:  {usecase}");
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = std::io::stdin();
    let mut conversation = Conversation::new();

    print!("  You > ");
    std::io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match machine.run_turn(&mut conversation, input).await {
            Ok(report) => {
                eprint!("\r     \r");
                println!();
                for warning in &report.warnings {
                    eprintln!("  [warning] {warning}");
                }
                for line in report.reply.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!("\n  Goodbye!\n");
    Ok(())
}
