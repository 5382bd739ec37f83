use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{ensure, Context};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use tool_call_bridge::{
    config::BridgeConfig,
    logging::{self, LoggingConfig},
    protocols::chat::Tool,
    tool_parser::{
        EditCoordinator, FencedStreamParser, ResponseAssembler, StreamSession, ToolSchemas,
    },
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tool-call-bridge")]
#[command(about = "Recover OpenAI-style tool calls from tagged or fenced model output")]
struct CliArgs {
    /// JSON config file
    #[arg(long, env = "TOOL_CALL_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit logs as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a complete response (Qwen Coder XML tool calls)
    Translate {
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Tool schemas: a name -> schema object, or an array of tool declarations
        #[arg(long)]
        schemas: Option<PathBuf>,
    },
    /// Replay a response as a stream of chunks (fenced tool blocks)
    Stream {
        /// Input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Tool schemas: a name -> schema object, or an array of tool declarations
        #[arg(long)]
        schemas: Option<PathBuf>,

        /// Characters per replayed chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,

        /// Consume each emitted edit right away so later edits are not deferred
        #[arg(long, action = ArgAction::SetTrue)]
        apply_edits: bool,
    },
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_schemas(path: Option<&Path>) -> anyhow::Result<ToolSchemas> {
    let Some(path) = path else {
        return Ok(ToolSchemas::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).context("Schema file is not valid JSON")?;
    match value {
        Value::Array(_) => {
            let tools: Vec<Tool> =
                serde_json::from_value(value).context("Invalid tool declarations")?;
            Ok(ToolSchemas::from_tools(&tools))
        }
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => anyhow::bail!("Schema file must hold an object or an array"),
    }
}

fn chunk_chars(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn print_json<T: serde::Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn run_stream(
    config: &BridgeConfig,
    text: &str,
    schemas: ToolSchemas,
    chunk_size: usize,
    apply_edits: bool,
) -> anyhow::Result<()> {
    ensure!(chunk_size > 0, "--chunk-size must be at least 1");

    let coordinator = Arc::new(EditCoordinator::new());
    let parser = FencedStreamParser::with_config(&config.parser, Arc::clone(&coordinator))
        .with_schemas(Arc::new(schemas));
    let mut session = StreamSession::new(parser);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Stand-in for the external edit applier
    let drain = |coordinator: &EditCoordinator| {
        if apply_edits {
            while let Some(payload) = coordinator.dequeue() {
                info!(bytes = payload.len(), "Applied edit payload");
            }
            coordinator.clear_in_flight();
        }
    };

    for chunk in chunk_chars(text, chunk_size) {
        if let Some(delta) = session.push(&chunk) {
            print_json(&mut out, &delta)?;
        }
        drain(&coordinator);
    }

    if apply_edits {
        loop {
            let deltas = session.flush();
            if deltas.is_empty() {
                break;
            }
            for delta in &deltas {
                print_json(&mut out, delta)?;
            }
            drain(&coordinator);
        }
    }
    for delta in session.finish() {
        print_json(&mut out, &delta)?;
    }

    if coordinator.is_in_flight() || coordinator.pending_len() > 0 {
        warn!(
            pending = coordinator.pending_len(),
            "Edit slot still held at end of stream; later edit calls were deferred"
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_json_file(path)?,
        None => BridgeConfig::default(),
    };
    if args.log_level.is_some() {
        config.log_level = args.log_level.clone();
    }
    if args.log_dir.is_some() {
        config.log_dir = args.log_dir.clone();
    }
    config.log_json |= args.log_json;
    config.validate()?;

    let _log_guard = logging::init_logging(LoggingConfig::from_bridge_config(&config));

    match args.command {
        Command::Translate { input, schemas } => {
            let text = read_input(input.as_deref())?;
            let assembler = ResponseAssembler::new(&config.parser)
                .with_schemas(load_schemas(schemas.as_deref())?);
            let result = assembler.translate(&text);
            info!(tool_calls = result.tool_calls.len(), "Translated response");
            let stdout = io::stdout();
            print_json(&mut stdout.lock(), &result)?;
        }
        Command::Stream {
            input,
            schemas,
            chunk_size,
            apply_edits,
        } => {
            let text = read_input(input.as_deref())?;
            let schemas = load_schemas(schemas.as_deref())?;
            run_stream(&config, &text, schemas, chunk_size, apply_edits)?;
        }
    }

    Ok(())
}
