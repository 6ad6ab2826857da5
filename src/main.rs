use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rfpbot::utils::{ensure_parent_directory, mask_credential};
use rfpbot::{
    API_KEY_STORAGE_KEY, ApiClientBuilder, AnswerView, BatchPreview, ClientError, Dispatch,
    FailureKind, InteractionController, LocalStorage, SpreadsheetFile,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// rfpbot - answer RFP questions from the command line
#[derive(Parser)]
#[command(name = "rfpbot")]
#[command(about = "Ask an RFP answering service single questions or whole spreadsheets")]
#[command(version)]
struct Cli {
    /// Base URL of the answering service (overrides RFPBOT_HOST)
    #[arg(long, global = true, value_name = "URL")]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask(AskCommand),
    /// Upload a spreadsheet of questions and save the answers
    Batch(BatchCommand),
    /// Manage the stored API key
    #[command(subcommand)]
    Key(KeyCommand),
}

/// Ask a single question
#[derive(Parser)]
struct AskCommand {
    /// The question to ask
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Number of passages to retrieve (overrides RFPBOT_TOP_K)
    #[arg(long, value_name = "N")]
    top_k: Option<usize>,

    /// API key to use instead of the stored one
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
}

/// Upload a spreadsheet of questions
#[derive(Parser)]
struct BatchCommand {
    /// Spreadsheet with one question per row
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Where to write the answers (defaults to the export's own file name)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of answered rows to print
    #[arg(long, value_name = "N", default_value_t = 3)]
    preview: usize,

    /// API key to use instead of the stored one
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
}

/// Manage the stored API key
#[derive(Subcommand)]
enum KeyCommand {
    /// Store an API key for later runs
    Set {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Show the stored API key, masked
    Show,
    /// Remove the stored API key
    Clear,
}

/// A workflow that ended in the `Error` phase.
#[derive(Debug, Error)]
#[error("{message}")]
struct WorkflowError {
    kind: FailureKind,
    message: String,
}

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Ask(cmd) => handle_ask(cmd, cli.host.as_deref()),
        Commands::Batch(cmd) => handle_batch(cmd, cli.host.as_deref()),
        Commands::Key(cmd) => handle_key(cmd),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Installs the stderr log subscriber, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are a missing API key, an empty question, or a missing file.
/// Service, network and I/O failures are internal errors.
fn is_user_error(error: &anyhow::Error) -> bool {
    let kind = error.chain().find_map(|cause| {
        cause
            .downcast_ref::<WorkflowError>()
            .map(|e| e.kind)
            .or_else(|| cause.downcast_ref::<ClientError>().map(ClientError::kind))
    });
    matches!(
        kind,
        Some(FailureKind::InvalidCredential | FailureKind::InvalidInput)
    )
}

/// Handles the ask command by sending one question and printing the answer.
fn handle_ask(cmd: &AskCommand, host: Option<&str>) -> Result<()> {
    let credential = resolve_api_key(cmd.api_key.as_deref(), env_api_key(), open_storage)?;

    let mut builder = client_builder(host);
    if let Some(top_k) = cmd.top_k {
        builder = builder.top_k(top_k);
    }
    let controller = InteractionController::new(Arc::new(builder.build()?));

    let view = into_result(controller.ask(&cmd.question, &credential))?;
    println!("{}", render_answer(&view));
    Ok(())
}

/// Handles the batch command: upload, print a preview, and save the export.
fn handle_batch(cmd: &BatchCommand, host: Option<&str>) -> Result<()> {
    let credential = resolve_api_key(cmd.api_key.as_deref(), env_api_key(), open_storage)?;

    let file = SpreadsheetFile::from_path(&cmd.file).map_err(|e| {
        ClientError::InvalidInput(format!("Cannot read {}: {e}", cmd.file.display()))
    })?;

    let controller = InteractionController::new(Arc::new(client_builder(host).build()?));
    into_result(controller.process_batch(Some(&file), &credential))?;

    if let Some(status) = controller.batch_status() {
        println!("{status}");
    }
    if cmd.preview > 0
        && let Some(preview) = controller.preview(cmd.preview)
    {
        print!("{}", render_preview(&preview));
    }

    let export = controller.export().context("Failed to export results")?;
    let output = cmd
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&export.file_name));
    write_export(&output, &export.bytes)?;
    println!("Saved results to {}", output.display());

    Ok(())
}

/// Handles the key subcommands against local storage.
fn handle_key(cmd: &KeyCommand) -> Result<()> {
    let storage = open_storage()?;

    match cmd {
        KeyCommand::Set { key } => {
            let key = rfpbot::api::validate_credential(key)?;
            storage
                .set(API_KEY_STORAGE_KEY, key)
                .context("Failed to store API key")?;
            println!("API key saved to {}", storage.path().display());
        }
        KeyCommand::Show => match storage.get(API_KEY_STORAGE_KEY)? {
            Some(key) => println!("{}", mask_credential(&key)),
            None => println!("No API key stored"),
        },
        KeyCommand::Clear => {
            if storage.remove(API_KEY_STORAGE_KEY)? {
                println!("API key removed");
            } else {
                println!("No API key stored");
            }
        }
    }
    Ok(())
}

fn client_builder(host: Option<&str>) -> ApiClientBuilder {
    match host {
        Some(host) => ApiClientBuilder::new().base_url(host),
        None => ApiClientBuilder::new(),
    }
}

fn open_storage() -> Result<LocalStorage> {
    LocalStorage::open_default().context("Failed to open local storage")
}

fn env_api_key() -> Option<String> {
    std::env::var("RFPBOT_API_KEY").ok()
}

/// Picks the API key: the command-line flag, then `RFPBOT_API_KEY`, then the
/// stored key.
///
/// Blank values fall through to the next source. When none has a key, an
/// empty string is returned and the request is rejected as missing a key.
fn resolve_api_key(
    flag: Option<&str>,
    env: Option<String>,
    storage: impl FnOnce() -> Result<LocalStorage>,
) -> Result<String> {
    if let Some(key) = flag.filter(|key| !key.trim().is_empty()) {
        return Ok(key.to_string());
    }
    if let Some(key) = env.filter(|key| !key.trim().is_empty()) {
        return Ok(key);
    }
    let stored = storage()?
        .get(API_KEY_STORAGE_KEY)
        .context("Failed to read stored API key")?;
    Ok(stored.unwrap_or_default())
}

fn into_result<T>(dispatch: Dispatch<T>) -> Result<T> {
    match dispatch {
        Dispatch::Succeeded(value) => Ok(value),
        Dispatch::Failed { kind, message } => Err(WorkflowError { kind, message }.into()),
        Dispatch::AlreadyLoading => anyhow::bail!("A request is already in progress"),
    }
}

/// Formats an answer followed by its numbered references.
fn render_answer(view: &AnswerView) -> String {
    let mut out = view.answer.clone();
    if !view.references.is_empty() {
        out.push_str("\n\nReferences:");
        for (i, reference) in view.references.iter().enumerate() {
            out.push_str(&format!("\n{}. {reference}", i + 1));
        }
    }
    out
}

/// Formats preview rows, noting how many rows were left out.
fn render_preview(preview: &BatchPreview) -> String {
    let mut out = String::new();
    for row in &preview.rows {
        out.push_str(&format!("\nQ: {}\nA: {}\n", row.question, row.answer));
        if !row.references.is_empty() {
            out.push_str(&format!("References: {}\n", row.references.join("; ")));
        }
    }
    if preview.remaining > 0 {
        out.push_str(&format!(
            "\n...and {} more results. Download the CSV to see all results.\n",
            preview.remaining
        ));
    }
    out
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_directory(path)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write results to {}", path.display()))
}
