//! CLI command implementations
//!
//! Each invocation opens the configured queue, runs one command and
//! closes it again. Reads start from the first index because every
//! process gets fresh cursors.
//!
//! The CLI never takes part in replication: it builds its view in an
//! empty environment.

use std::path::Path;

use serde_json::Value;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response, write_text};
use crate::observability::{Logger, Severity};
use crate::queue::{Excerpt, JsonCodec, QueueContext, QueueView};
use crate::replication::Environment;

/// Queue view used by the CLI: string topics, JSON messages
pub type CliView = QueueView<String, Value>;

/// What a command prints
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(Value),
    Text(String),
}

/// Parse arguments, run the command and print the result.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    if !cli.verbose {
        Logger::set_min_severity(Severity::Warn);
    }

    match run_command(cli.command) {
        Ok(Output::Json(data)) => write_response(data),
        Ok(Output::Text(text)) => write_text(&text),
        Err(e) => {
            let _ = write_error(e.code_str(), e.message());
            Err(e)
        }
    }
}

/// Run one command against the queue named in its config file.
pub fn run_command(command: Command) -> CliResult<Output> {
    let context = load_context(command.config())?;
    let view = open_view(context)?;
    let result = execute(&view, command);
    view.close()?;
    result
}

/// Load and validate the queue configuration.
pub fn load_context(path: &Path) -> CliResult<QueueContext> {
    if !path.exists() {
        return Err(CliError::config_error(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    Ok(QueueContext::load(path)?)
}

pub fn open_view(context: QueueContext) -> CliResult<CliView> {
    Ok(QueueView::open(
        context,
        &Environment::new(),
        JsonCodec::new(),
    )?)
}

/// Run `command` against an open view.
pub fn execute(view: &CliView, command: Command) -> CliResult<Output> {
    match command {
        Command::Publish { topic, message, .. } => publish(view, &topic, &message).map(Output::Json),
        Command::Set { message, .. } => set(view, &message).map(Output::Json),
        Command::Get { index, .. } => get(view, index).map(Output::Json),
        Command::Scan { topic, all, .. } => scan(view, &topic, all).map(Output::Json),
        Command::Next { limit, .. } => next(view, limit).map(Output::Json),
        Command::Dump { .. } => dump(view).map(Output::Text),
        Command::Clear { .. } => clear(view).map(Output::Json),
        Command::Info { .. } => info(view).map(Output::Json),
    }
}

pub fn publish(view: &CliView, topic: &str, message: &str) -> CliResult<Value> {
    let message = parse_message(message)?;
    let index = view.publish_and_index(&topic.to_string(), &message)?;
    Ok(serde_json::json!({ "index": index }))
}

pub fn set(view: &CliView, message: &str) -> CliResult<Value> {
    let message = parse_message(message)?;
    let index = view.set(&message)?;
    Ok(serde_json::json!({ "index": index }))
}

/// Record at `index`, or `null`.
pub fn get(view: &CliView, index: u64) -> CliResult<Value> {
    match view.get(index)? {
        Some(excerpt) => excerpt_json(&excerpt),
        None => Ok(Value::Null),
    }
}

/// First match on `topic`, or every match with `all`.
pub fn scan(view: &CliView, topic: &str, all: bool) -> CliResult<Value> {
    view.rewind()?;
    let topic = topic.to_string();
    let mut matches = Vec::new();
    while let Some(excerpt) = view.get_topic(&topic)? {
        matches.push(excerpt_json(&excerpt)?);
        if !all {
            break;
        }
    }
    Ok(serde_json::json!({ "matches": matches }))
}

/// Up to `limit` records from the first index.
pub fn next(view: &CliView, limit: usize) -> CliResult<Value> {
    view.rewind()?;
    let mut records = Vec::new();
    while records.len() < limit {
        match view.next()? {
            Some(excerpt) => records.push(excerpt_json(&excerpt)?),
            None => break,
        }
    }
    Ok(serde_json::json!({ "records": records }))
}

pub fn dump(view: &CliView) -> CliResult<String> {
    Ok(view.dump()?)
}

pub fn clear(view: &CliView) -> CliResult<Value> {
    view.clear()?;
    Ok(serde_json::json!({ "cleared": true }))
}

pub fn info(view: &CliView) -> CliResult<Value> {
    let context = view.context();
    Ok(serde_json::json!({
        "name": context.name,
        "full_name": view.full_name(),
        "role": view.role().name(),
        "queue_dir": context.queue_dir(None).display().to_string(),
        "first_index": view.first_index(),
        "last_index": view.last_index(),
    }))
}

fn parse_message(message: &str) -> CliResult<Value> {
    serde_json::from_str(message)
        .map_err(|e| CliError::invalid_argument(format!("message is not valid JSON: {}", e)))
}

fn excerpt_json(excerpt: &Excerpt<String, Value>) -> CliResult<Value> {
    Ok(serde_json::to_value(excerpt)?)
}
