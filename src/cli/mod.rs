//! CLI module for queueview
//!
//! Operates a file-backed queue from the command line:
//! - publish / set: append a JSON message
//! - get / scan / next: read records
//! - dump / clear / info: inspect and manage the log

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    clear, dump, execute, get, info, load_context, next, open_view, publish, run, run_command,
    scan, set, CliView, Output,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{render_error, render_response, write_error, write_response, write_text};
