use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watch a command file and turn free-text commands into file operations.
///
/// Recognised commands (the whole file is one command):
///   create a file <path>
///   delete the file <path>
///   rename the file <source> to <destination>
///   add to the file <path> this content: <content>
#[derive(Parser, Debug)]
#[command(
    name = "file-commander",
    version,
    about,
    long_about = None,
    propagate_version = true,
    verbatim_doc_comment,
)]
pub struct Cli {
    /// Log debug output, including ignored watcher events.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the command file and dispatch its content on every change.
    ///
    /// Runs until interrupted with Ctrl-C.
    Watch {
        /// Directory holding `file-commander.toml` and, by default, `command.txt`.
        /// Defaults to the directory containing this executable.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Command file to watch (relative to the root unless absolute).
        #[arg(long)]
        command_file: Option<PathBuf>,

        /// Coalesce change events arriving within this many milliseconds.
        /// Without it every change event is dispatched.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Dispatch a single command once, without watching.
    ///
    /// Exits non-zero if the operation failed or the command was not recognised.
    Exec {
        /// Command words, joined with single spaces (e.g. `create a file notes.txt`).
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        words: Vec<String>,
    },
}
