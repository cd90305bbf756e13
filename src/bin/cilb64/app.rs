use std::path::PathBuf;

use clap::Parser;

/// cilb64 - decode Base64-obfuscated string literals in .NET assemblies
#[derive(Debug, Parser)]
#[command(name = "cilb64", version, about, long_about = None)]
pub struct Cli {
    /// Path to the .NET assembly file.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Emit the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Fail instead of dropping edits the writer cannot express.
    #[arg(long)]
    pub strict: bool,
}
