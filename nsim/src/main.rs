use anyhow::{Context, Result};
use clap::Parser;
use nsim_core::NamespaceConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

mod command;
mod output;
mod shell;

use output::OutputWriter;
use shell::{RunOptions, Shell};

/// nsim - An in-memory namespace simulator
#[derive(Parser)]
#[command(name = "nsim")]
#[command(about = "Shell over an in-memory tree of directories and files", long_about = None)]
#[command(version)]
struct Cli {
    /// Name of the root directory
    #[arg(long, env = "NSIM_ROOT_NAME", default_value = "root")]
    root_name: String,

    /// Read commands from a file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Print one JSON document per command
    #[arg(long)]
    json: bool,

    /// Echo each command before running it
    #[arg(long)]
    echo: bool,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = NamespaceConfig::with_root_name(&cli.root_name);
    let mut shell = Shell::new(config)
        .with_context(|| format!("Invalid root name: {}", cli.root_name))?;
    let mut output = OutputWriter::stdio(cli.json);

    let result = match cli.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            let options = RunOptions {
                prompt: false,
                echo: cli.echo,
            };
            shell.run(BufReader::new(file), &mut output, options)
        }
        None => {
            let options = RunOptions {
                prompt: atty::is(atty::Stream::Stdin),
                echo: cli.echo,
            };
            shell.run(io::stdin().lock(), &mut output, options)
        }
    };

    tracing::debug!(nodes = shell.namespace().len(), "session ended");
    result
}

/// Log to stderr, filtered by `NSIM_LOG` (default: warnings only).
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("NSIM_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
