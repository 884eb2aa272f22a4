mod command;
mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use trade_core::SimConfig;

use crate::command::parse;
use crate::shell::{Reply, Shell};

/// Interactive shell for the station trade simulation.
#[derive(Debug, Parser)]
#[command(name = "trade-shell", version)]
struct Args {
    /// TOML file with simulation parameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for quoting markups; overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Create the example world before the prompt appears.
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    tracing::info!(?config, "starting shell");

    let shell = Shell::new(config);
    if args.init {
        shell.execute(command::Command::Init)?;
    }

    run(&shell, io::stdin().lock(), io::stdout().lock())
}

fn run(shell: &Shell, input: impl BufRead, mut output: impl Write) -> anyhow::Result<()> {
    write!(output, "> ")?;
    output.flush()?;
    for line in input.lines() {
        let line = line?;
        match parse(&line) {
            Ok(None) => {}
            Ok(Some(command)) => match shell.execute(command)? {
                Reply::Print(text) => writeln!(output, "{text}")?,
                Reply::Exit => return Ok(()),
            },
            Err(err) => writeln!(output, "{err}")?,
        }
        write!(output, "> ")?;
        output.flush()?;
    }
    // End of input behaves like `exit`.
    shell.execute(command::Command::Exit)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_transcript() {
        let shell = Shell::new(SimConfig::default().with_seed(1));
        let input = "help\nbogus\nadd station --name \"Pallas\"\nlist stations\nexit\nlist stations\n";
        let mut output = Vec::new();
        run(&shell, input.as_bytes(), &mut output).unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("init"));
        assert!(transcript.contains("Unknown command"));
        assert!(transcript.contains("\"name\": \"Pallas\""));
        // Nothing after `exit` runs.
        assert_eq!(transcript.matches("Pallas").count(), 2);
    }
}
