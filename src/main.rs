//! hyperatom CLI: drive an atom space through the wire command protocol.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use hyperatom::command::Interpreter;
use hyperatom::command::sexpr::{Cursor, decode_atom, encode_atom};
use hyperatom::config::CoreConfig;
use hyperatom::space::AtomSpace;

#[derive(Parser)]
#[command(name = "hyperatom", version, about = "Hypergraph atom space core")]
struct Cli {
    /// TOML config file (space name, read-only flag, extra types).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret every line of a command file and print the replies.
    Run {
        /// File with one command per line.
        file: PathBuf,
    },

    /// Read commands from stdin until end of input.
    Repl,

    /// List the type hierarchy.
    Types {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Parse one atom expression and print its content hash.
    Hash {
        /// Atom expression, e.g. '(List (Concept "a") (Concept "b"))'.
        expr: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    match cli.command {
        Commands::Run { file } => {
            let handle = std::fs::File::open(&file).into_diagnostic()?;
            let space = config.new_space()?;
            interpret_lines(&space, std::io::BufReader::new(handle))?;
        }

        Commands::Repl => {
            let space = config.new_space()?;
            let stdin = std::io::stdin();
            interpret_lines(&space, stdin.lock())?;
        }

        Commands::Types { json } => {
            let registry = config.type_registry()?;
            let entries = registry.entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries).into_diagnostic()?);
            } else {
                for entry in &entries {
                    println!(
                        "{:>5}  {:<24} {:<18} {}",
                        entry.tag,
                        entry.name,
                        entry.short_name,
                        entry.parents.join(", ")
                    );
                }
                println!("{} types", entries.len());
            }
        }

        Commands::Hash { expr } => {
            let registry = config.type_registry()?;
            let atom = decode_atom(&mut Cursor::new(&expr), &registry)?;
            println!("hash:  {:#018x}", atom.content_hash());
            println!("kind:  {}", if atom.is_link() { "link" } else { "node" });
            println!("form:  {}", encode_atom(&atom, &registry, None));
            print!("{}", atom.to_short_string(&registry, ""));
        }
    }

    Ok(())
}

/// Feed every line to one interpreter, so `define`d frames persist across
/// lines. Failed commands are reported on stderr and do not stop the run.
fn interpret_lines(space: &Arc<AtomSpace>, input: impl BufRead) -> Result<()> {
    let mut interp = Interpreter::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (number, line) in input.lines().enumerate() {
        let line = line.into_diagnostic()?;
        match interp.interpret(space, &line) {
            Ok(reply) => {
                out.write_all(reply.as_bytes()).into_diagnostic()?;
                if !reply.is_empty() && !reply.ends_with('\n') {
                    out.write_all(b"\n").into_diagnostic()?;
                }
                out.flush().into_diagnostic()?;
            }
            Err(err) => {
                tracing::debug!(line = number + 1, "command failed");
                eprintln!("{:?}", miette::Report::new(err));
            }
        }
    }
    Ok(())
}
