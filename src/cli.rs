use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::engine::{KeySource, StdinKeys, TerminalKeys};
use crate::model::Policy;
use crate::registry::{RUBYGEMS_URL, RubygemsRegistry};
use crate::resolver::PinnedResolver;
use crate::update::{self, UpdateOptions};
use crate::workspace::Workspace;

#[derive(Parser)]
#[command(name = "gemup")]
#[command(about = "Interactively update Gemfile dependencies", long_about = None)]
struct Cli {
    /// Allow updates beyond the constraints declared in the Gemfile
    /// (rewrites the affected Gemfile lines)
    #[arg(long)]
    latest: bool,

    /// Path to the Gemfile (defaults to searching upward from the current
    /// directory)
    #[arg(long, value_name = "PATH")]
    gemfile: Option<PathBuf>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let ws = match &cli.gemfile {
        Some(path) => Workspace::at_gemfile(path)?,
        None => Workspace::discover(&std::env::current_dir().context("get current dir")?)?,
    };

    let policy = if cli.latest {
        Policy::Latest
    } else {
        Policy::Constrained
    };

    let registry = RubygemsRegistry::new(RUBYGEMS_URL)?;
    let resolver = PinnedResolver;

    // Piped stdin (the scripted case) reads key bytes directly; a real
    // terminal gets raw mode for the selection phase only. In-place redraw
    // and color only make sense on a terminal.
    let mut keys: Box<dyn KeySource> = if std::io::stdin().is_terminal() {
        Box::new(TerminalKeys::new())
    } else {
        Box::new(StdinKeys::new(std::io::stdin()))
    };
    let interactive = std::io::stdout().is_terminal();

    let opts = UpdateOptions {
        policy,
        color: interactive,
        in_place: interactive,
    };

    let stdout = std::io::stdout();
    let mut out: Box<dyn Write> = Box::new(stdout.lock());
    update::run_update(&ws, opts, &registry, &resolver, keys.as_mut(), out.as_mut())
}
