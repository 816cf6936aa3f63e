use clap::Parser;
use mathmirror::output::{self, Verbosity};
use mathmirror::pipeline::{self, RunOptions};
use mathmirror::{config, typeset::MathMlTypesetter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "render")]
#[command(version, about = "Mirror a site tree, pre-rendering math in HTML files")]
#[command(long_about = "\
Mirror a site tree, pre-rendering math in HTML files

Every file under SRC_DIR is mirrored to the same relative path under
DEST_DIR. HTML files containing TeX math are rewritten with MathML; all
other files are copied byte-for-byte. Files whose content has not changed
since the last run are skipped.

Math recognised in HTML bodies:

  $$ ... $$                      display math (may span lines)
  $ ... $                        inline math (\\$ is a literal dollar)
  <div class=\"math-block\">      whole element is one display expression

Never scanned: <script>, <style>, <code>, <pre>, <textarea>.

The change cache lives at DEST_DIR/.render-cache.json.")]
struct Cli {
    /// Source directory
    src_dir: PathBuf,

    /// Destination directory
    dest_dir: PathBuf,

    /// Ignore the change cache and process every file
    #[arg(long)]
    force: bool,

    /// Only report rendered, copied, and failed files
    #[arg(long)]
    quiet: bool,

    /// Only report failures and the summary
    #[arg(long)]
    quieter: bool,

    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.quieter);
    init_tracing(verbosity);

    let options = RunOptions {
        force: cli.force,
        config: config::load_config(cli.config.as_deref())?,
    };
    let typesetter = MathMlTypesetter::new();

    let report = pipeline::run(
        &cli.src_dir,
        &cli.dest_dir,
        &options,
        &typesetter,
        &mut |event: &pipeline::PipelineEvent| output::print_event(event, verbosity),
    )?;
    output::print_summary(&report.stats);

    if !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Diagnostics go to stderr so they never interleave with the per-file report.
fn init_tracing(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Normal => tracing::Level::INFO,
        Verbosity::Quiet | Verbosity::Quieter => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}
