//! tsxml - check markup documents and print their outline

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;
use tstk_xml::{Document, LogReport, ParseOptions};

const USAGE: &str = "usage: tsxml [--max-depth N] [--quiet] FILE...";

/// Command line settings
#[derive(Debug, Default)]
struct Args {
    options: ParseOptions,
    quiet: bool,
    files: Vec<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--max-depth" => {
                    let value = args.next().context("--max-depth needs a value")?;
                    parsed.options.max_depth = value
                        .parse()
                        .with_context(|| format!("invalid depth: {value}"))?;
                }
                "-q" | "--quiet" => parsed.quiet = true,
                "-h" | "--help" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                flag if flag.starts_with('-') => bail!("unknown option {flag}\n{USAGE}"),
                file => parsed.files.push(PathBuf::from(file)),
            }
        }
        if parsed.files.is_empty() {
            bail!(USAGE);
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse(std::env::args().skip(1))?;
    let mut failed = 0;

    for path in &args.files {
        let mut document = Document::with_options(args.options);
        let mut report = LogReport::with_source(path.display().to_string());
        let ok = document.load(path, &mut report);

        if !args.quiet {
            print!("{}", document.outline());
        }
        if ok {
            let nodes = document.tree().len().saturating_sub(1);
            tracing::info!("{}: ok, {} nodes", path.display(), nodes);
        } else {
            tracing::error!("{}: {} errors", path.display(), report.error_count());
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} documents failed", failed, args.files.len());
    }
    Ok(())
}
