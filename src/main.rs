use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use indicatif::ProgressBar;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rvecase::{RveError, Settings};

/// Validates RVE case documents and resolves them into solver-ready plans
#[derive(Parser, Debug)]
#[command(name = "rvecase", version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./rvecase.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write `<stem>_<caseId>.plan.json` files into
    #[arg(long)]
    emit: Option<PathBuf>,

    /// RVE side lengths L1,L2,L3 for the retained-node constraints
    #[arg(long, value_parser = parse_rve_lengths)]
    rve_lengths: Option<[f64; 3]>,

    /// Fail cases whose mesh files do not exist
    #[arg(long)]
    check_mesh: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,

    /// Case documents, processed independently in the order given
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn parse_rve_lengths(raw: &str) -> Result<[f64; 3], String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected three comma-separated lengths, got {}", parts.len()));
    }

    let mut lengths = [0.0; 3];
    for (length, part) in lengths.iter_mut().zip(parts) {
        *length = match part.parse::<f64>() {
            Ok(l) if l.is_finite() && l > 0.0 => l,
            _ => return Err(format!("'{part}' is not a positive length")),
        };
    }

    Ok(lengths)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    settings.check_mesh |= cli.check_mesh;

    let level = if cli.verbose { "debug" } else { settings.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut failures: Vec<(PathBuf, RveError)> = Vec::new();
    let mut seen_ids: HashMap<u64, PathBuf> = HashMap::new();

    let bar = ProgressBar::new(cli.files.len() as u64);
    for path in &cli.files {
        bar.inc(1);

        if !path.exists() {
            bar.suspend(|| warn!("skipping {}: no such file", path.display()));
            continue;
        }

        let result = rvecase::process_file(path, &settings, cli.rve_lengths).and_then(|plan| {
            match &cli.emit {
                Some(dir) => plan.write(dir).map(|_| plan),
                None => Ok(plan),
            }
        });

        match result {
            Ok(plan) => {
                if let Some(first) = seen_ids.get(&plan.case_id) {
                    bar.suspend(|| {
                        warn!(
                            "caseId {} in {} is already used by {}",
                            plan.case_id,
                            path.display(),
                            first.display()
                        )
                    });
                } else {
                    seen_ids.insert(plan.case_id, path.clone());
                }
            }
            Err(err) => {
                bar.suspend(|| error!("{}: {err}", path.display()));
                failures.push((path.clone(), err));
            }
        }
    }
    bar.finish_and_clear();

    let processed = cli.files.len();
    if failures.is_empty() {
        info!("{processed} file(s) processed without errors");
        return ExitCode::SUCCESS;
    }

    for (path, err) in &failures {
        eprintln!("{}: {err}", path.display());
    }
    eprintln!("{} of {processed} file(s) failed", failures.len());
    ExitCode::FAILURE
}
