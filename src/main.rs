use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use statdash_core::{Event, Session, SessionConfig, ViewRequest};

/// Load a tabular dataset, optionally clean it, and print EDA artifacts
/// as JSON for downstream rendering.
#[derive(Debug, Parser)]
#[command(name = "statdash", version)]
struct Cli {
    /// Dataset to load (.csv, .json or .parquet)
    path: PathBuf,

    /// Apply the configured missing-value policy before computing views
    #[arg(long)]
    clean: bool,

    /// Also plot the distribution of this column
    #[arg(long)]
    column: Option<String>,

    /// Bucket count for the distribution plot
    #[arg(long, default_value_t = 10)]
    buckets: usize,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut session = Session::new(SessionConfig::default());
    session
        .handle(Event::Load(cli.path.clone()))
        .with_context(|| format!("loading {}", cli.path.display()))?;

    if cli.clean {
        session.clean_missing(vec![]).context("cleaning missing values")?;
    }

    let mut requests = vec![
        ViewRequest::MissingReport,
        ViewRequest::Summary { columns: vec![] },
        ViewRequest::CorrelationMatrix { columns: vec![] },
    ];
    if let Some(column) = cli.column {
        requests.push(ViewRequest::DistributionPlot {
            column,
            buckets: cli.buckets,
        });
    }

    for request in requests {
        match session.handle(Event::RequestView(request.clone())) {
            Ok(Some(artifact)) => {
                println!("{}", serde_json::to_string_pretty(artifact.as_ref())?);
            }
            Ok(None) => {}
            Err(err) => {
                // Non-fatal: a view that cannot be computed (e.g. no
                // numeric columns) is reported and skipped.
                eprintln!("skipping {request}: {err}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "statdash", "data.csv", "--clean", "--column", "age", "--buckets", "20",
        ])
        .unwrap();
        assert_eq!(cli.path, PathBuf::from("data.csv"));
        assert!(cli.clean);
        assert_eq!(cli.column.as_deref(), Some("age"));
        assert_eq!(cli.buckets, 20);
    }

    #[test]
    fn cli_requires_a_path() {
        assert!(Cli::try_parse_from(["statdash"]).is_err());
    }
}
