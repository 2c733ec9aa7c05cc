use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use results_report::config::Args;
use results_report::config::ReportConfig;
use results_report::generate;
use std::process::ExitCode;

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .try_init();

    ExitCode::from(execute(Args::parse()))
}

/// Process exit status for one invocation: 0 on success, 1 on any failure.
fn execute(args: Args) -> u8 {
    if !args.input.exists() {
        eprintln!("Input file not found: {}", args.input.display());
        return 1;
    }

    match run(args) {
        Ok(()) => 0,
        Err(error) => {
            tracing::error!("{:#}", error);
            1
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = ReportConfig::try_from(args).context("Invalid sheet selection")?;
    let summary = generate(&config)
        .with_context(|| format!("Failed to build report from {}", config.input.display()))?;
    tracing::info!("Done: {}", summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_exits_with_one() -> Result<()> {
        let directory = tempfile::tempdir()?;
        let input = directory.path().join("missing.xlsx");
        let output = directory.path().join("report.html");
        let args = Args::try_parse_from([
            "results_report",
            "--in",
            input.to_str().context("utf-8 path")?,
            "--out",
            output.to_str().context("utf-8 path")?,
        ])?;
        assert_eq!(execute(args), 1);
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn test_unreadable_input_exits_with_one() -> Result<()> {
        let directory = tempfile::tempdir()?;
        let input = directory.path().join("results.ods");
        std::fs::write(&input, b"not a workbook")?;
        let output = directory.path().join("report.html");
        let args = Args::try_parse_from([
            "results_report",
            "--input",
            input.to_str().context("utf-8 path")?,
            "--output",
            output.to_str().context("utf-8 path")?,
        ])?;
        assert_eq!(execute(args), 1);
        assert!(!output.exists());
        Ok(())
    }
}
