//! labelbench CLI
//!
//! Sends one bottle-label photo to two vision models, one after the other,
//! and prints how long each took and what each extracted.
//!
//! Copyright (c) 2025 Michael A Wright

use anyhow::Result;
use clap::{CommandFactory, Parser};
use core_pipeline::{
    prepare_image, ComparisonReport, ModelSpec, PipelineError, PrepareOptions,
};
use llm_bridge::{run_comparison, AnthropicClient, AnthropicConfig, EXTRACTION_PROMPT};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[allow(dead_code)]
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("LABELBENCH_COMMIT"),
    ", built ",
    env!("LABELBENCH_BUILT_AT"),
    ")"
);

#[derive(Parser)]
#[command(name = "labelbench")]
#[command(about = "Compare two vision models at reading a wine label", long_about = None)]
#[command(version, long_version = LONG_VERSION)]
struct Cli {
    /// Photo of the bottle label (jpg, png, gif or webp)
    image: Option<PathBuf>,

    /// First model to test
    #[arg(long, default_value = "claude-haiku-4-5")]
    model_a: String,

    /// Display name for the first model
    #[arg(long, default_value = "Claude Haiku 4.5")]
    name_a: String,

    /// Second model to test
    #[arg(long, default_value = "claude-sonnet-4-5")]
    model_b: String,

    /// Display name for the second model
    #[arg(long, default_value = "Claude Sonnet 4.5")]
    name_b: String,

    /// Request timeout in seconds (default: none)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so the report on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(
        "labelbench {} ({}, {})",
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::PROFILE
    );

    let result = run(cli).await;
    ExitCode::from(finish(&result, &mut io::stdout(), &mut io::stderr()))
}

/// Report the outcome of a run and pick the process exit code.
///
/// A missing image path prints usage on `out`; every other error goes to `err`.
fn finish<O: Write, E: Write>(result: &Result<()>, out: &mut O, err: &mut E) -> u8 {
    let Err(e) = result else {
        return 0;
    };

    if matches!(
        e.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingArgument)
    ) {
        let _ = writeln!(out, "{}", Cli::command().render_usage());
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Set ANTHROPIC_API_KEY and pass the path of a label photo."
        );
    } else {
        let _ = writeln!(err, "Error: {:#}", e);
    }
    1
}

async fn run(cli: Cli) -> Result<()> {
    let image_path = cli.image.ok_or(PipelineError::MissingArgument)?;
    let mut config = AnthropicConfig::from_env()?;
    config.timeout_secs = cli.timeout_secs;

    let image = prepare_image(&image_path, &PrepareOptions::default())?;
    let models = [
        ModelSpec::new(cli.model_a, cli.name_a),
        ModelSpec::new(cli.model_b, cli.name_b),
    ];

    let client = AnthropicClient::new(config)?;
    let (first, second) = run_comparison(&client, &models, &image, EXTRACTION_PROMPT).await;
    let report = ComparisonReport::new(&first, &second).with_image(&image);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        report.render(&mut out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["labelbench", "label.jpg"]);

        assert_eq!(cli.image, Some(PathBuf::from("label.jpg")));
        assert_eq!(cli.model_a, "claude-haiku-4-5");
        assert_eq!(cli.model_b, "claude-sonnet-4-5");
        assert!(cli.timeout_secs.is_none());
        assert!(!cli.json);
    }

    fn finish_output(result: Result<()>) -> (u8, String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let code = finish(&result, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_without_image_is_missing_argument() {
        let result = run(Cli::parse_from(["labelbench"])).await;
        assert!(matches!(
            result.as_ref().unwrap_err().downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingArgument)
        ));

        let (code, out, err) = finish_output(result);
        assert_eq!(code, 1);
        assert!(out.contains("Usage:"));
        assert!(out.contains("ANTHROPIC_API_KEY"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_missing_credential_goes_to_stderr() {
        let (code, out, err) = finish_output(Err(PipelineError::MissingCredential(
            "ANTHROPIC_API_KEY".to_string(),
        )
        .into()));

        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(
            err,
            "Error: ANTHROPIC_API_KEY environment variable not set\n"
        );
    }

    #[test]
    fn test_missing_file_goes_to_stderr() {
        let (code, out, err) = finish_output(Err(PipelineError::FileNotFound(
            PathBuf::from("/no/such/label.jpg"),
        )
        .into()));

        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(err, "Error: image file not found: /no/such/label.jpg\n");
    }

    #[test]
    fn test_success_is_exit_zero() {
        let (code, out, err) = finish_output(Ok(()));
        assert_eq!(code, 0);
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn test_image_is_optional_at_parse_time() {
        // A missing path is reported by main with exit code 1, not by clap
        let cli = Cli::try_parse_from(["labelbench"]).unwrap();
        assert!(cli.image.is_none());
    }

    #[test]
    fn test_model_overrides() {
        let cli = Cli::parse_from([
            "labelbench",
            "--model-a",
            "a",
            "--name-b",
            "Bee",
            "--json",
            "--timeout-secs",
            "30",
            "label.png",
        ]);

        assert_eq!(cli.model_a, "a");
        assert_eq!(cli.name_b, "Bee");
        assert!(cli.json);
        assert_eq!(cli.timeout_secs, Some(30));
    }
}
