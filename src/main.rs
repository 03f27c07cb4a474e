use std::path::PathBuf;
use std::process::ExitCode;

use pdf_unmark::config;
use pdf_unmark::pipeline::orchestrator::Pipeline;
use pdf_unmark::tools::external::ExternalToolchain;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: pdf_unmark <input.pdf> <output.pdf> [--settings <settings.yaml>]";

struct Args {
    input: PathBuf,
    output: PathBuf,
    settings: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdf_unmark {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let Some(args) = parse_args(&args) else {
        print_usage();
        return ExitCode::FAILURE;
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if !args.input.is_file() {
        eprintln!("ERROR: Input file not found: {}", args.input.display());
        return ExitCode::FAILURE;
    }

    let settings = match config::load_settings(args.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report_path = settings.report_path.clone();
    let toolchain = ExternalToolchain::from_settings(&settings);
    let pipeline = match Pipeline::new(toolchain, settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(&args.input, &args.output) {
        Ok(report) => {
            eprintln!(
                "OK: {} -> {} ({} header lines, {} watermark strings removed, {} pages)",
                args.input.display(),
                args.output.display(),
                report.text_matches.len(),
                report.hex.matches.len(),
                report.hex.pages
            );
            if let Some(path) = report_path
                && let Err(e) = report.write_json(&path)
            {
                eprintln!("ERROR: Failed to write report {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("{USAGE}");
    eprintln!("  Remove the copyright header and watermark from a PDF.");
    eprintln!("  Requires pdftk and qpdf on PATH (or configured in the settings file).");
}

/// Two positional paths, optionally followed or preceded by `--settings <path>`.
fn parse_args(args: &[String]) -> Option<Args> {
    let mut positional = Vec::new();
    let mut settings = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--settings" {
            settings = Some(PathBuf::from(iter.next()?));
        } else if arg.starts_with("--") {
            return None;
        } else {
            positional.push(PathBuf::from(arg));
        }
    }

    let [input, output]: [PathBuf; 2] = positional.try_into().ok()?;
    Some(Args {
        input,
        output,
        settings,
    })
}
