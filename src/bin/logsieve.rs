use anyhow::Context;
use clap::{Parser, ValueEnum};
use logsieve::{formats, summarize, Engine, EngineConfig, Progress};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputView {
    /// Analysis summary with anomalies
    Summary,
    /// Full parse result with every record
    Result,
    /// Pattern list only
    Patterns,
    /// Result and summary together
    Full,
}

#[derive(Parser, Debug)]
#[command(name = "logsieve", version, about = "Detect, parse and summarize log files")]
struct Cli {
    /// Log files to analyze (plain or .gz). Several files are parsed concurrently.
    #[arg(required_unless_present = "list_formats")]
    input: Vec<PathBuf>,

    /// Explicit format id (skips detection); see --list-formats
    #[arg(long = "format")]
    format: Option<String>,

    /// Print the supported formats and exit
    #[arg(long = "list-formats", default_value_t = false)]
    list_formats: bool,

    /// Only run format detection and print the scores
    #[arg(long = "detect", default_value_t = false)]
    detect: bool,

    /// What to print
    #[arg(long = "output", value_enum, default_value_t = OutputView::Summary)]
    output: OutputView,

    /// JSON file with engine settings
    #[arg(long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "sample-size")]
    sample_size: Option<usize>,
    #[arg(long = "confidence-floor")]
    confidence_floor: Option<f64>,
    #[arg(long = "delimiter-floor")]
    delimiter_floor: Option<f64>,

    /// Pretty-print JSON output
    #[arg(long = "pretty", default_value_t = false)]
    pretty: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut cfg = match &self.config {
            Some(p) => EngineConfig::from_json_file(p)?,
            None => EngineConfig::default(),
        };
        if let Some(n) = self.sample_size {
            cfg.sample_size = n;
        }
        if let Some(f) = self.confidence_floor {
            cfg.confidence_floor = f;
        }
        if let Some(f) = self.delimiter_floor {
            cfg.delimiter_consistency_floor = f;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn to_json<T: serde::Serialize>(v: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty { serde_json::to_string_pretty(v)? } else { serde_json::to_string(v)? })
}

fn analyze(engine: &Engine, cli: &Cli, path: &Path) -> anyhow::Result<serde_json::Value> {
    if cli.detect {
        let detection = engine.detect(path).with_context(|| format!("detecting format of {}", path.display()))?;
        return Ok(serde_json::to_value(&detection)?);
    }
    let name = path.display().to_string();
    let mut report = |p: Progress| {
        tracing::info!(file = %name, processed = p.processed, parsed = p.parsed, errors = p.errors, "progress");
    };
    let result = engine
        .parse(path, cli.format.as_deref(), Some(&mut report))
        .with_context(|| format!("parsing {}", path.display()))?;
    let value = match cli.output {
        OutputView::Result => serde_json::to_value(&result)?,
        OutputView::Patterns => serde_json::to_value(&result.patterns)?,
        OutputView::Full => serde_json::json!({
            "result": result,
            "summary": summarize(&result, engine.config()),
        }),
        OutputView::Summary => serde_json::to_value(summarize(&result, engine.config()))?,
    };
    Ok(value)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_formats {
        println!("{}", to_json(&formats::list_formats(), cli.pretty)?);
        return Ok(());
    }

    init_parallelism();
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let c = cancel.clone();
        let _ = ctrlc::set_handler(move || c.store(true, Ordering::SeqCst));
    }
    let engine = Engine::new(cli.engine_config()?).with_cancel_flag(cancel);

    if cli.input.len() == 1 {
        let value = analyze(&engine, &cli, &cli.input[0])?;
        println!("{}", to_json(&value, cli.pretty)?);
        return Ok(());
    }

    let results: Vec<(String, anyhow::Result<serde_json::Value>)> = cli
        .input
        .par_iter()
        .map(|p| (p.display().to_string(), analyze(&engine, &cli, p)))
        .collect();
    let mut out = serde_json::Map::new();
    let mut failures = 0usize;
    for (name, res) in results {
        match res {
            Ok(v) => {
                out.insert(name, v);
            }
            Err(e) => {
                failures += 1;
                tracing::error!(file = %name, "{e:#}");
                out.insert(name, serde_json::json!({ "error": format!("{e:#}") }));
            }
        }
    }
    println!("{}", to_json(&out, cli.pretty)?);
    if failures == cli.input.len() {
        anyhow::bail!("no input could be analyzed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_summary() {
        let cli = Cli::try_parse_from(["logsieve", "app.log"]).unwrap();
        assert_eq!(cli.output, OutputView::Summary);
    }

    #[test]
    fn output_accepts_known_views() {
        let cli = Cli::try_parse_from(["logsieve", "--output", "patterns", "app.log"]).unwrap();
        assert_eq!(cli.output, OutputView::Patterns);
    }

    #[test]
    fn misspelled_output_view_is_rejected() {
        let err = Cli::try_parse_from(["logsieve", "--output", "sumary", "app.log"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn list_formats_needs_no_input() {
        let cli = Cli::try_parse_from(["logsieve", "--list-formats"]).unwrap();
        assert!(cli.list_formats);
        assert!(cli.input.is_empty());
    }
}
