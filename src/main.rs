use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use sosu_count::config::{load_or_create_config, OutputFormat, SETTINGS_FILE};
use sosu_count::engine_types::PrimeResult;
use sosu_count::output::CountReport;
use sosu_count::PrimeCounter;

const USAGE: &str = "Usage: sosu-count <start> <length> [--config <path>] [--json]";

struct CliArgs {
    start: i64,
    length: i64,
    config_path: PathBuf,
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "Error while counting primes in [{}, {}+{}): {e}",
                args.start, args.start, args.length
            );
            ExitCode::FAILURE
        }
    }
}

/// `<start> <length>` と任意のオプションを解釈する。
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut config_path = PathBuf::from(SETTINGS_FILE);
    let mut json = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    return Err("Missing value for --config".to_string());
                };
                config_path = PathBuf::from(path);
            }
            "--json" => json = true,
            _ if arg.starts_with("--") => return Err(format!("Unknown option: {arg}")),
            _ => positional.push(arg),
        }
    }

    let [start, length] = positional.as_slice() else {
        return Err(format!("Expected 2 arguments, got {}", positional.len()));
    };
    let start = start
        .parse::<i64>()
        .map_err(|e| format!("Invalid start: {start} ({e})"))?;
    let length = length
        .parse::<i64>()
        .map_err(|e| format!("Invalid length: {length} ({e})"))?;

    Ok(CliArgs {
        start,
        length,
        config_path,
        json,
    })
}

fn run(args: &CliArgs) -> PrimeResult<()> {
    let mut cfg = load_or_create_config(&args.config_path)?;
    if args.json {
        cfg.output_format = OutputFormat::Json;
    }

    let counter = PrimeCounter::new(&cfg)?;
    let started = Instant::now();
    let summary = counter.count_with_progress(args.start, args.length, |p| {
        log::info!(
            "Progress: {}/{} ({:.1}%), ETA: {}",
            p.processed,
            p.total,
            p.processed as f64 / p.total.max(1) as f64 * 100.0,
            p.eta_secs.map_or_else(|| "-".to_string(), |s| format!("{s}s"))
        );
    })?;

    let report = CountReport::new(
        args.start,
        args.length,
        &summary,
        cfg.parallel,
        started.elapsed().as_millis() as u64,
    );
    println!("{}", report.render(cfg.output_format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_interval_and_options() {
        let cli = parse_args(args(&["-5", "7", "--json", "--config", "x.toml"])).unwrap();
        assert_eq!(cli.start, -5);
        assert_eq!(cli.length, 7);
        assert!(cli.json);
        assert_eq!(cli.config_path, PathBuf::from("x.toml"));
    }

    #[test]
    fn defaults_to_settings_file() {
        let cli = parse_args(args(&["0", "10"])).unwrap();
        assert!(!cli.json);
        assert_eq!(cli.config_path, PathBuf::from(SETTINGS_FILE));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&["10"])).is_err());
        assert!(parse_args(args(&["a", "10"])).is_err());
        assert!(parse_args(args(&["0", "10", "--verbose"])).is_err());
        assert!(parse_args(args(&["0", "10", "--config"])).is_err());
    }
}
