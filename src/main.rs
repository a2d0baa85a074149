use diskmem::app::App;
use diskmem::config::AppConfig;
use diskmem::error::{create_fallback_strategy, user_friendly_message};
use diskmem::io::volumes_with_target;
use diskmem::logging::{init_logging, LogTarget};
use diskmem::{simple, DiskMemError, Result};
use std::process::ExitCode;

const USAGE: &str = "\
Usage: diskmem [--tui | --simple [--json]]

  --tui      Start the terminal UI (default)
  --simple   Interactive line mode
  --json     Print line-mode results as JSON
  -h, --help Show this help";

#[derive(Debug, PartialEq)]
enum Mode {
    Tui,
    Simple { json: bool },
}

/// `Ok(None)` means help was requested
fn parse_args<I: IntoIterator<Item = String>>(args: I) -> std::result::Result<Option<Mode>, String> {
    let mut simple = false;
    let mut tui = false;
    let mut json = false;

    for arg in args {
        match arg.as_str() {
            "--tui" => tui = true,
            "--simple" => simple = true,
            "--json" => json = true,
            "-h" | "--help" => return Ok(None),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    match (tui, simple) {
        (true, true) => Err("--tui and --simple cannot be combined".to_string()),
        (_, true) => Ok(Some(Mode::Simple { json })),
        _ if json => Err("--json requires --simple".to_string()),
        _ => Ok(Some(Mode::Tui)),
    }
}

async fn run_tui(config: AppConfig) -> Result<()> {
    // Never log to the terminal the TUI owns
    if let Ok(target) = LogTarget::default_file() {
        init_logging(config.logging.level, target)?;
    }

    let mut app = App::new(config)?;
    app.init()?;
    let result = app.run().await;
    app.restore()?;
    result
}

async fn run_simple(config: AppConfig, json: bool) -> Result<()> {
    init_logging(config.logging.level, LogTarget::Stderr)?;

    let volumes = volumes_with_target(&config.disk.target_path);
    let report = simple::run(config, volumes, json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        for line in report.lines() {
            println!("{}", line);
        }
    }
    Ok(())
}

fn report_error(error: &DiskMemError) {
    eprintln!("Error: {}", user_friendly_message(error));
    if let Some(suggestion) = create_fallback_strategy(error) {
        eprintln!("{}", suggestion);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mode = match parse_args(std::env::args().skip(1)) {
        Ok(Some(mode)) => mode,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}; using defaults", user_friendly_message(&e));
            AppConfig::default()
        }
    };

    let result = match mode {
        Mode::Tui => run_tui(config).await,
        Mode::Simple { json } => run_simple(config, json).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Option<Mode>, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse(&[]), Ok(Some(Mode::Tui)));
        assert_eq!(parse(&["--tui"]), Ok(Some(Mode::Tui)));
        assert_eq!(parse(&["--simple"]), Ok(Some(Mode::Simple { json: false })));
        assert_eq!(
            parse(&["--json", "--simple"]),
            Ok(Some(Mode::Simple { json: true }))
        );
        assert_eq!(parse(&["--help"]), Ok(None));
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&["--json"]).is_err());
        assert!(parse(&["--tui", "--simple"]).is_err());
        assert_eq!(
            parse(&["--fast"]),
            Err("Unknown argument: --fast".to_string())
        );
    }
}
