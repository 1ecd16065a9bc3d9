//! Config validation CLI tool
//!
//! Validates a presenced configuration file and reports any errors.

use presence_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a presenced configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match presence_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", presence_config::CURRENT_CONFIG_VERSION);
            match &config.staff_id {
                Some(staff_id) => println!("  Auto-start staff: {}", staff_id),
                None => println!("  Auto-start staff: (none)"),
            }
            match &config.working_hours {
                Some(hours) => println!("  Working hours: {}", hours),
                None => println!("  Working hours: always"),
            }
            let intervals: Vec<String> = config
                .schedule
                .intervals
                .iter()
                .map(|d| format_duration(*d))
                .collect();
            println!("  Intervals: {}", intervals.join(", "));
            println!(
                "  Response window: {}",
                format_duration(config.schedule.response_window)
            );

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                presence_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                presence_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                presence_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                presence_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        presence_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
